//! Stable stand-in for an extension's drawing capability
//!
//! The canvas and the registry both hold the same [`ExtensionProxy`]. The
//! registry disposes it from whatever thread delivered the removal; the
//! canvas keeps drawing through it on the dispatch thread. Once disposed,
//! or whenever the real shape fails, the proxy renders the [`Placeholder`].

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use super::capability::Drawable;
use crate::domain::{Color, Point, Primitive, Rect, Surface};
use crate::runtime::panic_message;

/// What a proxy ended up drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendered {
    Shape,
    Placeholder,
}

pub struct ExtensionProxy {
    shape: Mutex<Option<Arc<dyn Drawable>>>,
    placeholder: Arc<Placeholder>,
}

impl ExtensionProxy {
    pub fn new(shape: Arc<dyn Drawable>, placeholder: Arc<Placeholder>) -> Self {
        Self {
            shape: Mutex::new(Some(shape)),
            placeholder,
        }
    }

    /// A proxy that has nothing behind it and always draws the placeholder
    pub fn placeholder_only(placeholder: Arc<Placeholder>) -> Self {
        Self {
            shape: Mutex::new(None),
            placeholder,
        }
    }

    pub fn is_live(&self) -> bool {
        self.slot().is_some()
    }

    /// Releases the real shape; idempotent
    pub fn dispose(&self) {
        if self.slot().take().is_some() {
            debug!("Extension proxy disposed");
        }
    }

    /// Draws the real shape at `anchor`, or the placeholder if there is
    /// none or it fails. Primitives from a failed draw are rolled back.
    pub fn draw(&self, surface: &mut dyn Surface, anchor: Point) -> Rendered {
        // Clone out of the lock so a slow draw never blocks dispose
        let current = self.slot().clone();

        if let Some(shape) = current {
            let mark = surface.mark();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| shape.draw(surface, anchor)));
            match outcome {
                Ok(Ok(())) => return Rendered::Shape,
                Ok(Err(e)) => warn!("Shape failed to draw, using placeholder: {:#}", e),
                Err(payload) => warn!(
                    "Shape panicked while drawing, using placeholder: {}",
                    panic_message(payload.as_ref())
                ),
            }
            surface.rollback(mark);
        }

        self.placeholder.draw(surface, anchor);
        Rendered::Placeholder
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<dyn Drawable>>> {
        self.shape.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ExtensionProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionProxy")
            .field("live", &self.is_live())
            .finish()
    }
}

/// Visual shown for shapes whose extension is missing or broken
///
/// Draws a text icon loaded lazily from `icon_path`; when no icon is
/// configured or it cannot be read, draws a red square instead.
#[derive(Debug)]
pub struct Placeholder {
    icon_path: Option<PathBuf>,
    extent: i32,
    icon: OnceLock<Option<Vec<String>>>,
}

impl Placeholder {
    pub fn new(icon_path: Option<PathBuf>, extent: i32) -> Self {
        Self {
            icon_path,
            extent,
            icon: OnceLock::new(),
        }
    }

    pub fn extent(&self) -> i32 {
        self.extent
    }

    pub fn draw(&self, surface: &mut dyn Surface, anchor: Point) {
        let rect = Rect::centered_on(anchor, self.extent);
        match self.icon() {
            Some(rows) => surface.draw(Primitive::Icon {
                origin: rect.origin(),
                rows: rows.to_vec(),
            }),
            None => surface.draw(Primitive::FillRect {
                rect,
                color: Color::Red,
            }),
        }
    }

    fn icon(&self) -> Option<&[String]> {
        self.icon.get_or_init(|| self.load_icon()).as_deref()
    }

    fn load_icon(&self) -> Option<Vec<String>> {
        let path = self.icon_path.as_ref()?;
        match read_icon(path) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!("Placeholder icon unavailable, drawing fallback block: {:#}", e);
                None
            }
        }
    }
}

fn read_icon(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read icon: {}", path.display()))?;

    let rows: Vec<String> = content.lines().map(|l| l.trim_end().to_string()).collect();
    if rows.iter().all(|r| r.is_empty()) {
        bail!("Icon file is empty: {}", path.display());
    }
    Ok(rows)
}
