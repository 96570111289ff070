//! What an extension provides: something drawable, plus an icon for the toolbar

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{Point, Surface};

/// A drawing capability supplied by an extension
///
/// `draw` may fail for any reason; callers treat failure as "render the
/// placeholder" and never propagate it.
pub trait Drawable: Send + Sync {
    fn draw(&self, surface: &mut dyn Surface, anchor: Point) -> anyhow::Result<()>;
}

impl<F> Drawable for F
where
    F: Fn(&mut dyn Surface, Point) -> anyhow::Result<()> + Send + Sync,
{
    fn draw(&self, surface: &mut dyn Surface, anchor: Point) -> anyhow::Result<()> {
        self(surface, anchor)
    }
}

/// Opaque toolbar icon handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Icon(String);

impl Icon {
    pub fn new(icon: impl Into<String>) -> Self {
        Self(icon.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-formed extension: unique name, icon, and capability
#[derive(Clone)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub icon: Icon,
    pub shape: Arc<dyn Drawable>,
}

impl std::fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("name", &self.name)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}
