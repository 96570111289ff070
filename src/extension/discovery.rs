//! Discovery contracts: how extensions are announced to the host

use std::sync::Arc;

use super::capability::{Drawable, ExtensionDescriptor, Icon};

/// A raw discovery notification payload
///
/// Name and icon are optional because discovery sources may hand over
/// incomplete data; such announcements are dropped by the registry.
#[derive(Clone)]
pub struct Announcement {
    pub name: Option<String>,
    pub icon: Option<Icon>,
    pub shape: Arc<dyn Drawable>,
}

impl Announcement {
    pub fn new(name: impl Into<String>, icon: Icon, shape: Arc<dyn Drawable>) -> Self {
        Self {
            name: Some(name.into()),
            icon: Some(icon),
            shape,
        }
    }

    /// Returns the descriptor, or `None` when the name or icon is missing
    pub fn into_descriptor(self) -> Option<ExtensionDescriptor> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let icon = self.icon?;
        Some(ExtensionDescriptor {
            name,
            icon,
            shape: self.shape,
        })
    }
}

impl std::fmt::Debug for Announcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Announcement")
            .field("name", &self.name)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}

/// One lifecycle notification
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    Added(Announcement),
    Modified(Announcement),
    Removed { name: String },
}

/// Receiver of discovery notifications; callable from any thread
pub trait DiscoveryListener: Send + Sync {
    fn on_add(&self, announcement: Announcement);

    fn on_modify(&self, announcement: Announcement);

    fn on_remove(&self, name: &str);

    fn notify(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::Added(announcement) => self.on_add(announcement),
            DiscoveryEvent::Modified(announcement) => self.on_modify(announcement),
            DiscoveryEvent::Removed { name } => self.on_remove(&name),
        }
    }
}

/// Something that finds extensions and reports them to a listener
pub trait DiscoverySource: Send {
    /// Short label for logs
    fn label(&self) -> &str;

    /// Starts delivering notifications to `listener`
    fn open(&mut self, listener: Arc<dyn DiscoveryListener>) -> anyhow::Result<()>;

    /// Stops delivering notifications; idempotent
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Point, Surface};

    fn noop() -> Arc<dyn Drawable> {
        Arc::new(|_: &mut dyn Surface, _: Point| Ok(()))
    }

    #[test]
    fn complete_announcement_becomes_descriptor() {
        let descriptor = Announcement::new("Circle", Icon::new("o"), noop())
            .into_descriptor()
            .unwrap();
        assert_eq!(descriptor.name, "Circle");
        assert_eq!(descriptor.icon.as_str(), "o");
    }

    #[test]
    fn missing_name_or_icon_is_rejected() {
        let no_name = Announcement {
            name: None,
            icon: Some(Icon::new("o")),
            shape: noop(),
        };
        let blank_name = Announcement {
            name: Some("  ".to_string()),
            icon: Some(Icon::new("o")),
            shape: noop(),
        };
        let no_icon = Announcement {
            name: Some("Circle".to_string()),
            icon: None,
            shape: noop(),
        };

        assert!(no_name.into_descriptor().is_none());
        assert!(blank_name.into_descriptor().is_none());
        assert!(no_icon.into_descriptor().is_none());
    }
}
