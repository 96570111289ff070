//! # Extension Lifecycle
//!
//! Shapes are supplied by extensions that may appear, change or vanish while
//! the host runs.
//!
//! - [`capability`] - the [`Drawable`] contract and descriptors
//! - [`discovery`] - how sources announce extensions to a listener
//! - [`proxy`] - disposable stand-ins the canvas draws through
//! - [`registry`] - keeps the canvas in step with discovery
//! - [`builtin`] - shapes bundled with the host

pub mod builtin;
pub mod capability;
pub mod discovery;
pub mod proxy;
pub mod registry;

pub use builtin::BuiltinShapes;
pub use capability::{Drawable, ExtensionDescriptor, Icon};
pub use discovery::{Announcement, DiscoveryEvent, DiscoveryListener, DiscoverySource};
pub use proxy::{ExtensionProxy, Placeholder, Rendered};
pub use registry::ExtensionRegistry;
