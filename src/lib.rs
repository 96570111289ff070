//! paint - a drawing host whose shapes come from extensions
//!
//! Extensions appear and disappear while the host runs. The
//! [`ExtensionRegistry`](extension::ExtensionRegistry) wraps each one in a
//! disposable proxy and mirrors it onto the [`Canvas`](canvas::Canvas),
//! which lives on a single dispatcher thread. Shapes already placed survive
//! their extension and fall back to a placeholder.

pub mod canvas;
pub mod cli;
pub mod domain;
pub mod extension;
pub mod plugin;
pub mod runtime;
pub mod storage;

pub use canvas::{Canvas, PaintApi, PaintClient};
pub use domain::{Point, Rect, ShapeRecord};
pub use extension::{Drawable, ExtensionProxy, ExtensionRegistry};
pub use runtime::{Dispatcher, HostSettings, PaintHost};
