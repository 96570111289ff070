//! # Canvas
//!
//! Tool state and placed shapes. [`Canvas`] lives on the dispatcher thread;
//! everything else reaches it through [`PaintClient`].

mod api;
mod state;

pub use api::{CanvasSnapshot, PaintApi, PaintClient, ShapeView};
pub use state::{
    Canvas, CanvasError, PaintStats, SharedCanvas, ToolButton, DEFAULT_SHAPE_SIZE,
};
