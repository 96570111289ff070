//! # Domain Model
//!
//! Plain data shared by the canvas, the extension layer and front ends.
//!
//! - [`Point`], [`Rect`], [`Color`] - integer canvas geometry
//! - [`Primitive`], [`Surface`], [`DisplayList`] - what shapes draw onto
//! - [`PlacedInstance`], [`ShapeRecord`] - shapes placed by the user

mod geometry;
mod instance;
mod surface;

pub use geometry::{Color, Point, Rect};
pub use instance::{InstanceId, PlacedInstance, ShapeRecord};
pub use surface::{DisplayList, Primitive, Surface};
