//! Drawing surface handed to shape extensions
//!
//! Extensions never rasterise anything themselves. They push [`Primitive`]s
//! onto a [`Surface`]; front ends (the terminal canvas, JSON snapshots)
//! decide how to show them.

use serde::{Deserialize, Serialize};

use super::geometry::{Color, Point, Rect};

/// One drawing instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
    },
    Circle {
        center: Point,
        radius: i32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
    },
    /// A small text image whose top-left corner is `origin`
    Icon {
        origin: Point,
        rows: Vec<String>,
    },
}

impl Primitive {
    /// Returns a copy shifted by `(dx, dy)`
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        match self {
            Primitive::FillRect { rect, color } => Primitive::FillRect {
                rect: rect.translated(dx, dy),
                color: *color,
            },
            Primitive::StrokeRect { rect, color } => Primitive::StrokeRect {
                rect: rect.translated(dx, dy),
                color: *color,
            },
            Primitive::Circle {
                center,
                radius,
                color,
            } => Primitive::Circle {
                center: center.offset(dx, dy),
                radius: *radius,
                color: *color,
            },
            Primitive::Line { from, to, color } => Primitive::Line {
                from: from.offset(dx, dy),
                to: to.offset(dx, dy),
                color: *color,
            },
            Primitive::Icon { origin, rows } => Primitive::Icon {
                origin: origin.offset(dx, dy),
                rows: rows.clone(),
            },
        }
    }
}

/// Something primitives can be drawn onto
///
/// `mark`/`rollback` let a caller discard whatever a failed drawing pass
/// pushed, so a surface never holds half of a shape.
pub trait Surface {
    fn draw(&mut self, primitive: Primitive);

    /// Opaque position usable with [`Surface::rollback`]
    fn mark(&self) -> usize;

    /// Discards everything drawn since `mark`
    fn rollback(&mut self, mark: usize);
}

/// A surface that records primitives in draw order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayList {
    primitives: Vec<Primitive>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

impl Surface for DisplayList {
    fn draw(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    fn mark(&self) -> usize {
        self.primitives.len()
    }

    fn rollback(&mut self, mark: usize) {
        self.primitives.truncate(mark);
    }
}
