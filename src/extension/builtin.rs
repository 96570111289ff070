//! Shapes that ship with the host

use std::sync::Arc;

use tracing::debug;

use super::capability::{Drawable, Icon};
use super::discovery::{Announcement, DiscoveryListener, DiscoverySource};
use crate::domain::{Color, Point, Primitive, Rect, Surface};

/// Size of the built-in outlines, a little inside the default placement box
const EXTENT: i32 = 50;

pub struct Circle;

impl Drawable for Circle {
    fn draw(&self, surface: &mut dyn Surface, anchor: Point) -> anyhow::Result<()> {
        surface.draw(Primitive::Circle {
            center: anchor,
            radius: EXTENT / 2,
            color: Color::Red,
        });
        Ok(())
    }
}

pub struct Square;

impl Drawable for Square {
    fn draw(&self, surface: &mut dyn Surface, anchor: Point) -> anyhow::Result<()> {
        let rect = Rect::centered_on(anchor, EXTENT);
        surface.draw(Primitive::FillRect {
            rect,
            color: Color::Blue,
        });
        surface.draw(Primitive::StrokeRect {
            rect,
            color: Color::Black,
        });
        Ok(())
    }
}

pub struct Triangle;

impl Drawable for Triangle {
    fn draw(&self, surface: &mut dyn Surface, anchor: Point) -> anyhow::Result<()> {
        let half = EXTENT / 2;
        let apex = anchor.offset(0, -half);
        let right = anchor.offset(half, half);
        let left = anchor.offset(-half, half);
        for (from, to) in [(apex, right), (right, left), (left, apex)] {
            surface.draw(Primitive::Line {
                from,
                to,
                color: Color::Green,
            });
        }
        Ok(())
    }
}

/// Announces the built-in shapes once when opened
#[derive(Default)]
pub struct BuiltinShapes {
    listener: Option<Arc<dyn DiscoveryListener>>,
}

impl BuiltinShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announcements() -> Vec<Announcement> {
        vec![
            Announcement::new("Circle", Icon::new("●"), Arc::new(Circle)),
            Announcement::new("Square", Icon::new("■"), Arc::new(Square)),
            Announcement::new("Triangle", Icon::new("▲"), Arc::new(Triangle)),
        ]
    }
}

impl DiscoverySource for BuiltinShapes {
    fn label(&self) -> &str {
        "builtin"
    }

    fn open(&mut self, listener: Arc<dyn DiscoveryListener>) -> anyhow::Result<()> {
        for announcement in Self::announcements() {
            listener.on_add(announcement);
        }
        self.listener = Some(listener);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(listener) = self.listener.take() {
            debug!("Withdrawing built-in shapes");
            for announcement in Self::announcements() {
                if let Some(name) = announcement.name {
                    listener.on_remove(&name);
                }
            }
        }
    }
}
