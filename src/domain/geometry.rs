//! Integer geometry used by the canvas and by shape extensions

use serde::{Deserialize, Serialize};

/// A point in canvas coordinates (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this point shifted by `(dx, dy)`, clamped to the `i32` range
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl std::str::FromStr for Point {
    type Err = String;

    /// Parses `"X,Y"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("Expected X,Y but got '{}'", s))?;
        let x = x
            .trim()
            .parse()
            .map_err(|_| format!("Invalid x coordinate in '{}'", s))?;
        let y = y
            .trim()
            .parse()
            .map_err(|_| format!("Invalid y coordinate in '{}'", s))?;
        Ok(Self::new(x, y))
    }
}

/// An axis-aligned rectangle; `(x, y)` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A `size` x `size` square whose centre is `center`
    ///
    /// Coordinates saturate, so a square near the edge of the `i32` range
    /// is pushed inwards rather than wrapping.
    pub fn centered_on(center: Point, size: i32) -> Self {
        let half = size / 2;
        Self::new(
            center.x.saturating_sub(half),
            center.y.saturating_sub(half),
            size,
            size,
        )
    }

    pub fn center(&self) -> Point {
        self.origin().offset(self.width / 2, self.height / 2)
    }

    /// Exclusive bottom-right corner
    pub fn far_corner(&self) -> Point {
        self.origin().offset(self.width, self.height)
    }

    /// Top-left corner
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains(&self, point: Point) -> bool {
        let far = self.far_corner();
        point.x >= self.x && point.y >= self.y && point.x < far.x && point.y < far.y
    }

    /// Moves the rectangle so its centre is `center`, keeping its size
    pub fn recenter(&mut self, center: Point) {
        let origin = center.offset(-(self.width / 2), -(self.height / 2));
        self.x = origin.x;
        self.y = origin.y;
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let origin = self.origin().offset(dx, dy);
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    /// The overlap of two rectangles, or `None` when they do not meet
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let (near_a, far_a) = (self.origin(), self.far_corner());
        let (near_b, far_b) = (other.origin(), other.far_corner());
        let x = near_a.x.max(near_b.x);
        let y = near_a.y.max(near_b.y);
        let right = far_a.x.min(far_b.x);
        let bottom = far_a.y.min(far_b.y);

        (x < right && y < bottom).then(|| Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y)))
    }
}

/// Named colours; front ends map these onto whatever they can display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Black,
    White,
    Gray,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
}
