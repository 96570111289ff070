//! Placed shape instances and their query-facing view

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

/// Identifier of a placed instance, unique within one canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A shape placed on the canvas
///
/// Refers to its extension by name only, so it outlives the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedInstance {
    pub id: InstanceId,
    pub name: String,
    pub bounds: Rect,
}

impl PlacedInstance {
    pub fn anchor(&self) -> Point {
        self.bounds.center()
    }

    pub fn to_record(&self) -> ShapeRecord {
        let center = self.bounds.center();
        ShapeRecord {
            name: self.name.clone(),
            x: center.x,
            y: center.y,
            width: self.bounds.width,
            height: self.bounds.height,
        }
    }
}

/// External view of a placed shape: `x`/`y` are the centre
///
/// Two records are equal when name and centre match; size is ignored, so a
/// caller can describe a shape by `{name, x, y}` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

impl ShapeRecord {
    /// A record identified by name and centre only
    pub fn at(name: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            width: 0,
            height: 0,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl PartialEq for ShapeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.x == other.x && self.y == other.y
    }
}

impl Eq for ShapeRecord {}

impl std::str::FromStr for ShapeRecord {
    type Err = String;

    /// Parses `NAME@X,Y`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, point) = s
            .rsplit_once('@')
            .ok_or_else(|| format!("Expected NAME@X,Y but got '{}'", s))?;
        if name.trim().is_empty() {
            return Err(format!("Missing shape name in '{}'", s));
        }
        let point: Point = point.parse()?;
        Ok(Self::at(name.trim(), point.x, point.y))
    }
}
