//! Coordinate mapping between terminal cells and the canvas

use ratatui::layout::Rect;

use crate::domain::Point;

/// Whether the terminal cell (`column`, `row`) lies inside `area`
pub fn area_contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && row >= area.y
        && column < area.x.saturating_add(area.width)
        && row < area.y.saturating_add(area.height)
}

/// Canvas point at the centre of a terminal cell
///
/// Cells outside `area` are clamped to its edge, so a drag that leaves the
/// canvas still lands on it. Returns `None` for an empty area.
pub fn cell_to_point(area: Rect, width: i32, height: i32, column: u16, row: u16) -> Option<Point> {
    if area.width == 0 || area.height == 0 {
        return None;
    }

    let col = column.clamp(area.x, area.x + area.width - 1) - area.x;
    let row = row.clamp(area.y, area.y + area.height - 1) - area.y;

    let x = (f64::from(col) + 0.5) * f64::from(width) / f64::from(area.width);
    let y = (f64::from(row) + 0.5) * f64::from(height) / f64::from(area.height);
    Some(Point::new(x as i32, y as i32))
}

/// Canvas y (down) to chart y (up)
pub fn flip_y(y: i32, height: i32) -> f64 {
    f64::from(height) - f64::from(y)
}

/// Index of the neighbouring entry, wrapping around
pub fn cycle(len: usize, current: Option<usize>, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    })
}
