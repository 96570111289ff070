//! Renders the painted display list onto a braille canvas

use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Rectangle},
        Block, Borders,
    },
};

use crate::cli::tui::app::App;
use crate::cli::tui::utils::flip_y;
use crate::domain::{Color as PaintColor, Primitive, Rect as PaintRect};

/// Spacing of the hatch lines used to fill rectangles
const FILL_STEP: i32 = 4;

/// Draws the canvas and returns its inner area for mouse mapping
pub fn draw(frame: &mut Frame, app: &App, area: Rect) -> Rect {
    let block = Block::default().title("Canvas").borders(Borders::ALL);
    let inner = block.inner(area);

    let Some(snapshot) = app.snapshot() else {
        frame.render_widget(block, area);
        return inner;
    };

    let width = f64::from(snapshot.width);
    let height = snapshot.height;
    let bounds = PaintRect::new(0, 0, snapshot.width, snapshot.height);
    // Canvas units covered by one terminal row, for icon text
    let row_step = f64::from(height) / f64::from(inner.height.max(1));

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, f64::from(height)])
        .paint(|ctx| {
            for primitive in snapshot.display.primitives() {
                paint(ctx, primitive, bounds, row_step);
            }
        });

    frame.render_widget(canvas, area);
    inner
}

fn paint(ctx: &mut Context<'_>, primitive: &Primitive, bounds: PaintRect, row_step: f64) {
    let height = bounds.height;
    match primitive {
        Primitive::FillRect { rect, color } => {
            let color = tui_color(*color);
            // Only the visible part is hatched; the rest would be clipped anyway.
            if let Some(visible) = bounds.intersection(rect) {
                let right = visible.far_corner().x;
                for y in hatch_rows(visible) {
                    ctx.draw(&CanvasLine {
                        x1: f64::from(visible.x),
                        y1: flip_y(y, height),
                        x2: f64::from(right),
                        y2: flip_y(y, height),
                        color,
                    });
                }
            }
            ctx.draw(&outline(rect, height, color));
        }
        Primitive::StrokeRect { rect, color } => {
            ctx.draw(&outline(rect, height, tui_color(*color)))
        }
        Primitive::Circle {
            center,
            radius,
            color,
        } => ctx.draw(&Circle {
            x: f64::from(center.x),
            y: flip_y(center.y, height),
            radius: f64::from(*radius),
            color: tui_color(*color),
        }),
        Primitive::Line { from, to, color } => ctx.draw(&CanvasLine {
            x1: f64::from(from.x),
            y1: flip_y(from.y, height),
            x2: f64::from(to.x),
            y2: flip_y(to.y, height),
            color: tui_color(*color),
        }),
        Primitive::Icon { origin, rows } => {
            let top = flip_y(origin.y, height);
            for (i, row) in rows.iter().enumerate() {
                ctx.print(
                    f64::from(origin.x),
                    top - row_step * i as f64,
                    Line::styled(row.clone(), Style::default().fg(Color::Yellow)),
                );
            }
        }
    }
}

/// Canvas rows that get a hatch line when filling `rect`
fn hatch_rows(rect: PaintRect) -> impl Iterator<Item = i32> {
    (rect.y..rect.far_corner().y).step_by(FILL_STEP as usize)
}

fn outline(rect: &PaintRect, height: i32, color: Color) -> Rectangle {
    Rectangle {
        x: f64::from(rect.x),
        y: flip_y(rect.far_corner().y, height),
        width: f64::from(rect.width),
        height: f64::from(rect.height),
        color,
    }
}

fn tui_color(color: PaintColor) -> Color {
    match color {
        PaintColor::Black => Color::DarkGray,
        PaintColor::White => Color::White,
        PaintColor::Gray => Color::Gray,
        PaintColor::Red => Color::Red,
        PaintColor::Green => Color::Green,
        PaintColor::Blue => Color::Blue,
        PaintColor::Yellow => Color::Yellow,
        PaintColor::Cyan => Color::Cyan,
        PaintColor::Magenta => Color::Magenta,
    }
}
