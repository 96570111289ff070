//! Screen layout: toolbar on the left, canvas on the right, status below

mod drawing;
mod toolbar;

use ratatui::prelude::*;

use super::app::App;

/// Where the interactive parts ended up this frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameAreas {
    pub toolbar: Rect,
    pub canvas: Rect,
}

pub fn draw(frame: &mut Frame, app: &App) -> FrameAreas {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Toolbar + canvas
            Constraint::Length(3), // Status bar
        ])
        .split(frame.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(20)])
        .split(main_chunks[0]);

    let toolbar = toolbar::draw(frame, app, content_chunks[0]);
    let canvas = drawing::draw(frame, app, content_chunks[1]);
    toolbar::draw_status_bar(frame, app, main_chunks[1]);

    FrameAreas { toolbar, canvas }
}
