//! Tool list and status bar

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::cli::tui::app::App;

/// Draws the toolbar and returns the area its entries occupy
pub fn draw(frame: &mut Frame, app: &App, area: Rect) -> Rect {
    let selected = app.selected_tool();

    let items: Vec<ListItem> = app
        .tools()
        .iter()
        .enumerate()
        .map(|(i, tool)| {
            let label = format!("{} {} {}", i + 1, tool.icon, tool.name);
            let style = if selected == Some(tool.name.as_str()) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();

    let block = Block::default().title("Tools").borders(Borders::ALL);
    let inner = block.inner(area);

    if items.is_empty() {
        let empty = Paragraph::new("No extensions\nloaded")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
    } else {
        frame.render_widget(List::new(items).block(block), area);
    }

    inner
}

pub fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let summary = match app.stats() {
        Some(stats) => format!(
            "{} shape(s), {} placeholder(s)",
            stats.shapes, stats.placeholders
        ),
        None => "starting".to_string(),
    };
    let message = app.status_message().unwrap_or("");

    let text = Line::from(vec![
        Span::styled(summary, Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::raw(message.to_string()),
        Span::styled(
            "  [q] quit  [Tab/1-9] tool  [click] place  [drag] move",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let status = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, area);
}
