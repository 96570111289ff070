//! TUI application state and input handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::*;
use tracing::debug;

use super::event::{Event, EventHandler};
use super::ui::Terminal;
use super::utils::{area_contains, cell_to_point, cycle};
use super::views::{self, FrameAreas};
use crate::canvas::{CanvasSnapshot, PaintClient, PaintStats, ToolButton};
use crate::domain::{InstanceId, Point};

/// Application state
pub struct App {
    /// Handle to the canvas on the dispatcher thread
    client: PaintClient,

    /// Canvas as of the last refresh
    snapshot: Option<CanvasSnapshot>,

    /// Layout of the last frame, for mapping mouse input
    areas: FrameAreas,

    /// Status message to display
    status_message: Option<String>,

    /// Whether to quit
    should_quit: bool,
}

impl App {
    pub fn new(client: PaintClient) -> Self {
        Self {
            client,
            snapshot: None,
            areas: FrameAreas::default(),
            status_message: None,
            should_quit: false,
        }
    }

    /// Run the main application loop
    pub fn run(&mut self, terminal: &mut Terminal, events: EventHandler) -> Result<()> {
        while !self.should_quit {
            self.refresh()?;
            terminal.draw(|frame| self.draw(frame))?;

            match events.next()? {
                Event::Key(key) => self.handle_key(key)?,
                Event::Mouse(mouse) => self.handle_mouse(mouse)?,
                // Ticks pick up extensions arriving from the plugin watcher
                Event::Resize | Event::Tick => {}
            }
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        let snapshot = self.client.snapshot()?;
        let changed = self
            .snapshot
            .as_ref()
            .map_or(true, |previous| previous.revision != snapshot.revision);
        if changed {
            debug!(revision = snapshot.revision, "Canvas changed");
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.areas = views::draw(frame, self);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.cycle_tool(true)?,
            KeyCode::BackTab => self.cycle_tool(false)?,
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.select_index(index)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        let (column, row) = (mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if area_contains(self.areas.toolbar, column, row) {
                    let index = usize::from(row - self.areas.toolbar.y);
                    self.select_index(index)?;
                } else if area_contains(self.areas.canvas, column, row) {
                    if let Some(point) = self.canvas_point(column, row) {
                        self.press(point)?;
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(point) = self.canvas_point(column, row) {
                    self.client.drag(point)?;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(point) = self.canvas_point(column, row) {
                    if let Some(id) = self.client.release(point)? {
                        self.status_message = Some(format!("Moved {} to {}", id, point));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn press(&mut self, point: Point) -> Result<()> {
        let pressed = self.client.press(point)?;
        let existed = |id: InstanceId| {
            self.snapshot
                .as_ref()
                .is_some_and(|s| s.shapes.iter().any(|shape| shape.id == id))
        };

        self.status_message = Some(match pressed {
            Some(id) if existed(id) => format!("Dragging {}", id),
            Some(id) => format!("Placed {} at {}", id, point),
            None => "Select a tool first".to_string(),
        });
        Ok(())
    }

    fn canvas_point(&self, column: u16, row: u16) -> Option<Point> {
        let snapshot = self.snapshot.as_ref()?;
        cell_to_point(
            self.areas.canvas,
            snapshot.width,
            snapshot.height,
            column,
            row,
        )
    }

    fn cycle_tool(&mut self, forward: bool) -> Result<()> {
        let tools = self.tools();
        let current = self
            .selected_tool()
            .and_then(|name| tools.iter().position(|t| t.name == name));
        match cycle(tools.len(), current, forward) {
            Some(index) => self.select_index(index),
            None => Ok(()),
        }
    }

    fn select_index(&mut self, index: usize) -> Result<()> {
        let Some(tool) = self.tools().get(index) else {
            return Ok(());
        };
        let name = tool.name.clone();
        self.client.select_tool(&name)?;
        self.status_message = Some(format!("Selected {}", name));
        Ok(())
    }

    pub fn snapshot(&self) -> Option<&CanvasSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn tools(&self) -> &[ToolButton] {
        self.snapshot
            .as_ref()
            .map(|s| s.tools.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_tool(&self) -> Option<&str> {
        self.snapshot.as_ref()?.selected.as_deref()
    }

    pub fn stats(&self) -> Option<PaintStats> {
        self.snapshot.as_ref().map(|s| s.stats)
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
