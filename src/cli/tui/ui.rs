//! Terminal session: raw mode, alternate screen and mouse reporting

use std::io::{self, stdout, Stdout};
use std::ops::{Deref, DerefMut};

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::warn;

/// Terminal type alias
pub type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

/// A terminal in canvas mode; restored on [`TerminalSession::restore`] or drop
pub struct TerminalSession {
    terminal: Terminal,
    restored: bool,
}

impl TerminalSession {
    pub fn start() -> Result<Self> {
        enable_raw_mode()?;
        let mut out = stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, EnableMouseCapture) {
            let _ = leave();
            return Err(e.into());
        }
        let terminal = match ratatui::Terminal::new(CrosstermBackend::new(out)) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = leave();
                return Err(e.into());
            }
        };
        Ok(Self {
            terminal,
            restored: false,
        })
    }

    /// Gives the terminal back to the shell
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        leave()
    }
}

impl Deref for TerminalSession {
    type Target = Terminal;

    fn deref(&self) -> &Terminal {
        &self.terminal
    }
}

impl DerefMut for TerminalSession {
    fn deref_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = leave() {
                warn!("Failed to restore terminal: {}", e);
            }
        }
    }
}

fn leave() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
    Ok(())
}
