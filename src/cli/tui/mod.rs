//! Interactive canvas for `paint run`
//!
//! Draws the canvas with ratatui and feeds mouse input to the host. The
//! host is started before the terminal switches to raw mode, so startup
//! errors print normally, and shut down after the terminal is restored.

mod app;
mod event;
mod ui;
mod utils;
mod views;

use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Result};
use tracing::info;

use crate::runtime::{panic_message, HostSettings, PaintHost};
use crate::storage::Config;
use app::App;
use event::EventHandler;

/// Launch the TUI
pub fn run() -> Result<()> {
    let config = Config::load()?;
    let host = PaintHost::init(HostSettings::from_config(&config))?;
    info!(extensions = ?host.registry().names(), "Opening canvas");

    let mut session = ui::TerminalSession::start()?;
    let mut app = App::new(host.client());
    let events = EventHandler::new(100);

    // A panic in the UI loop must still hand the terminal back
    let result = panic::catch_unwind(AssertUnwindSafe(|| app.run(&mut session, events)));

    let restored = session.restore();
    let stopped = host.shutdown();

    match result {
        Ok(outcome) => {
            outcome?;
            restored?;
            stopped.map(|_| ())
        }
        Err(payload) => Err(anyhow!("Canvas UI panicked: {}", panic_message(&*payload))),
    }
}
