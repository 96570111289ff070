//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Create `.paint/` with default config and placeholder icon |
//! | `run` | Interactive canvas in the terminal |
//! | `snapshot` | Scripted headless session, prints the placed shapes |
//! | `plugin list`, `plugin test` | Inspect `paint-shape-*` plugins |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Use `--verbose` (or `-v`) for debug logs, or set `RUST_LOG`:
//! ```bash
//! RUST_LOG=paint=debug paint snapshot --click 50,50
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod logging;
mod output;
mod plugin_cmd;
mod snapshot;
mod tui;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use snapshot::{capture, SnapshotArgs};
