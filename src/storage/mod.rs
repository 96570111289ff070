//! # Storage Layer
//!
//! Project layout and configuration. Canvas state is never persisted.
//!
//! ## Project Structure
//!
//! ```text
//! .paint/
//! ├── config.toml           # Project configuration
//! ├── plugins/              # Local paint-shape-* executables
//! ├── icons/
//! │   └── placeholder.txt   # Drawn for shapes whose extension is gone
//! ├── paint.log             # Log of the last `paint run`
//! └── .gitignore            # Ignores the log
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a paint project
//! - [`Config`] - Project and global configuration

mod config;
mod project;

pub use config::{
    CanvasConfig, Config, ConfigError, GlobalConfig, OutputFormat, PluginConfig, ProjectConfig,
    PAINT_DIR,
};
pub use project::{Project, ProjectError};
