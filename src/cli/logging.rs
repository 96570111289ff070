//! Tracing setup for the binary
//!
//! `RUST_LOG` wins when set. Otherwise commands log warnings to stderr and
//! `paint run`, which owns the terminal, logs `info` to a file.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines go
pub enum LogTarget {
    Stderr,
    File(File),
}

impl LogTarget {
    /// Opens `path` for appending
    pub fn file(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Ok(Self::File(file))
    }
}

pub fn init(verbose: bool, target: LogTarget) -> Result<()> {
    let default_level = match (&target, verbose) {
        (_, true) => "debug",
        (LogTarget::File(_), false) => "info",
        (LogTarget::Stderr, false) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    let installed = match target {
        LogTarget::Stderr => {
            tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())
        }
        LogTarget::File(file) => tracing::subscriber::set_global_default(
            builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish(),
        ),
    };

    installed.context("Failed to set global default subscriber")
}
