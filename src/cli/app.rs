//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use super::logging::{self, LogTarget};
use super::output::{Output, OutputFormat};
use super::snapshot::{self, SnapshotArgs};
use super::{plugin_cmd, tui};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "paint")]
#[command(author, version, about = "A terminal drawing host whose shapes come from extensions")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new paint project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Open the interactive canvas
    Run,

    /// Run a scripted session without a terminal UI and print the canvas
    Snapshot(SnapshotArgs),

    /// Manage shape plugins
    #[command(subcommand)]
    Plugin(plugin_cmd::PluginCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_else(|| {
        Config::load()
            .map(|config| config.global.default_format)
            .unwrap_or_default()
    });
    let output = Output::new(format);

    let log_target = match cli.command {
        Commands::Run => LogTarget::file(&run_log_path())?,
        _ => LogTarget::Stderr,
    };
    logging::init(cli.verbose, log_target)?;
    debug!("paint starting");

    match cli.command {
        Commands::Init { path } => {
            let project = Project::init(&path)?;
            info!(root = %project.root().display(), "Project initialized");
            output.success(&format!(
                "Initialized paint project at {}",
                project.root().display()
            ));
        }

        Commands::Run => tui::run()?,

        Commands::Snapshot(args) => snapshot::run(args, &output)?,

        Commands::Plugin(cmd) => plugin_cmd::run(cmd, &output)?,
    }

    debug!("Command completed successfully");
    Ok(())
}

/// The project's log file, or one in the temp dir outside a project
fn run_log_path() -> PathBuf {
    Project::open_current()
        .map(|project| project.log_path())
        .unwrap_or_else(|_| std::env::temp_dir().join("paint.log"))
}
