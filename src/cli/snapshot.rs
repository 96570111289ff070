//! Headless canvas session
//!
//! Starts a host exactly like `paint run`, applies scripted input, prints
//! what the canvas holds, and shuts down. Input is applied in a fixed order:
//! select, clicks, adds, then unloads.

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use super::output::Output;
use crate::canvas::{CanvasSnapshot, PaintApi};
use crate::domain::{Point, ShapeRecord};
use crate::runtime::{HostSettings, PaintHost};
use crate::storage::Config;

#[derive(Args, Debug, Default)]
pub struct SnapshotArgs {
    /// Tool to select before clicking
    #[arg(long, value_name = "NAME")]
    pub select: Option<String>,

    /// Place the selected tool centred on X,Y (repeatable)
    #[arg(long = "click", value_name = "X,Y")]
    pub clicks: Vec<Point>,

    /// Place NAME centred on X,Y regardless of the selection (repeatable)
    #[arg(long = "add", value_name = "NAME@X,Y")]
    pub adds: Vec<ShapeRecord>,

    /// Withdraw an extension once shapes are placed (repeatable)
    #[arg(long = "unload", value_name = "NAME")]
    pub unloads: Vec<String>,

    /// Do not load executable plugins
    #[arg(long)]
    pub no_plugins: bool,
}

pub fn run(args: SnapshotArgs, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let mut settings = HostSettings::from_config(&config).without_watch();
    if args.no_plugins {
        settings.plugins = None;
    }

    let snapshot = capture(settings, args)?;

    if output.is_json() {
        output.data(&snapshot);
    } else {
        print_text(output, &snapshot);
    }
    Ok(())
}

/// Runs one scripted session and returns the final snapshot
pub fn capture(settings: HostSettings, args: SnapshotArgs) -> Result<CanvasSnapshot> {
    let host = PaintHost::init(settings)?;
    let client = host.client();

    if let Some(name) = &args.select {
        client.select_tool(name)?;
    }
    for point in args.clicks {
        if client.click(point)?.is_none() {
            debug!(%point, "Click placed nothing");
        }
    }
    for record in args.adds {
        client.add_shape(record)?;
    }

    let listener = host.listener();
    for name in &args.unloads {
        listener.on_remove(name);
    }

    let snapshot = client.snapshot().context("Failed to capture canvas")?;
    host.shutdown()?;
    Ok(snapshot)
}

fn print_text(output: &Output, snapshot: &CanvasSnapshot) {
    let tools: Vec<String> = snapshot
        .tools
        .iter()
        .map(|tool| {
            if snapshot.selected.as_deref() == Some(tool.name.as_str()) {
                format!("[{} {}]", tool.icon, tool.name)
            } else {
                format!("{} {}", tool.icon, tool.name)
            }
        })
        .collect();

    println!("Canvas: {}x{}", snapshot.width, snapshot.height);
    if tools.is_empty() {
        println!("Tools: (none)");
    } else {
        println!("Tools: {}", tools.join("  "));
    }

    if snapshot.shapes.is_empty() {
        println!("No shapes placed.");
    } else {
        println!();
        let rows: Vec<Vec<String>> = snapshot
            .shapes
            .iter()
            .map(|shape| {
                let record = &shape.record;
                vec![
                    shape.id.to_string(),
                    record.name.clone(),
                    record.center().to_string(),
                    format!("{}x{}", record.width, record.height),
                    if shape.live { "live" } else { "placeholder" }.to_string(),
                ]
            })
            .collect();
        output.table(&["ID", "NAME", "CENTRE", "SIZE", "STATE"], &[6, 16, 12, 8], &rows);
    }

    println!();
    println!(
        "Painted {} shape(s), {} placeholder(s)",
        snapshot.stats.shapes, snapshot.stats.placeholders
    );
}
