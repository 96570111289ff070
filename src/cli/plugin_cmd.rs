//! Plugin management commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::Output;
use crate::plugin::{PluginLoader, PLUGIN_PREFIX};
use crate::storage::Config;

#[derive(Subcommand)]
pub enum PluginCommands {
    /// List available shape plugins
    List,

    /// Ask a plugin for its manifest and outline
    Test {
        /// Plugin name, without the paint-shape- prefix
        name: String,
    },
}

pub fn run(cmd: PluginCommands, output: &Output) -> Result<()> {
    let config = Config::load()?;
    let mut loader = PluginLoader::new().search_path(config.project.plugins.search_path);
    for dir in config.plugin_dirs() {
        loader.add_plugin_dir(dir);
    }
    loader.discover()?;

    match cmd {
        PluginCommands::List => list_plugins(output, &mut loader),
        PluginCommands::Test { name } => {
            test_plugin(output, &loader, &name, config.project.canvas.shape_size)
        }
    }
}

fn list_plugins(output: &Output, loader: &mut PluginLoader) -> Result<()> {
    let names: Vec<String> = loader.list().iter().map(|p| p.name.clone()).collect();

    // Manifests are loaded best-effort; a broken plugin still gets listed
    let mut rows = Vec::new();
    for name in names {
        let manifest = loader.get_manifest(&name).ok().flatten();
        let path = loader
            .get(&name)
            .map(|p| p.path.display().to_string())
            .unwrap_or_default();
        rows.push((name, manifest, path));
    }

    if output.is_json() {
        let items: Vec<_> = rows
            .iter()
            .map(|(name, manifest, path)| {
                serde_json::json!({
                    "name": name,
                    "shape": manifest.as_ref().map(|m| m.name.clone()),
                    "version": manifest.as_ref().map(|m| m.version.clone()),
                    "path": path,
                })
            })
            .collect();
        output.data(&items);
    } else if rows.is_empty() {
        println!("No plugins found.");
        println!();
        println!("Plugins are executables named '{}<name>' in:", PLUGIN_PREFIX);
        println!("  - .paint/plugins/ directory");
        println!("  - directories listed under [plugins] dirs");
        println!("  - PATH, when [plugins] search_path = true");
    } else {
        println!("Available plugins:");
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|(name, manifest, path)| {
                let shape = manifest.map_or_else(|| "(no manifest)".to_string(), |m| m.name);
                vec![name, shape, path]
            })
            .collect();
        output.table(&["NAME", "SHAPE", "PATH"], &[20, 16], &rows);
    }

    Ok(())
}

fn test_plugin(output: &Output, loader: &PluginLoader, name: &str, size: i32) -> Result<()> {
    let Some(info) = loader.get(name) else {
        bail!("Plugin not found: {}", name);
    };

    let manifest = crate::plugin::load_manifest(&info.path);
    let outline = loader.test(name, size);

    if output.is_json() {
        output.data(&serde_json::json!({
            "name": name,
            "manifest": manifest.as_ref().ok(),
            "manifest_error": manifest.as_ref().err().map(|e| format!("{:#}", e)),
            "primitives": outline.as_ref().ok(),
            "draw_error": outline.as_ref().err().map(|e| format!("{:#}", e)),
        }));
        return Ok(());
    }

    match &manifest {
        Ok(manifest) => {
            println!("Shape: {}", manifest.name);
            println!("Version: {}", manifest.version);
            println!("Description: {}", manifest.description);
            println!("Icon: {}", manifest.icon_or_initial());
            println!();
        }
        Err(e) => output.error(&format!("Plugin '{}' manifest failed: {:#}", name, e)),
    }

    match outline {
        Ok(primitives) => output.success(&format!(
            "Plugin '{}' drew {} primitive(s) at size {}",
            name,
            primitives.len(),
            size
        )),
        Err(e) => output.error(&format!("Plugin '{}' failed to draw: {:#}", name, e)),
    }

    Ok(())
}
