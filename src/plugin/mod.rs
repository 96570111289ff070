//! # Plugin System
//!
//! Shapes supplied by separate executables.
//!
//! ## Overview
//!
//! Plugins are separate binaries that communicate with paint via JSON over
//! stdin/stdout, so a shape can be written in any language.
//!
//! ## Plugin Discovery
//!
//! Executables named `paint-shape-{name}` are discovered in:
//! 1. `.paint/plugins/` and directories listed under `[plugins] dirs`
//! 2. `$PATH`, when `search_path = true`
//!
//! While `paint run` is active the plugin directories are watched: adding,
//! rewriting or deleting a plugin adds, replaces or removes its tool.
//!
//! ## Protocol
//!
//! ```text
//! Host                           Plugin Binary
//!  │                               │
//!  ├── paint-shape-star --manifest │
//!  │   └── Stdout: {"name": "Star", "version": "0.1.0", "icon": "*"}
//!  │                               │
//!  ├── Stdin: {"operation": "draw", "params": {"size": 54}}
//!  │                               │
//!  └── Stdout: {"success": true, "data": {"primitives": [...]}}
//! ```
//!
//! Primitives are relative to the shape centre at (0,0). The outline is
//! requested once per loaded plugin and translated for every placement.
//!
//! ## Key Types
//!
//! - [`PluginLoader`] - Discovers and executes plugins
//! - [`PluginManifest`] - Describes the shape a plugin draws
//! - [`ExternalShape`] - A plugin as a drawable extension
//! - [`PluginWatcher`] - Discovery source over plugin directories

mod loader;
mod protocol;
mod watcher;

pub use loader::{
    announce, is_plugin_file, load_manifest, plugin_name, ExternalShape, PluginInfo, PluginLoader,
    PLUGIN_PREFIX,
};
pub use protocol::{DrawReply, PluginManifest, PluginRequest, PluginResponse};
pub use watcher::{classify, Change, PluginWatcher, WatchSettings};
