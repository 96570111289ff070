//! Owns the dispatcher thread, the registry and the discovery sources

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::dispatcher::{DispatchThread, Dispatcher};
use crate::canvas::{Canvas, PaintClient, SharedCanvas, DEFAULT_SHAPE_SIZE};
use crate::extension::{
    BuiltinShapes, DiscoveryListener, DiscoverySource, ExtensionRegistry, Placeholder,
};
use crate::plugin::{PluginWatcher, WatchSettings};
use crate::storage::Config;

/// Everything [`PaintHost::init`] needs
#[derive(Debug, Clone)]
pub struct HostSettings {
    pub width: i32,
    pub height: i32,
    pub shape_size: i32,
    pub placeholder_icon: Option<PathBuf>,
    pub builtin_shapes: bool,
    /// `None` disables executable plugins
    pub plugins: Option<WatchSettings>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            shape_size: DEFAULT_SHAPE_SIZE,
            placeholder_icon: None,
            builtin_shapes: true,
            plugins: None,
        }
    }
}

impl HostSettings {
    pub fn from_config(config: &Config) -> Self {
        let project = &config.project;
        let plugins = project.plugins.enabled.then(|| WatchSettings {
            dirs: config.plugin_dirs(),
            search_path: project.plugins.search_path,
            watch: project.plugins.watch,
            debounce: Duration::from_millis(project.plugins.debounce_ms),
            shape_size: project.canvas.shape_size,
        });

        Self {
            width: project.canvas.width,
            height: project.canvas.height,
            shape_size: project.canvas.shape_size,
            placeholder_icon: config.placeholder_icon(),
            builtin_shapes: project.builtin_shapes,
            plugins,
        }
    }

    /// Disables filesystem watching, keeping the initial plugin scan
    pub fn without_watch(mut self) -> Self {
        if let Some(plugins) = self.plugins.as_mut() {
            plugins.watch = false;
        }
        self
    }
}

/// A running paint host
///
/// [`PaintHost::init`] starts the dispatcher thread and opens the discovery
/// sources; [`PaintHost::shutdown`] closes them in reverse and hands back the
/// final canvas. Dropping the host shuts it down as well.
pub struct PaintHost {
    dispatcher: Dispatcher<SharedCanvas>,
    thread: Option<DispatchThread<SharedCanvas>>,
    registry: Arc<ExtensionRegistry>,
    sources: Vec<Box<dyn DiscoverySource>>,
}

impl PaintHost {
    pub fn init(settings: HostSettings) -> Result<Self> {
        let placeholder = Arc::new(Placeholder::new(
            settings.placeholder_icon.clone(),
            settings.shape_size,
        ));
        let canvas = Canvas::new(
            settings.width,
            settings.height,
            settings.shape_size,
            Arc::clone(&placeholder),
        );

        let (dispatcher, thread) = Dispatcher::spawn("paint-ui", SharedCanvas::new(canvas))
            .context("Failed to start dispatcher")?;
        let registry = Arc::new(ExtensionRegistry::new(dispatcher.clone(), placeholder));

        let mut host = Self {
            dispatcher,
            thread: Some(thread),
            registry,
            sources: Vec::new(),
        };

        if settings.builtin_shapes {
            host.attach(Box::new(BuiltinShapes::new()))?;
        }
        if let Some(plugins) = settings.plugins {
            host.attach(Box::new(PluginWatcher::new(plugins)))?;
        }

        info!(extensions = host.registry.len(), "Paint host started");
        Ok(host)
    }

    /// Opens `source` against the registry and keeps it until shutdown
    pub fn attach(&mut self, mut source: Box<dyn DiscoverySource>) -> Result<()> {
        debug!(source = source.label(), "Opening discovery source");
        let label = source.label().to_string();
        source
            .open(self.listener())
            .with_context(|| format!("Failed to open {} discovery", label))?;
        self.sources.push(source);
        Ok(())
    }

    pub fn dispatcher(&self) -> &Dispatcher<SharedCanvas> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// The registry as a discovery listener, for feeding events by hand
    pub fn listener(&self) -> Arc<dyn DiscoveryListener> {
        self.registry.clone()
    }

    pub fn client(&self) -> PaintClient {
        PaintClient::new(self.dispatcher.clone())
    }

    /// Stops discovery, closes the registry and joins the dispatcher thread
    pub fn shutdown(mut self) -> Result<Canvas> {
        self.stop()
            .context("Paint host already stopped")?
            .context("Dispatcher thread failed")
    }

    fn stop(&mut self) -> Option<Result<Canvas, super::DispatchError>> {
        let thread = self.thread.take()?;

        for mut source in self.sources.drain(..).rev() {
            debug!(source = source.label(), "Closing discovery source");
            source.close();
        }
        self.registry.close();

        let result = thread.join().map(SharedCanvas::into_inner);
        match &result {
            Ok(_) => info!("Paint host stopped"),
            Err(e) => warn!("Paint host stopped uncleanly: {}", e),
        }
        Some(result)
    }
}

impl Drop for PaintHost {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
