//! Plugin discovery and loading
//!
//! Plugins are executables named `paint-shape-*`, discovered from:
//! 1. `.paint/plugins/` and any configured plugin directories
//! 2. PATH, when enabled

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use super::protocol::{PluginManifest, PluginRequest, PluginResponse};
use crate::domain::{Primitive, Surface};
use crate::extension::{Announcement, Drawable, Icon};

/// File name prefix shared by all shape plugins
pub const PLUGIN_PREFIX: &str = "paint-shape-";

/// How long a plugin gets to answer one invocation
pub const PLUGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for a plugin that has answered to exit
const REAP_POLL: Duration = Duration::from_millis(10);

/// Information about a discovered plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// File name without the prefix (e.g., "star")
    pub name: String,

    /// Path to the plugin executable
    pub path: PathBuf,

    /// Plugin manifest (loaded on demand)
    pub manifest: Option<PluginManifest>,
}

/// Plugin loader and executor
pub struct PluginLoader {
    /// Discovered plugins, keyed by name
    plugins: BTreeMap<String, PluginInfo>,

    /// Plugin directories, searched in order
    plugin_dirs: Vec<PathBuf>,

    /// Whether to search PATH after the plugin directories
    search_path: bool,
}

impl PluginLoader {
    /// Creates a new plugin loader
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
            plugin_dirs: Vec::new(),
            search_path: false,
        }
    }

    /// Adds a plugin directory to search
    pub fn add_plugin_dir(&mut self, dir: impl Into<PathBuf>) {
        self.plugin_dirs.push(dir.into());
    }

    pub fn search_path(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    /// Discovers all available plugins
    pub fn discover(&mut self) -> Result<()> {
        self.plugins.clear();

        // Project directories first so they shadow PATH
        for dir in &self.plugin_dirs.clone() {
            self.scan_directory(dir);
        }

        if self.search_path {
            if let Ok(path_var) = std::env::var("PATH") {
                for dir in std::env::split_paths(&path_var) {
                    self.scan_directory(&dir);
                }
            }
        }

        debug!(count = self.plugins.len(), "Plugin discovery finished");
        Ok(())
    }

    /// Scans a directory for plugins
    fn scan_directory(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return, // Ignore missing or unreadable directories
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = plugin_name(&path) else {
                continue;
            };
            if !is_executable(&path) {
                continue;
            }

            // Don't override existing plugins (first found wins)
            self.plugins.entry(name.clone()).or_insert(PluginInfo {
                name,
                path,
                manifest: None,
            });
        }
    }

    /// Lists all discovered plugins, sorted by name
    pub fn list(&self) -> Vec<&PluginInfo> {
        self.plugins.values().collect()
    }

    /// Gets a plugin by name
    pub fn get(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.get(name)
    }

    /// Gets the manifest for a plugin (loads if needed)
    pub fn get_manifest(&mut self, name: &str) -> Result<Option<PluginManifest>> {
        if let Some(info) = self.plugins.get_mut(name) {
            if info.manifest.is_none() {
                info.manifest = Some(load_manifest(&info.path)?);
            }
            Ok(info.manifest.clone())
        } else {
            Ok(None)
        }
    }

    /// Asks a plugin for its outline, returning the primitives
    pub fn test(&self, name: &str, size: i32) -> Result<Vec<Primitive>> {
        let info = self
            .plugins
            .get(name)
            .ok_or_else(|| anyhow!("Plugin not found: {}", name))?;
        fetch_outline(&info.path, size)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// The plugin name for a path, if its file name carries the plugin prefix
pub fn plugin_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_prefix(PLUGIN_PREFIX)?;
    let name = name.strip_suffix(".exe").unwrap_or(name);
    (!name.is_empty()).then(|| name.to_string())
}

/// Whether `path` currently looks like a runnable plugin
pub fn is_plugin_file(path: &Path) -> bool {
    plugin_name(path).is_some() && is_executable(path)
}

/// Checks if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = path.metadata() {
            return meta.is_file() && meta.permissions().mode() & 0o111 != 0;
        }
    }

    #[cfg(windows)]
    {
        if let Some(ext) = path.extension() {
            return path.is_file() && (ext == "exe" || ext == "bat" || ext == "cmd");
        }
    }

    false
}

/// Loads the manifest from a plugin
pub fn load_manifest(path: &Path) -> Result<PluginManifest> {
    load_manifest_within(path, PLUGIN_TIMEOUT)
}

fn load_manifest_within(path: &Path, timeout: Duration) -> Result<PluginManifest> {
    let child = Command::new(path)
        .arg("--manifest")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to execute plugin: {}", path.display()))?;

    let (stdout, status) = collect_output(child, path, timeout, |mut reader| {
        let mut out = String::new();
        reader.read_to_string(&mut out).map(|_| out)
    })?;

    if let Some(status) = status.filter(|s| !s.success()) {
        bail!("Plugin exited with {}", status);
    }

    let manifest: PluginManifest = serde_json::from_str(&stdout)
        .with_context(|| format!("Failed to parse plugin manifest: {}", path.display()))?;

    Ok(manifest)
}

/// Executes a plugin request, giving up after [`PLUGIN_TIMEOUT`]
pub fn execute(path: &Path, request: &PluginRequest) -> Result<PluginResponse> {
    execute_within(path, request, PLUGIN_TIMEOUT)
}

/// Executes a plugin request, killing the plugin if no response line
/// arrives within `timeout`
pub fn execute_within(
    path: &Path,
    request: &PluginRequest,
    timeout: Duration,
) -> Result<PluginResponse> {
    let mut child = Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to spawn plugin: {}", path.display()))?;

    // Send request, then close stdin so the plugin sees EOF
    let sent = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("Failed to open plugin stdin"))
        .and_then(|mut stdin| {
            let request_json =
                serde_json::to_string(request).context("Failed to serialize request")?;
            writeln!(stdin, "{}", request_json).context("Failed to write to plugin")
        });
    if let Err(e) = sent {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e);
    }

    let (response_line, _) = collect_output(child, path, timeout, |reader| {
        reader.lines().next().unwrap_or_else(|| Ok(String::new()))
    })?;
    if response_line.is_empty() {
        bail!("No response from plugin");
    }

    serde_json::from_str(&response_line).context("Failed to parse plugin response")
}

/// Reads the plugin's stdout with `read` on a helper thread
///
/// The plugin is killed when `read` has not finished within `timeout`, and
/// again if it is still running once the deadline passes after answering.
fn collect_output<F>(
    mut child: Child,
    path: &Path,
    timeout: Duration,
    read: F,
) -> Result<(String, Option<ExitStatus>)>
where
    F: FnOnce(BufReader<ChildStdout>) -> std::io::Result<String> + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            bail!("Failed to open plugin stdout");
        }
    };

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read(BufReader::new(stdout)));
    });

    let output = match rx.recv_timeout(timeout) {
        Ok(output) => output,
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            warn!(plugin = %path.display(), "Plugin timed out");
            bail!("Plugin timed out after {:?}: {}", timeout, path.display());
        }
    };

    let status = reap(child, path, deadline);
    let output = output.context("Failed to read plugin output")?;
    Ok((output, status))
}

/// Waits for a plugin that has answered, killing it at `deadline`
fn reap(mut child: Child, path: &Path, deadline: Instant) -> Option<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(plugin = %path.display(), %status, "Plugin exited");
                return Some(status);
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
            _ => {
                debug!(plugin = %path.display(), "Plugin still running after answering, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    }
}

fn fetch_outline(path: &Path, size: i32) -> Result<Vec<Primitive>> {
    execute(path, &PluginRequest::draw(size))?.into_outline()
}

/// Builds a discovery announcement for the plugin at `path`
pub fn announce(path: &Path, size: i32) -> Result<Announcement> {
    let manifest = load_manifest(path)?;
    let icon = Icon::new(manifest.icon_or_initial());
    let shape = Arc::new(ExternalShape::new(path.to_path_buf(), size));
    shape.prefetch();
    Ok(Announcement::new(manifest.name, icon, shape))
}

/// A shape drawn by an external plugin
///
/// The outline is requested once, normally by [`announce`] on the discovery
/// thread, and translated to each anchor afterwards. A failed request is
/// remembered too, so a broken plugin is not re-spawned on every repaint.
pub struct ExternalShape {
    path: PathBuf,
    size: i32,
    outline: OnceLock<std::result::Result<Vec<Primitive>, String>>,
}

impl ExternalShape {
    pub fn new(path: PathBuf, size: i32) -> Self {
        Self {
            path,
            size,
            outline: OnceLock::new(),
        }
    }

    /// Requests the outline now so drawing never has to wait on the plugin
    pub fn prefetch(&self) {
        if let Err(e) = self.outline() {
            warn!(plugin = %self.path.display(), "Plugin outline unavailable: {}", e);
        }
    }

    fn outline(&self) -> &std::result::Result<Vec<Primitive>, String> {
        self.outline.get_or_init(|| {
            debug!(plugin = %self.path.display(), "Fetching plugin outline");
            fetch_outline(&self.path, self.size).map_err(|e| format!("{:#}", e))
        })
    }
}

impl Drawable for ExternalShape {
    fn draw(&self, surface: &mut dyn Surface, anchor: crate::domain::Point) -> Result<()> {
        let outline = self.outline().as_ref().map_err(|e| anyhow!("{}", e))?;
        for primitive in outline {
            surface.draw(primitive.translated(anchor.x, anchor.y));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_loader_is_empty() {
        let loader = PluginLoader::new();
        assert!(loader.list().is_empty());
    }

    #[test]
    fn add_plugin_dir() {
        let mut loader = PluginLoader::new();
        loader.add_plugin_dir("/some/path");

        assert_eq!(loader.plugin_dirs.len(), 1);
    }

    #[test]
    fn discover_empty_dir() {
        let dir = TempDir::new().unwrap();
        let mut loader = PluginLoader::new();
        loader.add_plugin_dir(dir.path());
        loader.discover().unwrap();

        assert!(loader.list().is_empty());
    }

    #[test]
    fn get_nonexistent_plugin() {
        let loader = PluginLoader::new();
        assert!(loader.get("nonexistent").is_none());
        assert!(loader.test("nonexistent", 54).is_err());
    }

    #[test]
    fn plugin_names_require_prefix() {
        assert_eq!(
            plugin_name(Path::new("/x/paint-shape-star")).as_deref(),
            Some("star")
        );
        assert_eq!(
            plugin_name(Path::new("paint-shape-star.exe")).as_deref(),
            Some("star")
        );
        assert_eq!(plugin_name(Path::new("/x/paint-shape-")), None);
        assert_eq!(plugin_name(Path::new("/x/shape-star")), None);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::domain::{Color, DisplayList, Point};
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        const STAR: &str = r#"#!/bin/sh
if [ "$1" = "--manifest" ]; then
  echo '{"name":"Star","version":"0.1.0","description":"A star","icon":"*"}'
  exit 0
fi
read -r request
echo '{"success":true,"data":{"primitives":[{"kind":"line","from":{"x":-3,"y":0},"to":{"x":3,"y":0},"color":"yellow"}]}}'
"#;

        fn write_plugin(dir: &Path, file_name: &str, body: &str, mode: u32) -> PathBuf {
            let path = dir.join(file_name);
            fs::write(&path, body).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            path
        }

        #[test]
        fn discovers_only_executable_prefixed_files() {
            let dir = TempDir::new().unwrap();
            write_plugin(dir.path(), "paint-shape-star", STAR, 0o755);
            write_plugin(dir.path(), "paint-shape-inert", STAR, 0o644);
            write_plugin(dir.path(), "other-tool", STAR, 0o755);

            let mut loader = PluginLoader::new();
            loader.add_plugin_dir(dir.path());
            loader.discover().unwrap();

            let names: Vec<&str> = loader.list().iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["star"]);
            let manifest = loader.get_manifest("star").unwrap().unwrap();
            assert_eq!(manifest.name, "Star");
        }

        #[test]
        fn external_shape_draws_translated_outline() {
            let dir = TempDir::new().unwrap();
            let path = write_plugin(dir.path(), "paint-shape-star", STAR, 0o755);

            let announcement = announce(&path, 54).unwrap();
            assert_eq!(announcement.name.as_deref(), Some("Star"));
            assert_eq!(announcement.icon, Some(Icon::new("*")));

            let mut list = DisplayList::new();
            announcement
                .shape
                .draw(&mut list, Point::new(100, 50))
                .unwrap();
            assert_eq!(
                list.primitives(),
                &[Primitive::Line {
                    from: Point::new(97, 50),
                    to: Point::new(103, 50),
                    color: Color::Yellow
                }]
            );
        }

        #[test]
        fn announce_fetches_outline_before_first_draw() {
            let dir = TempDir::new().unwrap();
            let counting = STAR.replace("read -r request", "read -r request\necho drawn >> \"$0.log\"");
            let path = write_plugin(dir.path(), "paint-shape-star", &counting, 0o755);
            let log = dir.path().join("paint-shape-star.log");

            let announcement = announce(&path, 54).unwrap();
            assert_eq!(fs::read_to_string(&log).unwrap(), "drawn\n");

            let mut list = DisplayList::new();
            announcement.shape.draw(&mut list, Point::new(0, 0)).unwrap();
            announcement.shape.draw(&mut list, Point::new(9, 9)).unwrap();
            assert_eq!(list.len(), 2);
            assert_eq!(fs::read_to_string(&log).unwrap(), "drawn\n");
        }

        #[test]
        fn unresponsive_plugin_is_killed_after_timeout() {
            let dir = TempDir::new().unwrap();
            let path = write_plugin(
                dir.path(),
                "paint-shape-stuck",
                "#!/bin/sh\nread -r request\nsleep 5\n",
                0o755,
            );

            let started = Instant::now();
            let result = execute_within(
                &path,
                &PluginRequest::draw(54),
                Duration::from_millis(200),
            );

            let err = result.unwrap_err();
            assert!(format!("{:#}", err).contains("timed out"));
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[test]
        fn unresponsive_manifest_is_killed_after_timeout() {
            let dir = TempDir::new().unwrap();
            let path = write_plugin(dir.path(), "paint-shape-stuck", "#!/bin/sh\nsleep 5\n", 0o755);

            let started = Instant::now();
            assert!(load_manifest_within(&path, Duration::from_millis(200)).is_err());
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[test]
        fn broken_plugin_fails_to_draw() {
            let dir = TempDir::new().unwrap();
            let path = write_plugin(
                dir.path(),
                "paint-shape-broken",
                "#!/bin/sh\necho not-json\n",
                0o755,
            );

            let shape = ExternalShape::new(path, 54);
            let mut list = DisplayList::new();
            assert!(shape.draw(&mut list, Point::new(0, 0)).is_err());
            assert!(shape.draw(&mut list, Point::new(0, 0)).is_err());
            assert!(list.is_empty());
        }
    }
}
