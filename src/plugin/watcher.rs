//! Watches plugin directories and reports plugins coming and going
//!
//! An initial scan announces every plugin already present. With watching
//! enabled, a debounced filesystem watcher then reports new executables as
//! added, rewritten ones as modified and deleted ones as removed.
//!
//! Several files may declare the same shape name. The name stays announced
//! while any of them is present; the most recently announced file draws it.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, info, warn};

use super::loader::{self, PluginLoader};
use crate::extension::{DiscoveryListener, DiscoverySource};

/// How often the watch thread checks for a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What a filesystem change means for a plugin path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Modified,
    Removed,
}

/// Classifies a change from whether the path is a runnable plugin now and
/// whether it had been announced before
pub fn classify(is_plugin: bool, announced: bool) -> Option<Change> {
    match (is_plugin, announced) {
        (true, false) => Some(Change::Added),
        (true, true) => Some(Change::Modified),
        (false, true) => Some(Change::Removed),
        (false, false) => None,
    }
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub dirs: Vec<PathBuf>,
    pub search_path: bool,
    pub watch: bool,
    pub debounce: Duration,
    pub shape_size: i32,
}

pub struct PluginWatcher {
    settings: WatchSettings,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PluginWatcher {
    pub fn new(settings: WatchSettings) -> Self {
        Self {
            settings,
            debouncer: None,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn initial_scan(&self, tracker: &mut Tracker) -> Result<()> {
        let mut plugins = PluginLoader::new().search_path(self.settings.search_path);
        for dir in &self.settings.dirs {
            plugins.add_plugin_dir(dir);
        }
        plugins.discover()?;

        for info in plugins.list() {
            tracker.apply(&info.path, Change::Added);
        }
        Ok(())
    }

    fn start_watching(&mut self, tracker: Tracker) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer =
            new_debouncer(self.settings.debounce, tx).context("Failed to create plugin watcher")?;

        for dir in &self.settings.dirs {
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "Plugin directory missing, not watching");
                continue;
            }
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
        }

        let stop = Arc::clone(&self.stop);
        let worker = thread::Builder::new()
            .name("paint-plugins".to_string())
            .spawn(move || watch_loop(rx, stop, tracker))
            .context("Failed to spawn plugin watcher thread")?;

        self.debouncer = Some(debouncer);
        self.worker = Some(worker);
        Ok(())
    }
}

impl DiscoverySource for PluginWatcher {
    fn label(&self) -> &str {
        "plugins"
    }

    fn open(&mut self, listener: Arc<dyn DiscoveryListener>) -> Result<()> {
        let mut tracker = Tracker::new(listener, self.settings.shape_size);
        self.initial_scan(&mut tracker)?;
        info!(count = tracker.announced.len(), "Plugins loaded");

        if self.settings.watch {
            self.start_watching(tracker)?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Dropping the debouncer disconnects the channel as well
        self.debouncer.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Plugin watcher thread panicked");
            }
        }
    }
}

impl Drop for PluginWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Paths announced so far and the names they were announced under
struct Tracker {
    announced: HashMap<PathBuf, String>,
    /// Every announced path per shape name
    providers: HashMap<String, BTreeSet<PathBuf>>,
    /// The path whose shape the listener currently holds, per name
    active: HashMap<String, PathBuf>,
    listener: Arc<dyn DiscoveryListener>,
    shape_size: i32,
}

impl Tracker {
    fn new(listener: Arc<dyn DiscoveryListener>, shape_size: i32) -> Self {
        Self {
            announced: HashMap::new(),
            providers: HashMap::new(),
            active: HashMap::new(),
            listener,
            shape_size,
        }
    }

    fn observe(&mut self, path: &Path) {
        if loader::plugin_name(path).is_none() {
            return;
        }
        let change = classify(
            loader::is_plugin_file(path),
            self.announced.contains_key(path),
        );
        if let Some(change) = change {
            self.apply(path, change);
        }
    }

    fn apply(&mut self, path: &Path, change: Change) {
        if change == Change::Removed {
            self.withdraw(path);
            return;
        }

        let announcement = match loader::announce(path, self.shape_size) {
            Ok(a) => a,
            Err(e) => {
                warn!(plugin = %path.display(), "Skipping plugin: {:#}", e);
                return;
            }
        };
        let Some(name) = announcement.name.clone() else {
            return;
        };

        // Same file, new shape name
        if self.announced.get(path).is_some_and(|previous| *previous != name) {
            self.withdraw(path);
        }

        let visible = self.active.contains_key(&name);
        self.announced.insert(path.to_path_buf(), name.clone());
        self.providers
            .entry(name.clone())
            .or_default()
            .insert(path.to_path_buf());
        self.active.insert(name.clone(), path.to_path_buf());

        if visible {
            info!(plugin = %path.display(), extension = %name, "Plugin modified");
            self.listener.on_modify(announcement);
        } else {
            info!(plugin = %path.display(), extension = %name, "Plugin added");
            self.listener.on_add(announcement);
        }
    }

    /// Drops `path`; its shape name goes away only with its last provider
    fn withdraw(&mut self, path: &Path) {
        let Some(name) = self.announced.remove(path) else {
            return;
        };
        info!(plugin = %path.display(), extension = %name, "Plugin removed");

        let survivors: Vec<PathBuf> = match self.providers.get_mut(&name) {
            Some(paths) => {
                paths.remove(path);
                paths.iter().cloned().collect()
            }
            None => Vec::new(),
        };
        if self.active.get(&name).is_some_and(|active| active != path) {
            return;
        }

        for survivor in survivors {
            match loader::announce(&survivor, self.shape_size) {
                Ok(announcement) if announcement.name.as_deref() == Some(name.as_str()) => {
                    info!(plugin = %survivor.display(), extension = %name, "Plugin now provides shape");
                    self.active.insert(name, survivor);
                    self.listener.on_modify(announcement);
                    return;
                }
                Ok(_) => debug!(plugin = %survivor.display(), "Plugin no longer provides {}", name),
                Err(e) => warn!(plugin = %survivor.display(), "Skipping plugin: {:#}", e),
            }
            // Picked up again by its own change event, if it has one
            self.announced.remove(&survivor);
        }

        self.providers.remove(&name);
        self.active.remove(&name);
        self.listener.on_remove(&name);
    }
}

fn watch_loop(rx: Receiver<DebounceEventResult>, stop: Arc<AtomicBool>, mut tracker: Tracker) {
    debug!("Plugin watcher started");

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(events)) => {
                let mut paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                paths.sort();
                paths.dedup();
                for path in paths {
                    tracker.observe(&path);
                }
            }
            Ok(Err(error)) => warn!("Plugin watch error: {:?}", error),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Plugin watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Announcement;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl DiscoveryListener for Recorder {
        fn on_add(&self, announcement: Announcement) {
            let name = announcement.name.unwrap_or_default();
            self.events.lock().unwrap().push(format!("+{name}"));
        }

        fn on_modify(&self, announcement: Announcement) {
            let name = announcement.name.unwrap_or_default();
            self.events.lock().unwrap().push(format!("~{name}"));
        }

        fn on_remove(&self, name: &str) {
            self.events.lock().unwrap().push(format!("-{name}"));
        }
    }

    fn settings(dir: &Path, watch: bool) -> WatchSettings {
        WatchSettings {
            dirs: vec![dir.to_path_buf()],
            search_path: false,
            watch,
            debounce: Duration::from_millis(50),
            shape_size: 54,
        }
    }

    #[test]
    fn classify_covers_lifecycle() {
        assert_eq!(classify(true, false), Some(Change::Added));
        assert_eq!(classify(true, true), Some(Change::Modified));
        assert_eq!(classify(false, true), Some(Change::Removed));
        assert_eq!(classify(false, false), None);
    }

    #[test]
    fn empty_directory_announces_nothing() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut watcher = PluginWatcher::new(settings(dir.path(), true));

        watcher.open(recorder.clone()).unwrap();
        watcher.close();
        watcher.close();

        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut watcher = PluginWatcher::new(settings(&dir.path().join("absent"), true));

        assert!(watcher.open(recorder).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn initial_scan_and_removal() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paint-shape-dot");
        fs::write(
            &path,
            "#!/bin/sh\necho '{\"name\":\"Dot\",\"version\":\"0.1.0\"}'\n",
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let recorder = Arc::new(Recorder::default());
        let mut tracker = Tracker::new(recorder.clone(), 54);
        let watcher = PluginWatcher::new(settings(dir.path(), false));
        watcher.initial_scan(&mut tracker).unwrap();

        fs::remove_file(&path).unwrap();
        tracker.observe(&path);
        tracker.observe(&path);

        assert_eq!(*recorder.events.lock().unwrap(), vec!["+Dot", "-Dot"]);
    }

    #[cfg(unix)]
    mod shared_names {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        const STAR: &str = "#!/bin/sh\necho '{\"name\":\"Star\",\"version\":\"0.1.0\"}'\n";

        fn star(dir: &Path, file_name: &str) -> PathBuf {
            let path = dir.join(file_name);
            fs::write(&path, STAR).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn events(recorder: &Recorder) -> Vec<String> {
            recorder.events.lock().unwrap().clone()
        }

        #[test]
        fn second_provider_replaces_the_first() {
            let dir = TempDir::new().unwrap();
            let first = star(dir.path(), "paint-shape-star");
            let second = star(dir.path(), "paint-shape-star-two");

            let recorder = Arc::new(Recorder::default());
            let mut tracker = Tracker::new(recorder.clone(), 54);
            tracker.observe(&first);
            tracker.observe(&second);

            assert_eq!(events(&recorder), vec!["+Star", "~Star"]);
        }

        #[test]
        fn removing_the_drawing_provider_falls_back_to_a_survivor() {
            let dir = TempDir::new().unwrap();
            let first = star(dir.path(), "paint-shape-star");
            let second = star(dir.path(), "paint-shape-star-two");

            let recorder = Arc::new(Recorder::default());
            let mut tracker = Tracker::new(recorder.clone(), 54);
            tracker.observe(&first);
            tracker.observe(&second);

            fs::remove_file(&second).unwrap();
            tracker.observe(&second);
            assert_eq!(events(&recorder), vec!["+Star", "~Star", "~Star"]);

            fs::remove_file(&first).unwrap();
            tracker.observe(&first);
            assert_eq!(events(&recorder), vec!["+Star", "~Star", "~Star", "-Star"]);
        }

        #[test]
        fn removing_a_shadowed_provider_changes_nothing() {
            let dir = TempDir::new().unwrap();
            let first = star(dir.path(), "paint-shape-star");
            let second = star(dir.path(), "paint-shape-star-two");

            let recorder = Arc::new(Recorder::default());
            let mut tracker = Tracker::new(recorder.clone(), 54);
            tracker.observe(&first);
            tracker.observe(&second);

            fs::remove_file(&first).unwrap();
            tracker.observe(&first);
            assert_eq!(events(&recorder), vec!["+Star", "~Star"]);

            fs::remove_file(&second).unwrap();
            tracker.observe(&second);
            assert_eq!(events(&recorder), vec!["+Star", "~Star", "-Star"]);
        }

        #[test]
        fn renamed_shape_leaves_the_other_provider_in_place() {
            let dir = TempDir::new().unwrap();
            let first = star(dir.path(), "paint-shape-star");
            let second = star(dir.path(), "paint-shape-star-two");

            let recorder = Arc::new(Recorder::default());
            let mut tracker = Tracker::new(recorder.clone(), 54);
            tracker.observe(&first);
            tracker.observe(&second);

            fs::write(&second, STAR.replace("Star", "Comet")).unwrap();
            tracker.observe(&second);

            assert_eq!(events(&recorder), vec!["+Star", "~Star", "~Star", "+Comet"]);
        }
    }
}
