//! Project management
//!
//! Handles project initialization and the `.paint/` layout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{Config, PAINT_DIR};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a paint project. Run 'paint init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# paint configuration

# Offer the bundled Circle, Square and Triangle
builtin_shapes = true

# Drawn for shapes whose extension is gone (relative to .paint/)
placeholder_icon = "icons/placeholder.txt"

[canvas]
width = 400
height = 400
shape_size = 54

[plugins]
enabled = true
watch = true
debounce_ms = 500
search_path = false
dirs = []
"#;

const PLACEHOLDER_ICON: &str = "\
+--?--+
|     |
?  ?  ?
|     |
+--?--+
";

const GITIGNORE: &str = "# Ignore session logs
paint.log
";

/// A paint project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PAINT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path; existing files are kept
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let paint_dir = root.join(PAINT_DIR);

        for dir in [paint_dir.clone(), paint_dir.join("plugins"), paint_dir.join("icons")] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        write_if_missing(&paint_dir.join("config.toml"), DEFAULT_CONFIG)?;
        write_if_missing(&paint_dir.join("icons").join("placeholder.txt"), PLACEHOLDER_ICON)?;
        write_if_missing(&paint_dir.join(".gitignore"), GITIGNORE)?;

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .paint directory path
    pub fn paint_dir(&self) -> PathBuf {
        self.root.join(PAINT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the plugins directory
    pub fn plugins_dir(&self) -> PathBuf {
        self.paint_dir().join("plugins")
    }

    /// Returns the icons directory
    pub fn icons_dir(&self) -> PathBuf {
        self.paint_dir().join("icons")
    }

    /// Where `paint run` writes its log
    pub fn log_path(&self) -> PathBuf {
        self.paint_dir().join("paint.log")
    }
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
