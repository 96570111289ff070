//! Configuration handling for paint
//!
//! Configuration is stored in `.paint/config.toml` (project) and
//! `~/.config/paint/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::DEFAULT_SHAPE_SIZE;

/// Name of the per-project directory
pub const PAINT_DIR: &str = ".paint";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Canvas dimensions and placement size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: i32,
    pub height: i32,

    /// Side of the box given to each placed shape
    pub shape_size: i32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            shape_size: DEFAULT_SHAPE_SIZE,
        }
    }
}

/// Configuration for executable shape plugins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Load plugins at all
    pub enabled: bool,

    /// Watch plugin directories for changes while running
    pub watch: bool,

    /// Debounce delay in milliseconds for plugin directory changes
    pub debounce_ms: u64,

    /// Also look for `paint-shape-*` executables on PATH
    pub search_path: bool,

    /// Extra plugin directories, relative to the project root
    pub dirs: Vec<PathBuf>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch: true,
            debounce_ms: 500,
            search_path: false,
            dirs: Vec::new(),
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Offer the bundled Circle, Square and Triangle
    pub builtin_shapes: bool,

    /// Placeholder icon, relative to `.paint/`
    pub placeholder_icon: Option<PathBuf>,

    /// Canvas settings
    pub canvas: CanvasConfig,

    /// Plugin settings
    pub plugins: PluginConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            builtin_shapes: true,
            placeholder_icon: Some(PathBuf::from("icons/placeholder.txt")),
            canvas: CanvasConfig::default(),
            plugins: PluginConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Rejects settings the canvas cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let canvas = &self.canvas;
        if canvas.width <= 0 || canvas.height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas size must be positive, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        if canvas.shape_size <= 0 {
            return Err(ConfigError::Invalid(format!(
                "shape_size must be positive, got {}",
                canvas.shape_size
            )));
        }
        if canvas.shape_size > canvas.width.min(canvas.height) {
            return Err(ConfigError::Invalid(format!(
                "shape_size {} does not fit a {}x{} canvas",
                canvas.shape_size, canvas.width, canvas.height
            )));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let (project, project_root) = Self::load_project()?;

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "paint", "paint").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Finds and loads project configuration
    fn load_project() -> Result<(ProjectConfig, Option<PathBuf>)> {
        match Self::find_project_root() {
            Some(root) => {
                let config = Self::load_project_config(&root)?;
                Ok((config, Some(root)))
            }
            None => Ok((ProjectConfig::default(), None)),
        }
    }

    /// Loads and validates project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PAINT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Finds the project root by looking for a `.paint/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Walks up from `start` looking for a `.paint/` directory
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PAINT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Plugin directories: `.paint/plugins/` plus configured extras
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        let Some(root) = self.project_root.as_deref() else {
            return Vec::new();
        };

        let mut dirs = vec![root.join(PAINT_DIR).join("plugins")];
        dirs.extend(self.project.plugins.dirs.iter().map(|dir| root.join(dir)));
        dirs
    }

    /// Absolute path of the placeholder icon, if one is configured
    pub fn placeholder_icon(&self) -> Option<PathBuf> {
        let icon = self.project.placeholder_icon.as_ref()?;
        match self.project_root.as_deref() {
            Some(root) => Some(root.join(PAINT_DIR).join(icon)),
            None if icon.is_absolute() => Some(icon.clone()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(project: ProjectConfig, root: Option<PathBuf>) -> Config {
        Config {
            project,
            global: GlobalConfig::default(),
            project_root: root,
        }
    }

    #[test]
    fn default_config() {
        let config = config(ProjectConfig::default(), None);

        assert_eq!(config.project.canvas.shape_size, 54);
        assert!(config.project.builtin_shapes);
        assert_eq!(config.global.default_format, OutputFormat::Text);
        assert!(config.project.validate().is_ok());
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
builtin_shapes = false

[canvas]
width = 200
height = 100

[plugins]
watch = false
dirs = ["shapes"]
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(!config.builtin_shapes);
        assert_eq!(config.canvas.width, 200);
        assert_eq!(config.canvas.shape_size, 54);
        assert!(!config.plugins.watch);
        assert!(config.plugins.enabled);
        assert_eq!(config.plugins.dirs, vec![PathBuf::from("shapes")]);
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str(r#"default_format = "json""#).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn validate_rejects_bad_canvas() {
        let mut project = ProjectConfig::default();
        project.canvas.width = 0;
        assert!(matches!(project.validate(), Err(ConfigError::Invalid(_))));

        let mut project = ProjectConfig::default();
        project.canvas.shape_size = 500;
        assert!(matches!(project.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_project_config_fails_to_load() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PAINT_DIR)).unwrap();
        fs::write(
            dir.path().join(PAINT_DIR).join("config.toml"),
            "[canvas]\nheight = -5\n",
        )
        .unwrap();

        assert!(Config::for_project(dir.path()).is_err());
    }

    #[test]
    fn find_project_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PAINT_DIR)).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn config_not_in_project() {
        let config = config(ProjectConfig::default(), None);

        assert!(config.plugin_dirs().is_empty());
        assert_eq!(config.placeholder_icon(), None);
    }

    #[test]
    fn paths_resolve_against_project() {
        let mut project = ProjectConfig::default();
        project.plugins.dirs = vec![PathBuf::from("shapes")];
        let config = config(project, Some(PathBuf::from("/work")));

        assert_eq!(
            config.plugin_dirs(),
            vec![
                PathBuf::from("/work/.paint/plugins"),
                PathBuf::from("/work/shapes")
            ]
        );
        assert_eq!(
            config.placeholder_icon(),
            Some(PathBuf::from("/work/.paint/icons/placeholder.txt"))
        );
    }
}
