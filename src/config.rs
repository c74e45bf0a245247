//! Configuration for anchorlight.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ANCHORLIGHT_CONFIG, ANCHORLIGHT_HOME)
//! 2. Config file (.anchorlight/config.yaml)
//! 3. Defaults (~/.anchorlight, built-in resolver vocabulary)
//!
//! Config file discovery:
//! - ANCHORLIGHT_CONFIG names the file directly when set
//! - Otherwise searches current directory and parents for .anchorlight/config.yaml
//! - `home` in the config file is relative to the .anchorlight/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::geometry::Viewport;
use crate::resolver::ResolverSettings;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".anchorlight";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    /// State directory (relative to the .anchorlight/ directory)
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub resolver: Option<ResolverSettings>,
    #[serde(default)]
    pub viewport: Option<ViewportConfig>,
}

/// Viewport used when a snapshot does not declare one
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
}

impl From<ViewportConfig> for Viewport {
    fn from(v: ViewportConfig) -> Self {
        Viewport {
            width: v.width,
            height: v.height,
            ..Viewport::default()
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Absolute path to anchorlight home (replay reports)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub resolver: ResolverSettings,
    pub viewport: Viewport,
}

impl ResolvedConfig {
    /// Directory replay reports are written to
    pub fn reports_dir(&self) -> PathBuf {
        self.home.join("reports")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("ANCHORLIGHT_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    let mut current = std::env::current_dir().ok()?;
    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Build the resolved configuration from an optional config file
fn resolve(config_file: Option<PathBuf>, default_home: PathBuf) -> Result<ResolvedConfig> {
    let env_home = std::env::var("ANCHORLIGHT_HOME").ok().map(PathBuf::from);

    let Some(config_path) = config_file else {
        return Ok(ResolvedConfig {
            home: env_home.unwrap_or(default_home),
            config_file: None,
            resolver: ResolverSettings::default(),
            viewport: Viewport::default(),
        });
    };

    let config = load_config_file(&config_path)?;
    let config_dir = config_path.parent().unwrap_or(Path::new("."));

    let home = match (env_home, config.home.as_deref()) {
        (Some(home), _) => home,
        (None, Some(home)) => resolve_path(config_dir, home),
        (None, None) => default_home,
    };

    Ok(ResolvedConfig {
        home,
        resolver: config.resolver.unwrap_or_default(),
        viewport: config.viewport.map(Viewport::from).unwrap_or_default(),
        config_file: Some(config_path),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);
    resolve(find_config_file(), default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Load a specific config file, bypassing discovery and the cache
pub fn load_from(path: &Path) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);
    resolve(Some(path.to_path_buf()), default_home)
}
