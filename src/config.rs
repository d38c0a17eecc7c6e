// Runtime configuration: defaults, optional YAML file, environment

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DB_FILE_NAME: &str = "expenses.db";
pub const CATEGORIES_FILE_NAME: &str = "categories.json";

/// Resolved configuration for one process
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub categories_path: PathBuf,
    pub host: String,
    pub port: u16,
}

/// On-disk config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    categories_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DB_FILE_NAME),
            categories_path: default_categories_path(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Defaults, then config file, then process environment
    ///
    /// An explicit `config_path` must be readable. Without one, the per-user
    /// file is used only if it exists.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        match config_path {
            Some(path) => config.merge_file(path)?,
            None => {
                if let Some(path) = default_config_file() {
                    if path.exists() {
                        config.merge_file(&path)?;
                    }
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a YAML config file
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        debug!(path = ?path, "Loading config file");
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        self.merge_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn merge_yaml(&mut self, contents: &str) -> Result<()> {
        // An empty document deserializes to unit, not a map
        if contents.trim().is_empty() {
            return Ok(());
        }
        let file: ConfigFile = serde_yaml::from_str(contents)?;

        if let Some(db_path) = file.db_path {
            self.db_path = db_path;
        }
        if let Some(categories_path) = file.categories_path {
            self.categories_path = categories_path;
        }
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        Ok(())
    }

    /// Overlay `PORT`, `EXPENSE_DB_PATH` and `EXPENSE_CATEGORIES_PATH`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| eyre!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(path) = lookup("EXPENSE_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("EXPENSE_CATEGORIES_PATH") {
            self.categories_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// `host:port` to bind the HTTP transport to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-user config file location, if the platform has a config dir
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("expense-tracker").join("config.yaml"))
}

/// `categories.json` next to the running executable
fn default_categories_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CATEGORIES_FILE_NAME)
}
