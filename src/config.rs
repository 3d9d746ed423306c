use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::catalog::CatalogProfile;
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://work.drewl.com";
pub const APP_DIR: &str = "docmost-shell";
pub const CONFIG_FILE: &str = "config.json";
/// Environment variable (also read from `.env`) overriding the stored base URL.
pub const BASE_URL_ENV: &str = "DOCMOST_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Root of the hosted editor instance; `goHome` navigates here.
    pub base_url: String,
    pub catalog_profile: CatalogProfile,
    /// JSON catalog replacing the built-in table for the profile.
    pub catalog_path: Option<PathBuf>,
    pub chrome_path: Option<PathBuf>,
    /// Remote debugging port of the browser hosting the editor.
    pub debug_port: u16,
    /// Local control bridge port; `None` disables the bridge.
    pub control_port: Option<u16>,
    /// Register menu chords system-wide. Off: chords only work while the
    /// shell window has focus.
    pub hotkeys: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            catalog_profile: CatalogProfile::default(),
            catalog_path: None,
            chrome_path: None,
            debug_port: 9223,
            control_port: Some(3917),
            hotkeys: false,
            window_width: 1200,
            window_height: 800,
        }
    }
}

impl ShellConfig {
    /// Apply `DOCMOST_URL` if it is set and valid.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(BASE_URL_ENV) {
            self.base_url = normalize_base_url(&raw)?;
        }
        Ok(())
    }
}

/// Parse and canonicalize a base URL. Only http(s) with a host is accepted.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url.to_string())
}

/// The persisted config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<platform config dir>/docmost-shell/config.json`
    pub fn default_location() -> Result<Self, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR).join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults.
    pub fn load(&self) -> Result<ShellConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(ShellConfig::default());
        }
        let file = std::fs::File::open(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let config: ShellConfig =
            serde_json::from_reader(reader).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(config)
    }

    pub fn save(&self, config: &ShellConfig) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(write_err)?;

        serde_json::to_writer_pretty(file, config).map_err(|e| ConfigError::Write {
            path: self.path.clone(),
            source: e.into(),
        })?;
        Ok(())
    }

    /// Validate and persist a new base URL, then mirror it into the running
    /// `config`. Only `base_url` is written; whatever else `config` carries
    /// from the environment or command line stays out of the file.
    pub fn set_base_url(&self, config: &mut ShellConfig, raw: &str) -> Result<String, ConfigError> {
        let url = normalize_base_url(raw)?;
        let mut stored = self.load()?;
        stored.base_url = url.clone();
        self.save(&stored)?;
        config.base_url = url.clone();
        Ok(url)
    }
}
