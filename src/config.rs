use crate::error::{MirrorError, Result};
use crate::types::Mirror;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Include the JSON file at compile time
const DEFAULTS_JSON: &str = include_str!("../assets/defaults.json");

/// Everything a run needs: mirror table, package list and pool/timeout knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub mirrors: Vec<Mirror>,
    pub packages: Vec<String>,
    pub workers: usize,
    pub timeout_secs: u64,
}

/// User overrides from `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UserSettings {
    mirrors: Option<Vec<Mirror>>,
    packages: Option<Vec<String>>,
    workers: Option<usize>,
    timeout_secs: Option<u64>,
}

/// ~/.config/pipspeed/config.toml (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pipspeed").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Settings {
    /// Built-in mirror table and package list shipped in assets/defaults.json
    pub fn builtin() -> Result<Self> {
        Ok(serde_json::from_str(DEFAULTS_JSON)?)
    }

    /// Load settings
    /// Strategy:
    /// 1. Start from the built-in defaults
    /// 2. Apply the user file: `explicit` if given (must exist), else the default location (optional)
    ///
    /// Not validated here: CLI overrides still apply on top, so callers run `validate` afterwards.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = Self::builtin()?;

        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(path) = path {
            let content = fs::read_to_string(&path)?;
            settings.apply_toml(&content)?;
            tracing::info!("Loaded settings from {}", path.display());
        }

        Ok(settings)
    }

    /// Overlay keys present in a TOML document onto `self`.
    pub fn apply_toml(&mut self, content: &str) -> Result<()> {
        let user: UserSettings = toml::from_str(content)?;

        if let Some(mirrors) = user.mirrors {
            self.mirrors = mirrors;
        }
        if let Some(packages) = user.packages {
            self.packages = packages;
        }
        if let Some(workers) = user.workers {
            self.workers = workers;
        }
        if let Some(timeout_secs) = user.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.mirrors.is_empty() {
            return Err(MirrorError::Config("no mirrors configured".to_string()));
        }
        if self.packages.is_empty() {
            return Err(MirrorError::Config("no packages configured".to_string()));
        }
        if self.workers == 0 {
            return Err(MirrorError::Config("workers must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(MirrorError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for m in &self.mirrors {
            if m.name.trim().is_empty() || m.url.trim().is_empty() {
                return Err(MirrorError::Config(format!(
                    "mirror entry needs both a name and a url: {:?}",
                    m
                )));
            }
            if !seen.insert(m.name.to_lowercase()) {
                return Err(MirrorError::Config(format!(
                    "duplicate mirror name: {}",
                    m.name
                )));
            }
        }
        Ok(())
    }

    /// Keep only the named mirrors (case-insensitive), in table order.
    /// An empty `names` keeps everything.
    pub fn retain_mirrors(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        for name in names {
            if !self.mirrors.iter().any(|m| m.name.eq_ignore_ascii_case(name)) {
                return Err(MirrorError::UnknownMirror(name.clone()));
            }
        }

        self.mirrors
            .retain(|m| names.iter().any(|n| m.name.eq_ignore_ascii_case(n)));
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of (mirror, package) probes a run issues
    pub fn probe_count(&self) -> usize {
        self.mirrors.len() * self.packages.len()
    }
}
