//! Application configuration management.
//!
//! This module handles loading and saving the sync configuration: cache
//! TTLs, the mutation debounce window, the refresh cadence, fan-out width
//! and which backend transport to talk to.
//!
//! Configuration is stored at `~/.config/flipcache/config.json`. Backend
//! settings can be overridden from the environment:
//!
//! - `FLIPCACHE_BACKEND_URL`: use the HTTP transport at this base URL
//! - `FLIPCACHE_BACKEND_PROGRAM`: use the CLI transport with this program
//! - `FLIPCACHE_BACKEND_DIR`: working directory for the CLI transport

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{Backend, CliBackend, HttpBackend};

/// Application name used for config directory paths
const APP_NAME: &str = "flipcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Program the CLI transport runs when nothing else is configured
const DEFAULT_BACKEND_PROGRAM: &str = "real-estate-tracker";

/// HTTP request timeout in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const ENV_BACKEND_URL: &str = "FLIPCACHE_BACKEND_URL";
pub const ENV_BACKEND_PROGRAM: &str = "FLIPCACHE_BACKEND_PROGRAM";
pub const ENV_BACKEND_DIR: &str = "FLIPCACHE_BACKEND_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum BackendConfig {
    Cli {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
    },
    Http {
        base_url: String,
        #[serde(default = "default_http_timeout")]
        timeout_secs: u64,
    },
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Cli {
            program: DEFAULT_BACKEND_PROGRAM.to_string(),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

impl BackendConfig {
    /// Build the transport this configuration describes.
    pub fn build(&self) -> Result<Arc<dyn Backend>> {
        match self {
            BackendConfig::Cli {
                program,
                args,
                working_dir,
            } => Ok(Arc::new(
                CliBackend::new(program.clone())
                    .with_args(args.clone())
                    .with_working_dir(working_dir.clone()),
            )),
            BackendConfig::Http {
                base_url,
                timeout_secs,
            } => {
                let backend = HttpBackend::new(base_url, Duration::from_secs(*timeout_secs))
                    .context("Failed to build HTTP client")?;
                Ok(Arc::new(backend))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub projects_ttl_secs: u64,
    pub dashboard_ttl_secs: u64,
    /// Expenses, rooms and project detail.
    pub detail_ttl_secs: u64,
    pub debounce_ms: u64,
    pub refresh_interval_secs: u64,
    /// Projects whose details are fetched at once (two calls each).
    pub max_concurrent_fetches: usize,
    pub backend: BackendConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            projects_ttl_secs: 60,
            dashboard_ttl_secs: 60,
            detail_ttl_secs: 120,
            debounce_ms: 500,
            refresh_interval_secs: 30,
            max_concurrent_fetches: 8,
            backend: BackendConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn projects_ttl(&self) -> Duration {
        Duration::from_secs(self.projects_ttl_secs)
    }

    pub fn dashboard_ttl(&self) -> Duration {
        Duration::from_secs(self.dashboard_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent_fetches.max(1)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            debug!(base_url = %base_url, "Backend URL from environment");
            let timeout_secs = match self.backend {
                BackendConfig::Http { timeout_secs, .. } => timeout_secs,
                BackendConfig::Cli { .. } => DEFAULT_HTTP_TIMEOUT_SECS,
            };
            self.backend = BackendConfig::Http {
                base_url,
                timeout_secs,
            };
            return;
        }

        let program_override = lookup(ENV_BACKEND_PROGRAM).filter(|v| !v.is_empty());
        let dir_override = lookup(ENV_BACKEND_DIR).filter(|v| !v.is_empty());
        if program_override.is_none() && dir_override.is_none() {
            return;
        }

        let (mut program, mut args, mut working_dir) = match &self.backend {
            BackendConfig::Cli {
                program,
                args,
                working_dir,
            } => (program.clone(), args.clone(), working_dir.clone()),
            BackendConfig::Http { .. } => (DEFAULT_BACKEND_PROGRAM.to_string(), Vec::new(), None),
        };
        if let Some(p) = program_override {
            program = p;
            args.clear();
        }
        if let Some(dir) = dir_override {
            working_dir = Some(PathBuf::from(dir));
        }
        self.backend = BackendConfig::Cli {
            program,
            args,
            working_dir,
        };
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.sync.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
