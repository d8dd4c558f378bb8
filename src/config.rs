use crate::environments::{CarrierEnvironment, PRODUCTION_BASE_URL, TEST_BASE_URL};
use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: CarrierEnvironment,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub carrier: CarrierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_test_url")]
    pub test_url: String,
    #[serde(default = "default_transaction_src")]
    pub transaction_src: String,
    #[serde(default)]
    pub track_api: TrackApi,
    /// Send `x-merchant-id` on tracking calls when the client supplies one.
    #[serde(default)]
    pub forward_merchant_id: bool,
}

/// Shape of the tracking call the carrier expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackApi {
    /// `GET /track/v1/details/{inquiryNumber}`
    #[default]
    DetailsGet,
    /// `POST /api/track/v1/details` with a `TrackRequest` envelope
    LegacyPost,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            environment: CarrierEnvironment::default(),
            timeout_secs: default_timeout_secs(),
            carrier: CarrierConfig::default(),
        }
    }
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            production_url: default_production_url(),
            test_url: default_test_url(),
            transaction_src: default_transaction_src(),
            track_api: TrackApi::default(),
            forward_merchant_id: false,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_production_url() -> String {
    PRODUCTION_BASE_URL.to_string()
}

fn default_test_url() -> String {
    TEST_BASE_URL.to_string()
}

fn default_transaction_src() -> String {
    "budget-manager".to_string()
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to built-in defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply `PORT` and `UPS_ENV` from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ProxyError::config(format!("PORT must be a port number, got '{port}'")))?;
        }

        if let Some(env) = lookup("UPS_ENV").filter(|e| !e.trim().is_empty()) {
            self.environment = CarrierEnvironment::from_name(&env).ok_or_else(|| {
                ProxyError::config(format!(
                    "Unknown UPS_ENV '{env}'. Expected 'test' or 'production'"
                ))
            })?;
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL for a call, given the environment the client asked for.
    pub fn base_url_for(&self, requested: Option<&str>) -> &str {
        CarrierEnvironment::resolve(requested, self.environment).base_url(&self.carrier)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("ups-proxy.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("ups-proxy").join("config.toml"));
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("ups-proxy").join("config.toml"));
        paths.push(home.join(".ups-proxy.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
