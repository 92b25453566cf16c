//! Service configuration: `zones.toml` plus environment overrides.
//!
//! Every setting has a default, so a missing file is not an error. Environment
//! variables win over the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ZoneError, ZoneResult};
use crate::services::aggregation::PipelineSettings;
use crate::services::limiter::DEFAULT_MAX_CONCURRENT_REQUESTS;
use crate::services::tessellation::{TessellationOptions, DEFAULT_OFFSHORE_GRID_KM};

pub const CONFIG_FILE: &str = "zones.toml";

/// Progress must be reported at a sub-100ms cadence.
pub const MAX_PROGRESS_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZonesConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub datasets: DatasetSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Remote analysis API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default)]
    pub square_grid_extent: bool,
    #[serde(default = "default_offshore_grid_km")]
    pub default_offshore_grid_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_datasets_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_endpoint() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_progress_interval_ms() -> u64 {
    50
}

fn default_offshore_grid_km() -> f64 {
    DEFAULT_OFFSHORE_GRID_KM
}

fn default_datasets_root() -> PathBuf {
    PathBuf::from("public/zones")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            progress_interval_ms: default_progress_interval_ms(),
            square_grid_extent: false,
            default_offshore_grid_km: default_offshore_grid_km(),
        }
    }
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            root: default_datasets_root(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ZonesConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ZoneResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ZoneError::configuration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ZoneError::configuration(format!("Failed to parse config file: {}", e)))
    }

    /// Load `zones.toml` from the first standard location that has one.
    ///
    /// Searches the current directory, `backend/`, then the parent directory.
    /// Returns `Ok(None)` when no file exists.
    pub fn from_default_location() -> ZoneResult<Option<Self>> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE),
            PathBuf::from("backend").join(CONFIG_FILE),
            PathBuf::from("..").join(CONFIG_FILE),
        ];

        for path in search_paths {
            if path.exists() {
                log::info!("Loading configuration from {}", path.display());
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// File (or defaults) + environment overrides, validated.
    pub fn load() -> ZoneResult<Self> {
        let mut config = match Self::from_default_location()? {
            Some(config) => config,
            None => {
                log::info!("No {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides.
    ///
    /// # Environment Variables
    /// - `REZONING_API_URL`: analysis API base URL
    /// - `REZONING_REQUEST_TIMEOUT`: per-request timeout in seconds
    /// - `REZONING_MAX_CONCURRENCY`: ceiling on outstanding analysis requests
    /// - `REZONING_DATASETS`: directory holding `areas.json` and boundary datasets
    /// - `HOST`, `PORT`: server bind address
    pub fn apply_env_overrides(&mut self) -> ZoneResult<()> {
        if let Ok(endpoint) = env::var("REZONING_API_URL") {
            self.api.endpoint = endpoint;
        }
        if let Some(timeout) = parse_env("REZONING_REQUEST_TIMEOUT")? {
            self.api.request_timeout_secs = timeout;
        }
        if let Some(limit) = parse_env("REZONING_MAX_CONCURRENCY")? {
            self.pipeline.max_concurrent_requests = limit;
        }
        if let Ok(root) = env::var("REZONING_DATASETS") {
            self.datasets.root = PathBuf::from(root);
        }
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("PORT")? {
            self.server.port = port;
        }
        Ok(())
    }

    pub fn validate(&self) -> ZoneResult<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(ZoneError::configuration("api.endpoint must not be empty"));
        }
        if self.pipeline.max_concurrent_requests == 0 {
            return Err(ZoneError::configuration(
                "pipeline.max_concurrent_requests must be at least 1",
            ));
        }
        if self.pipeline.progress_interval_ms == 0
            || self.pipeline.progress_interval_ms >= MAX_PROGRESS_INTERVAL_MS
        {
            return Err(ZoneError::configuration(format!(
                "pipeline.progress_interval_ms must be between 1 and {}",
                MAX_PROGRESS_INTERVAL_MS - 1
            )));
        }
        if !(self.pipeline.default_offshore_grid_km > 0.0) {
            return Err(ZoneError::configuration(
                "pipeline.default_offshore_grid_km must be positive",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_concurrent_requests: self.pipeline.max_concurrent_requests,
            progress_interval: Duration::from_millis(self.pipeline.progress_interval_ms),
            tessellation: TessellationOptions {
                square_grid_extent: self.pipeline.square_grid_extent,
                default_offshore_grid_km: self.pipeline.default_offshore_grid_km,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> ZoneResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ZoneError::configuration(format!("{} has an invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
