/// Service configuration loader - parses riskmap.toml
///
/// Keeps deployment settings (port, provider resource, cache TTL, local
/// time zone for the simulator, data file locations) out of code. Every
/// key is optional; missing keys take the defaults below.
///
/// Secrets never live in the file. The provider API key comes from the
/// environment (`OGD_API_KEY`, or `AQI_API_KEY` as a fallback), usually via
/// a `.env` file loaded at startup. `OGD_RESOURCE_ID` and `PORT` override
/// their file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use thiserror::Error;

use crate::cache::DEFAULT_TTL_SECS;
use crate::ingest::ogd::{CACHE_FETCH_LIMIT, DEFAULT_RESOURCE_ID, OGD_BASE_URL};
use crate::ingest::schema::RecordSchema;
use crate::simulator::{AqiSimulator, JitterMode};

pub const DEFAULT_CONFIG_PATH: &str = "riskmap.toml";

/// One day; the provider refreshes far more often than that.
const MAX_CACHE_TTL_SECS: i64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request worker threads.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub resource_id: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: i64,
    pub fetch_limit: u32,
    /// Field aliases for reading records.
    pub schema: RecordSchema,
    /// Only ever set from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: OGD_BASE_URL.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            timeout_secs: 8,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            fetch_limit: CACHE_FETCH_LIMIT,
            schema: RecordSchema::ogd(),
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Offset of the local clock from UTC; +330 is India Standard Time.
    pub utc_offset_minutes: i32,
    pub jitter: JitterMode,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            jitter: JitterMode::Random,
        }
    }
}

impl SimulatorConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "simulator.utc_offset_minutes {} is outside ±1439",
                    self.utc_offset_minutes
                ))
            })
    }

    pub fn build(&self) -> Result<AqiSimulator, ConfigError> {
        Ok(AqiSimulator::new(self.offset()?, self.jitter))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZoneSources {
    /// GeoJSON FeatureCollection of zone polygons.
    pub geojson: PathBuf,
    /// Per-zone crime/traffic/flood baselines.
    pub baselines: PathBuf,
}

impl Default for ZoneSources {
    fn default() -> Self {
        Self {
            geojson: PathBuf::from("data/ahmedabad-zones.geojson"),
            baselines: PathBuf::from("zones.toml"),
        }
    }
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub simulator: SimulatorConfig,
    pub zones: ZoneSources,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    /// Parses and validates a TOML document. `origin` is only used in
    /// error messages.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides, reading variables through `lookup`.
    ///
    /// Blank values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OGD_API_KEY").or_else(|| var("AQI_API_KEY")) {
            self.provider.api_key = Some(key.trim().to_string());
        }
        if let Some(resource_id) = var("OGD_RESOURCE_ID") {
            self.provider.resource_id = resource_id.trim().to_string();
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a port number, got {:?}", port)))?;
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    pub fn provider_configured(&self) -> bool {
        self.provider.api_key.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.workers == 0 {
            return Err(ConfigError::Invalid("server.workers must be at least 1".into()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be at least 1".into()));
        }
        if !(0..=MAX_CACHE_TTL_SECS).contains(&self.provider.cache_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "provider.cache_ttl_secs must be between 0 and {}",
                MAX_CACHE_TTL_SECS
            )));
        }
        if self.provider.fetch_limit == 0 {
            return Err(ConfigError::Invalid("provider.fetch_limit must be at least 1".into()));
        }
        if !self.provider.base_url.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "provider.base_url must end with '/', got {}",
                self.provider.base_url
            )));
        }
        if self.provider.schema.latitude.is_empty() || self.provider.schema.longitude.is_empty() {
            return Err(ConfigError::Invalid(
                "provider.schema needs at least one latitude and one longitude alias".into(),
            ));
        }
        self.simulator.offset()?;
        Ok(())
    }
}

/// Loads and validates the configuration file at `path`.
///
/// Environment overrides are not applied; call
/// `ServiceConfig::apply_env_overrides` afterwards.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ServiceConfig::from_toml_str(&contents, path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
