//! Zone Risk Service - HTTP API
//!
//! Serves zone risk scores and air-quality lookups for the city map:
//! 1. Loads riskmap.toml, then applies `.env` and environment overrides
//! 2. Loads zone polygons and their crime/traffic/flood baselines
//! 3. Connects the data.gov.in provider when an API key is present
//! 4. Serves the JSON API until interrupted
//!
//! Usage:
//!   cargo run --release                          # Use riskmap.toml in the working directory
//!   cargo run --release -- --port 8080           # Override the listening port
//!   cargo run --release -- --config other.toml   # Use another configuration file
//!
//! Environment:
//!   OGD_API_KEY      - data.gov.in API key (AQI_API_KEY is accepted as a fallback)
//!   OGD_RESOURCE_ID  - data.gov.in resource to query
//!   PORT             - listening port
//!   RUST_LOG         - log filter, default `riskmap_service=info`

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use riskmap_service::air_quality::AirQualityService;
use riskmap_service::cache::ProviderCache;
use riskmap_service::config::{load_config, ServiceConfig, DEFAULT_CONFIG_PATH};
use riskmap_service::endpoint::{self, AppState};
use riskmap_service::ingest::ogd::{OgdClient, RecordSource};
use riskmap_service::zones::{load_baselines, load_zones_or_empty, BaselineRegistry};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct Args {
    config_path: PathBuf,
    port: Option<u16>,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        port: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                let value = args.get(i + 1).ok_or("--port requires a port number")?;
                parsed.port = Some(value.parse().map_err(|_| format!("invalid port: {}", value))?);
                i += 2;
            }
            "--config" => {
                let value = args.get(i + 1).ok_or("--config requires a file path")?;
                parsed.config_path = PathBuf::from(value);
                i += 2;
            }
            other => {
                return Err(format!(
                    "unknown argument: {}\nUsage: {} [--port PORT] [--config PATH]",
                    other, args[0]
                ));
            }
        }
    }
    Ok(parsed)
}

fn build_provider(config: &ServiceConfig) -> Option<Box<dyn RecordSource>> {
    let api_key = config.provider.api_key.as_deref()?;
    match OgdClient::new(
        &config.provider.base_url,
        &config.provider.resource_id,
        api_key,
        config.provider.timeout(),
    ) {
        Ok(client) => Some(Box::new(client)),
        Err(e) => {
            error!(error = %e, "failed to set up provider client, point queries will be simulated");
            None
        }
    }
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("riskmap_service=info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let mut config = match load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.apply_env_overrides() {
        error!("{}", e);
        process::exit(1);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let simulator = match config.simulator.build() {
        Ok(simulator) => simulator,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let registry = load_baselines(&config.zones.baselines).unwrap_or_else(|e| {
        warn!(error = %e, "no baseline registry, every zone uses default baselines");
        BaselineRegistry::default()
    });
    let zones = load_zones_or_empty(&config.zones.geojson, &registry);

    let provider = build_provider(&config);
    if provider.is_some() {
        info!(resource_id = %config.provider.resource_id, "data.gov.in provider configured");
    } else {
        info!("no provider API key, /api/aqi serves simulated values");
    }

    let air_quality = AirQualityService::new(
        provider,
        ProviderCache::new(config.provider.cache_ttl()),
        config.provider.schema.clone(),
    )
    .with_fetch_limit(config.provider.fetch_limit);

    let state = Arc::new(AppState {
        zones,
        simulator,
        air_quality,
    });

    if let Err(e) = endpoint::start_endpoint_server(&config.server, state) {
        error!("{}", e);
        process::exit(1);
    }
}
