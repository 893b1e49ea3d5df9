/// riskmap_service: zone-level environmental hazard scoring for Ahmedabad.
///
/// # Module structure
///
/// ```text
/// riskmap_service
/// ├── model       — shared data types (Zone, RiskComponents, AqiCategory, AqiError, …)
/// ├── config      — service configuration loader (riskmap.toml + environment)
/// ├── zones       — zone GeoJSON loader and baseline registry (zones.toml)
/// ├── breakpoints — PM2.5/PM10 concentration → index tables and dominant pollutant
/// ├── simulator   — deterministic, time-aware AQI simulator
/// ├── cache       — single-flight TTL cache in front of the provider
/// ├── resolver    — nearest provider station by haversine distance
/// ├── risk        — zone risk aggregation and GeoJSON enrichment
/// ├── air_quality — point AQI queries: cache → resolver → breakpoints
/// ├── endpoint    — tiny_http API server and routing
/// └── ingest
///     ├── ogd     — data.gov.in resource API: URL construction, fetch, JSON parsing
///     ├── schema  — declarative field aliases for heterogeneous provider records
///     └── fixtures (test only) — representative API response payloads
/// ```

/// Public modules
pub mod air_quality;
pub mod breakpoints;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod ingest;
pub mod model;
pub mod resolver;
pub mod risk;
pub mod simulator;
pub mod zones;
