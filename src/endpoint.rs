/// HTTP endpoint for zone risk and air-quality queries
///
/// Endpoints (all GET, all JSON):
/// - GET /api/risk            - Zones enriched with risk components and simulated AQI
/// - GET /api/aqi-today       - Simulated AQI for every zone right now
/// - GET /api/aqi?lat=&lon=   - Air quality at a point from the nearest provider station
/// - GET /api/risk-debug      - First provider record, for schema discovery
/// - GET /health              - Service health check
///
/// Requests are routed by `route`, which is pure apart from the provider
/// fetch, and served from a fixed worker pool so concurrent point queries
/// share one provider cache.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use threadpool::ThreadPool;
use tracing::{info, warn};

use crate::air_quality::AirQualityService;
use crate::config::ServerConfig;
use crate::model::{iso_millis, AqiError, Zone};
use crate::risk::enrich_zones;
use crate::simulator::AqiSimulator;

const AVAILABLE_ENDPOINTS: [&str; 5] = [
    "/api/risk",
    "/api/aqi-today",
    "/api/aqi?lat={lat}&lon={lon}",
    "/api/risk-debug",
    "/health",
];

const AVAILABLE_PATHS: [&str; 5] = ["/api/risk", "/api/aqi-today", "/api/aqi", "/api/risk-debug", "/health"];

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start HTTP server on {addr}: {source}")]
    Bind {
        addr: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything a request handler reads. Built once at startup and shared
/// across workers.
pub struct AppState {
    pub zones: Vec<Zone>,
    pub simulator: AqiSimulator,
    pub air_quality: AirQualityService,
}

/// Status code plus JSON body, before it becomes a tiny_http response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Dispatches one request. `url` is the raw request target, query included.
pub fn route(state: &AppState, method: &str, url: &str, now: DateTime<Utc>) -> ApiResponse {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let path = match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    };

    if !AVAILABLE_PATHS.contains(&path) {
        return ApiResponse {
            status: 404,
            body: json!({
                "error": "Not found",
                "available_endpoints": AVAILABLE_ENDPOINTS,
            }),
        };
    }
    if method != "GET" {
        return ApiResponse {
            status: 405,
            body: json!({ "error": format!("Method {} not allowed on {}", method, path) }),
        };
    }

    match path {
        "/api/risk" => ApiResponse::ok(enrich_zones(&state.zones, &state.simulator, now)),
        "/api/aqi-today" => handle_aqi_today(state, now),
        "/api/aqi" => handle_point_aqi(state, &parse_query(query), now),
        "/api/risk-debug" => handle_risk_debug(state),
        _ => handle_health(state),
    }
}

/// Decodes a query string into a map. Later duplicates win; pairs that
/// are not valid percent-encoded UTF-8 are dropped.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

/// HTTP status for each error kind.
pub fn status_for(err: &AqiError) -> u16 {
    match err {
        AqiError::Validation(_) | AqiError::NotConfigured => 400,
        AqiError::UpstreamUnavailable(_) => 500,
        AqiError::UpstreamEmpty | AqiError::NoGeolocatedRecords => 502,
    }
}

fn error_response(err: &AqiError) -> ApiResponse {
    let body = match err {
        AqiError::UpstreamUnavailable(details) => json!({
            "error": "failed to fetch external AQI",
            "details": details,
        }),
        AqiError::NotConfigured => json!({
            "error": err.to_string(),
            "note": "Set OGD_API_KEY to enable provider introspection",
        }),
        _ => json!({ "error": err.to_string() }),
    };
    ApiResponse {
        status: status_for(err),
        body,
    }
}

fn coordinate(params: &HashMap<String, String>, name: &str) -> Result<f64, AqiError> {
    let raw = params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AqiError::Validation("lat & lon required".into()))?;
    raw.parse::<f64>()
        .map_err(|_| AqiError::Validation(format!("{} must be a number, got {:?}", name, raw)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_point_aqi(state: &AppState, params: &HashMap<String, String>, now: DateTime<Utc>) -> ApiResponse {
    let result = coordinate(params, "lat")
        .and_then(|lat| Ok((lat, coordinate(params, "lon")?)))
        .and_then(|(lat, lon)| state.air_quality.point_aqi(lat, lon, now));

    match result {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => ApiResponse {
                status: 500,
                body: json!({ "error": format!("failed to encode response: {}", e) }),
            },
        },
        Err(e) => error_response(&e),
    }
}

fn handle_aqi_today(state: &AppState, now: DateTime<Utc>) -> ApiResponse {
    let readings = state.simulator.current_readings(&state.zones, now);
    ApiResponse::ok(json!({
        "status": "active",
        "type": "real-time",
        "timestamp": iso_millis(&now),
        "zones": readings,
        "message": "Current active AQI data for today",
    }))
}

fn handle_risk_debug(state: &AppState) -> ApiResponse {
    match state.air_quality.debug_sample() {
        Ok(sample) => ApiResponse::ok(json!(sample)),
        Err(e) => error_response(&e),
    }
}

fn handle_health(state: &AppState) -> ApiResponse {
    ApiResponse::ok(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "provider_configured": state.air_quality.is_configured(),
        "zones": state.zones.len(),
    }))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Binds the server and serves requests until the listener shuts down.
pub fn start_endpoint_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = format!("{}:{}", config.host, config.port);
    let server = tiny_http::Server::http(&addr).map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;
    let pool = ThreadPool::new(config.workers);

    info!(%addr, workers = config.workers, "HTTP endpoint listening");
    for path in AVAILABLE_ENDPOINTS {
        info!("  GET {}", path);
    }

    for request in server.incoming_requests() {
        let state = Arc::clone(&state);
        pool.execute(move || handle_request(&state, request));
    }

    pool.join();
    Ok(())
}

fn handle_request(state: &AppState, request: tiny_http::Request) {
    let started = Instant::now();
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    let response = route(state, &method, &url, Utc::now());
    let status = response.status;

    info!(
        %method,
        %url,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );

    if let Err(e) = request.respond(create_response(response)) {
        warn!(error = %e, "failed to send response");
    }
}

/// Create HTTP response with JSON body
fn create_response(response: ApiResponse) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let body = format!("{:#}", response.body);
    let mut http = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(response.status));

    for (name, value) in [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
    ] {
        if let Ok(header) = tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            http.add_header(header);
        }
    }
    http
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProviderCache;
    use crate::ingest::ogd::{parse_records_response, RecordBatch, RecordSource};
    use crate::ingest::schema::RecordSchema;
    use crate::model::Baseline;
    use crate::simulator::JitterMode;
    use chrono::{FixedOffset, TimeZone};

    struct StaticSource(&'static str);

    impl RecordSource for StaticSource {
        fn fetch_records(&self, _limit: u32) -> Result<RecordBatch, AqiError> {
            parse_records_response(self.0)
        }
    }

    struct DownSource;

    impl RecordSource for DownSource {
        fn fetch_records(&self, _limit: u32) -> Result<RecordBatch, AqiError> {
            Err(AqiError::UpstreamUnavailable("connection refused".into()))
        }
    }

    fn zone(id: &str, name: &str) -> Zone {
        let mut properties = serde_json::Map::new();
        properties.insert("zone_id".into(), json!(id));
        properties.insert("name".into(), json!(name));
        Zone {
            zone_id: id.to_string(),
            name: name.to_string(),
            population: None,
            geometry: Value::Null,
            properties,
            baseline: Some(Baseline { crime: 0.65, traffic: 0.72, flood: 0.15 }),
        }
    }

    fn state(source: Option<Box<dyn RecordSource>>) -> AppState {
        AppState {
            zones: vec![zone("ahm_001", "Old City"), zone("ahm_002", "Maninagar")],
            simulator: AqiSimulator::new(FixedOffset::east_opt(330 * 60).unwrap(), JitterMode::Seeded),
            air_quality: AirQualityService::new(source, ProviderCache::default(), RecordSchema::ogd()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap()
    }

    fn get(state: &AppState, url: &str) -> ApiResponse {
        route(state, "GET", url, now())
    }

    // --- Query parsing --------------------------------------------------------

    #[test]
    fn test_parse_query_decodes_values() {
        let params = parse_query("lat=23.02&lon=%2D72.5&name=Old+City&flag");
        assert_eq!(params["lat"], "23.02");
        assert_eq!(params["lon"], "-72.5");
        assert_eq!(params["name"], "Old City");
        assert_eq!(params["flag"], "");
    }

    #[test]
    fn test_parse_query_empty_and_invalid() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("&&").is_empty());
        // %FF alone is not UTF-8
        assert!(!parse_query("lat=%FF").contains_key("lat"));
    }

    // --- Routing --------------------------------------------------------------

    #[test]
    fn test_unknown_path_is_404_with_endpoint_list() {
        let resp = get(&state(None), "/api/reports");
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["available_endpoints"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_non_get_is_405() {
        let resp = route(&state(None), "POST", "/api/aqi?lat=1&lon=1", now());
        assert_eq!(resp.status, 405);
    }

    #[test]
    fn test_health() {
        let resp = get(&state(None), "/health");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["status"], "ok");
        assert_eq!(resp.body["service"], "riskmap_service");
        assert_eq!(resp.body["provider_configured"], false);
        assert_eq!(resp.body["zones"], 2);
    }

    #[test]
    fn test_trailing_slash_is_tolerated() {
        assert_eq!(get(&state(None), "/health/").status, 200);
    }

    #[test]
    fn test_risk_returns_enriched_collection() {
        let resp = get(&state(None), "/api/risk");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["type"], "FeatureCollection");
        assert_eq!(resp.body["timestamp"], "2026-10-19T06:00:00.000Z");

        let features = resp.body["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        let props = &features[0]["properties"];
        assert_eq!(props["zone_id"], "ahm_001");
        assert!(props["risk"].is_f64());
        assert!(props["aqi"].is_i64());
        assert!(props["aqi_category"].is_string());
        assert_eq!(props["components"]["traffic"], 0.72);
    }

    #[test]
    fn test_aqi_today_lists_every_zone() {
        let resp = get(&state(None), "/api/aqi-today");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["status"], "active");
        assert_eq!(resp.body["type"], "real-time");

        let zones = resp.body["zones"].as_array().unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1]["zone_name"], "Maninagar");
        // 06:00 UTC is 11:30 IST
        assert_eq!(zones[0]["hour"], 11);
        assert_eq!(zones[0]["date"], "2026-10-19");
        assert_eq!(zones[0]["timestamp"], "2026-10-19T06:00:00.000Z");
    }

    // --- Point query ----------------------------------------------------------

    #[test]
    fn test_point_query_requires_both_coordinates() {
        let s = state(None);
        for url in ["/api/aqi", "/api/aqi?lat=23.0", "/api/aqi?lon=72.5", "/api/aqi?lat=&lon=72.5"] {
            let resp = get(&s, url);
            assert_eq!(resp.status, 400, "{}", url);
            assert_eq!(resp.body["error"], "validation error: lat & lon required");
        }
    }

    #[test]
    fn test_point_query_rejects_unparseable_and_non_finite() {
        let s = state(None);
        for url in [
            "/api/aqi?lat=abc&lon=72.5",
            "/api/aqi?lat=NaN&lon=72.5",
            "/api/aqi?lat=23&lon=inf",
            "/api/aqi?lat=95&lon=72.5",
        ] {
            assert_eq!(get(&s, url).status, 400, "{}", url);
        }
    }

    #[test]
    fn test_point_query_accepts_zero() {
        let resp = get(&state(None), "/api/aqi?lat=0&lon=0");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({ "provider": "simulated", "aqi": 75, "category": "Moderate" }));
    }

    #[test]
    fn test_point_query_with_provider() {
        let source = StaticSource(
            r#"{"total": 1, "records": [{"station": "Maninagar", "latitude": "22.9964", "longitude": "72.6024", "pm25": "48"}]}"#,
        );
        let resp = get(&state(Some(Box::new(source))), "/api/aqi?lat=23.0&lon=72.6");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["provider"], "data.gov.in");
        assert_eq!(resp.body["computed_aqi"], 132);
        assert_eq!(resp.body["raw"]["station"], "Maninagar");
    }

    #[test]
    fn test_point_query_error_statuses() {
        let empty = StaticSource(r#"{"total": 0, "records": []}"#);
        assert_eq!(get(&state(Some(Box::new(empty))), "/api/aqi?lat=23&lon=72").status, 502);

        let ungeolocated = StaticSource(r#"{"records": [{"station": "X"}]}"#);
        let resp = get(&state(Some(Box::new(ungeolocated))), "/api/aqi?lat=23&lon=72");
        assert_eq!(resp.status, 502);
        assert_eq!(resp.body["error"], "no geolocated records returned by provider");

        let resp = get(&state(Some(Box::new(DownSource))), "/api/aqi?lat=23&lon=72");
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["details"], "connection refused");
    }

    // --- Debug introspection --------------------------------------------------

    #[test]
    fn test_risk_debug_unconfigured() {
        let resp = get(&state(None), "/api/risk-debug");
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["error"], "provider API key not configured");
    }

    #[test]
    fn test_risk_debug_describes_first_record() {
        let source = StaticSource(r#"{"total": 812, "records": [{"station": "A", "pollutant_id": "PM10"}]}"#);
        let resp = get(&state(Some(Box::new(source))), "/api/risk-debug");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["total_records"], 812);
        assert_eq!(resp.body["sample_record_fields"], json!(["station", "pollutant_id"]));
        assert_eq!(resp.body["first_record"]["pollutant_id"], "PM10");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&AqiError::Validation("x".into())), 400);
        assert_eq!(status_for(&AqiError::NotConfigured), 400);
        assert_eq!(status_for(&AqiError::UpstreamUnavailable("x".into())), 500);
        assert_eq!(status_for(&AqiError::UpstreamEmpty), 502);
        assert_eq!(status_for(&AqiError::NoGeolocatedRecords), 502);
    }

    #[test]
    fn test_create_response_sets_json_headers() {
        let resp = create_response(ApiResponse::ok(json!({ "status": "ok" })));
        assert_eq!(resp.status_code(), tiny_http::StatusCode(200));
        assert!(resp
            .headers()
            .iter()
            .any(|h| h.field.equiv("Content-Type") && h.value.as_str() == "application/json"));
    }
}
