/// Core data types for the zone risk service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types and the small pure helpers that belong to
/// them (category banding, component construction).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Upstream records
// ---------------------------------------------------------------------------

/// One upstream station record, exactly as the provider returned it.
///
/// Field names and value types vary between provider schemas, so records are
/// kept as an opaque JSON object and read through `ingest::schema::RecordSchema`.
pub type ProviderRecord = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// Static hazard indicators for a zone, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub crime: f64,
    pub traffic: f64,
    pub flood: f64,
}

impl Baseline {
    /// Used for zones that have no entry in the baseline registry.
    pub const DEFAULT: Baseline = Baseline {
        crime: 0.3,
        traffic: 0.4,
        flood: 0.15,
    };
}

/// A geographic zone loaded from the zone dataset.
///
/// Geometry is carried through untouched; the risk engine never looks at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub zone_id: String,
    pub name: String,
    pub population: Option<f64>,
    pub geometry: serde_json::Value,
    /// Feature properties as loaded, echoed back on enrichment.
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// `None` when the registry has no entry for this zone.
    pub baseline: Option<Baseline>,
}

impl Zone {
    /// Key used to seed the simulator: the zone id, or the name for
    /// features that were loaded without one.
    pub fn seed_key(&self) -> &str {
        if self.zone_id.is_empty() {
            &self.name
        } else {
            &self.zone_id
        }
    }
}

// ---------------------------------------------------------------------------
// Risk types
// ---------------------------------------------------------------------------

/// Normalized risk components, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub crime: f64,
    pub aqi: f64,
    pub traffic: f64,
    pub flood: f64,
}

impl RiskComponents {
    /// Unweighted mean of the four components.
    ///
    /// Summed in crime, aqi, traffic, flood order so results are reproducible
    /// to the last bit.
    pub fn mean(&self) -> f64 {
        (self.crime + self.aqi + self.traffic + self.flood) / 4.0
    }
}

/// US-EPA style AQI category bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    #[serde(rename = "Unhealthy")]
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    #[serde(rename = "Hazardous")]
    Hazardous,
}

impl AqiCategory {
    /// Maps a raw (unnormalized) AQI value to its band. Total over all inputs.
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AqiCategory::Good
        } else if aqi <= 100.0 {
            AqiCategory::Moderate
        } else if aqi <= 150.0 {
            AqiCategory::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            AqiCategory::Unhealthy
        } else if aqi <= 300.0 {
            AqiCategory::VeryUnhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of aggregating one zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRiskResult {
    pub zone: Zone,
    pub components: RiskComponents,
    pub risk: f64,
    pub aqi_value: i32,
    pub aqi_category: AqiCategory,
    pub computed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pollutants
// ---------------------------------------------------------------------------

/// Pollutants with a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
}

impl Pollutant {
    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// RFC 3339 in UTC with millisecond precision, e.g. `2026-10-19T06:00:00.000Z`.
pub fn iso_millis(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `serialize_with` adapter for `iso_millis`.
pub fn serialize_iso_millis<S: Serializer>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso_millis(t))
}

/// Largest magnitude written as an integer; every whole f64 below it is exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `serialize_with` adapter for AQI values: whole numbers are written as
/// integers (`132`, not `132.0`), fractional values as given.
pub fn serialize_aqi_value<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *value {
        Some(v) if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER => serializer.serialize_i64(v as i64),
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_none(),
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the air-quality resolution path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AqiError {
    /// A required request parameter was missing or unparseable.
    #[error("validation error: {0}")]
    Validation(String),
    /// The provider fetch failed, timed out, or returned an unusable body.
    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),
    /// The provider answered with zero records.
    #[error("no records from provider")]
    UpstreamEmpty,
    /// Records came back but none carried a parseable coordinate pair.
    #[error("no geolocated records returned by provider")]
    NoGeolocatedRecords,
    /// No provider credentials are configured.
    #[error("provider API key not configured")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
