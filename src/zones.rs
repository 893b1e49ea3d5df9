/// Zone dataset loading: GeoJSON polygons plus the baseline registry.
///
/// Two files describe the city:
///
/// - a GeoJSON `FeatureCollection` (`data/ahmedabad-zones.geojson`) whose
///   features carry `zone_id`, `name` and optionally `population` in their
///   properties. Geometry is kept as opaque JSON.
/// - `zones.toml`, the static crime/traffic/flood baselines per zone id:
///
/// ```toml
/// [[zone]]
/// zone_id = "ahm_001"
/// crime = 0.65
/// traffic = 0.72
/// flood = 0.15
/// ```
///
/// Baselines outside [0, 1] are clamped at load time with a warning, so the
/// risk components stay normalized whatever the file says.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::model::{Baseline, Zone};

#[derive(Debug, Error)]
pub enum ZoneLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),
    #[error("invalid baseline registry: {0}")]
    Baselines(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

fn read(path: &Path) -> Result<String, ZoneLoadError> {
    fs::read_to_string(path).map_err(|source| ZoneLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Baseline registry (zones.toml)
// ============================================================================

#[derive(Debug, Deserialize)]
struct BaselineEntry {
    zone_id: String,
    crime: f64,
    traffic: f64,
    flood: f64,
}

#[derive(Debug, Deserialize)]
struct BaselineFile {
    #[serde(default)]
    zone: Vec<BaselineEntry>,
}

/// Static hazard baselines keyed by zone id.
#[derive(Debug, Clone, Default)]
pub struct BaselineRegistry {
    baselines: HashMap<String, Baseline>,
}

impl BaselineRegistry {
    pub fn from_toml_str(contents: &str) -> Result<Self, ZoneLoadError> {
        let file: BaselineFile = toml::from_str(contents)?;
        let mut baselines = HashMap::with_capacity(file.zone.len());

        for entry in file.zone {
            if entry.zone_id.trim().is_empty() {
                return Err(ZoneLoadError::Invalid("baseline entry with empty zone_id".into()));
            }
            let baseline = Baseline {
                crime: clamp_unit(&entry.zone_id, "crime", entry.crime)?,
                traffic: clamp_unit(&entry.zone_id, "traffic", entry.traffic)?,
                flood: clamp_unit(&entry.zone_id, "flood", entry.flood)?,
            };
            if baselines.insert(entry.zone_id.clone(), baseline).is_some() {
                return Err(ZoneLoadError::Invalid(format!(
                    "duplicate baseline for zone {}",
                    entry.zone_id
                )));
            }
        }

        Ok(Self { baselines })
    }

    pub fn get(&self, zone_id: &str) -> Option<Baseline> {
        self.baselines.get(zone_id).copied()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

fn clamp_unit(zone_id: &str, field: &str, value: f64) -> Result<f64, ZoneLoadError> {
    if !value.is_finite() {
        return Err(ZoneLoadError::Invalid(format!(
            "{}.{} is not a finite number",
            zone_id, field
        )));
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(zone_id, field, value, clamped, "baseline outside [0, 1], clamped");
    }
    Ok(clamped)
}

/// Loads the baseline registry from a TOML file.
pub fn load_baselines<P: AsRef<Path>>(path: P) -> Result<BaselineRegistry, ZoneLoadError> {
    BaselineRegistry::from_toml_str(&read(path.as_ref())?)
}

// ============================================================================
// Zone features (GeoJSON)
// ============================================================================

/// Builds zones from a GeoJSON `FeatureCollection`, attaching baselines.
///
/// Features keep their full property map so enrichment can echo it back.
/// `zone_id` may be a string or a number; features without one get an
/// empty id and fall back to their name wherever a key is needed.
pub fn parse_zones_geojson(json: &str, registry: &BaselineRegistry) -> Result<Vec<Zone>, ZoneLoadError> {
    let root: Value = serde_json::from_str(json)?;

    if root.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(ZoneLoadError::Invalid("expected a GeoJSON FeatureCollection".into()));
    }
    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| ZoneLoadError::Invalid("FeatureCollection has no features array".into()))?;

    let mut zones = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let properties: Map<String, Value> = feature
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let zone_id = match properties.get("zone_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let name = properties
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let population = properties
            .get("population")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite() && *p >= 0.0);

        if zone_id.is_empty() && name.is_empty() {
            warn!(feature = i, "zone feature has neither zone_id nor name");
        }

        let baseline = registry.get(&zone_id);
        zones.push(Zone {
            zone_id,
            name,
            population,
            geometry: feature.get("geometry").cloned().unwrap_or(Value::Null),
            properties,
            baseline,
        });
    }

    Ok(zones)
}

/// Loads zones from a GeoJSON file.
pub fn load_zones<P: AsRef<Path>>(path: P, registry: &BaselineRegistry) -> Result<Vec<Zone>, ZoneLoadError> {
    let zones = parse_zones_geojson(&read(path.as_ref())?, registry)?;
    let unmatched = zones.iter().filter(|z| z.baseline.is_none()).count();
    info!(
        zones = zones.len(),
        unmatched, "loaded zones from {}",
        path.as_ref().display()
    );
    Ok(zones)
}

/// Like `load_zones`, but a failed load is logged and yields no zones so
/// the service still starts.
pub fn load_zones_or_empty<P: AsRef<Path>>(path: P, registry: &BaselineRegistry) -> Vec<Zone> {
    match load_zones(&path, registry) {
        Ok(zones) => zones,
        Err(e) => {
            error!(error = %e, "failed to load zone GeoJSON, serving an empty collection");
            Vec::new()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
