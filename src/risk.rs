/// Zone risk aggregation.
///
/// A zone's risk is the unweighted mean of four normalized components:
/// crime, air quality, traffic and flood. The static three come from the
/// baseline registry; air quality comes from a raw AQI value normalized
/// against 500.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::model::{iso_millis, AqiCategory, Baseline, RiskComponents, Zone, ZoneRiskResult};
use crate::simulator::AqiSimulator;

/// AQI that maps to a full air-quality component.
pub const AQI_NORMALIZATION: f64 = 500.0;

/// Normalized air-quality component, `min(1, aqi / 500)`, floored at 0.
pub fn aqi_component(aqi_value: i32) -> f64 {
    (f64::from(aqi_value) / AQI_NORMALIZATION).clamp(0.0, 1.0)
}

/// Combines a zone's baseline with an AQI reading.
///
/// Zones without a registry entry use `Baseline::DEFAULT`. The category is
/// banded from the raw `aqi_value`, not the normalized component.
pub fn aggregate(zone: &Zone, aqi_value: i32, now: DateTime<Utc>) -> ZoneRiskResult {
    let baseline = zone.baseline.unwrap_or(Baseline::DEFAULT);
    let components = RiskComponents {
        crime: baseline.crime,
        aqi: aqi_component(aqi_value),
        traffic: baseline.traffic,
        flood: baseline.flood,
    };

    ZoneRiskResult {
        zone: zone.clone(),
        risk: components.mean(),
        components,
        aqi_value,
        aqi_category: AqiCategory::from_aqi(f64::from(aqi_value)),
        computed_at: now,
    }
}

/// Renders a result as a GeoJSON feature: the zone's own properties plus
/// `risk`, `components`, `aqi`, `aqi_category` and `aqi_timestamp`.
pub fn to_feature(result: &ZoneRiskResult) -> Value {
    let mut properties: Map<String, Value> = result.zone.properties.clone();
    properties.insert("risk".into(), json!(result.risk));
    properties.insert("components".into(), json!(result.components));
    properties.insert("aqi".into(), json!(result.aqi_value));
    properties.insert("aqi_category".into(), json!(result.aqi_category));
    properties.insert("aqi_timestamp".into(), json!(iso_millis(&result.computed_at)));

    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": result.zone.geometry,
    })
}

/// Scores every zone with a simulated AQI and returns the enriched
/// `FeatureCollection`, in zone order.
pub fn enrich_zones(zones: &[Zone], simulator: &AqiSimulator, now: DateTime<Utc>) -> Value {
    let features: Vec<Value> = zones
        .iter()
        .map(|zone| {
            let aqi = simulator.simulate(zone.seed_key(), now);
            to_feature(&aggregate(zone, aqi, now))
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
        "timestamp": iso_millis(&now),
    })
}
