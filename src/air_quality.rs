/// Point air-quality queries against the live provider.
///
/// A query for (lat, lon) goes:
///
/// ```text
/// ProviderCache ──► StationResolver ──► RecordSchema ──► breakpoints
///   (≤60 s old       (nearest record     (direct AQI,      (PM2.5/PM10 index,
///    batch)           by haversine)       category, PMs)    dominant pollutant)
/// ```
///
/// With no provider configured the service answers with a fixed simulated
/// value instead of failing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::breakpoints::{dominant, pollutant_index};
use crate::cache::ProviderCache;
use crate::ingest::ogd::{RecordSource, CACHE_FETCH_LIMIT, DEBUG_FETCH_LIMIT};
use crate::ingest::schema::RecordSchema;
use crate::model::{serialize_aqi_value, AqiCategory, AqiError, Pollutant, ProviderRecord};
use crate::resolver::StationResolver;

/// AQI reported for point queries when no provider is configured.
pub const SIMULATED_POINT_AQI: i32 = 75;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Where the matched station is and how far it is from the query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearestPoint {
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "provider")]
pub enum PointAqiReport {
    #[serde(rename = "simulated")]
    Simulated { aqi: i32, category: AqiCategory },

    #[serde(rename = "data.gov.in")]
    Provider {
        nearest: NearestPoint,
        /// Direct AQI from the record if it has one, else the computed index.
        #[serde(serialize_with = "serialize_aqi_value")]
        aqi: Option<f64>,
        /// The record's own category, else banded from `aqi`.
        category: Option<String>,
        computed_aqi: Option<i32>,
        main_pollutant: Option<Pollutant>,
        raw: ProviderRecord,
    },
}

/// First record of a small provider page, for schema discovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSample {
    pub total_records: Option<u64>,
    pub sample_record_fields: Vec<String>,
    pub first_record: ProviderRecord,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Rejects non-finite or out-of-range coordinates. Zero is a valid value.
pub fn validate_point(lat: f64, lon: f64) -> Result<(), AqiError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AqiError::Validation(format!(
            "lat must be a number between -90 and 90, got {}",
            lat
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(AqiError::Validation(format!(
            "lon must be a number between -180 and 180, got {}",
            lon
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct AirQualityService {
    source: Option<Box<dyn RecordSource>>,
    cache: ProviderCache,
    resolver: StationResolver,
    fetch_limit: u32,
}

impl AirQualityService {
    /// `source` is `None` when no provider credentials are configured.
    pub fn new(source: Option<Box<dyn RecordSource>>, cache: ProviderCache, schema: RecordSchema) -> Self {
        Self {
            source,
            cache,
            resolver: StationResolver::new(schema),
            fetch_limit: CACHE_FETCH_LIMIT,
        }
    }

    /// Records requested per cache refresh.
    pub fn with_fetch_limit(mut self, limit: u32) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    pub fn cache(&self) -> &ProviderCache {
        &self.cache
    }

    /// Air quality at a point, from the nearest provider station.
    ///
    /// # Errors
    /// - `Validation` for bad coordinates, before anything else runs.
    /// - `UpstreamUnavailable` / `UpstreamEmpty` from the cache refresh.
    /// - `NoGeolocatedRecords` when no record has usable coordinates.
    pub fn point_aqi(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> Result<PointAqiReport, AqiError> {
        validate_point(lat, lon)?;

        let Some(source) = self.source.as_ref() else {
            return Ok(PointAqiReport::Simulated {
                aqi: SIMULATED_POINT_AQI,
                category: AqiCategory::from_aqi(f64::from(SIMULATED_POINT_AQI)),
            });
        };

        let records = self
            .cache
            .get_fresh_records(now, || source.fetch_records(self.fetch_limit).map(|b| b.records))
            .inspect_err(|e| warn!(error = %e, "provider records unavailable"))?;

        let nearest = self
            .resolver
            .nearest(lat, lon, &records)
            .ok_or(AqiError::NoGeolocatedRecords)?;

        let schema = self.resolver.schema();
        let record = nearest.record;
        let rows = self.resolver.station_rows(nearest.lat, nearest.lon, &records);

        // each pollutant comes from the first of the station's rows that reports it
        let index_for = |pollutant: Pollutant| {
            rows.iter()
                .find_map(|r| schema.concentration(r, pollutant))
                .and_then(|c| pollutant_index(pollutant, c))
        };
        let computed = dominant(index_for(Pollutant::Pm25), index_for(Pollutant::Pm10));

        let aqi = rows
            .iter()
            .find_map(|r| schema.direct_aqi(r))
            .or(computed.map(|d| f64::from(d.index)));
        let category = rows
            .iter()
            .find_map(|r| schema.category(r))
            .or_else(|| aqi.map(|v| AqiCategory::from_aqi(v).label().to_string()));

        info!(
            lat,
            lon,
            distance_km = nearest.distance_km,
            station_rows = rows.len(),
            aqi = ?aqi,
            "resolved point air quality"
        );

        Ok(PointAqiReport::Provider {
            nearest: NearestPoint {
                lat: nearest.lat,
                lon: nearest.lon,
                distance_km: nearest.distance_km,
            },
            aqi,
            category,
            computed_aqi: computed.map(|d| d.index),
            main_pollutant: computed.map(|d| d.pollutant),
            raw: record.clone(),
        })
    }

    /// Fetches a small page straight from the provider, bypassing the
    /// cache, and describes its first record.
    ///
    /// # Errors
    /// - `NotConfigured` without a provider.
    /// - `UpstreamUnavailable` if the fetch fails, `UpstreamEmpty` if the
    ///   page has no records.
    pub fn debug_sample(&self) -> Result<ProviderSample, AqiError> {
        let source = self.source.as_ref().ok_or(AqiError::NotConfigured)?;
        let batch = source.fetch_records(DEBUG_FETCH_LIMIT)?;

        let first_record = batch.records.into_iter().next().ok_or(AqiError::UpstreamEmpty)?;
        Ok(ProviderSample {
            total_records: batch.total,
            sample_record_fields: first_record.keys().cloned().collect(),
            first_record,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
