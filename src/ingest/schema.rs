/// Declarative field mapping for loosely-schematized provider records.
///
/// Upstream records name the same quantity in many ways (`latitude`, `lat`,
/// `location_lat`, ...) and encode numbers either as JSON numbers or as
/// strings. A `RecordSchema` lists, per quantity, the field aliases to try in
/// order; the first alias holding a finite number wins.
///
/// Supporting a new provider layout means building a different schema (in
/// code or under `[provider.schema]` in riskmap.toml), never touching the
/// resolver or the converter.
///
/// Two record layouts are understood for pollutant concentrations:
///
/// ```text
/// wide:  { "latitude": "23.02", "longitude": "72.57", "pm25": "48.0", "pm10": "97" }
/// long:  { "latitude": "23.02", "longitude": "72.57", "pollutant_id": "PM2.5", "avg_value": "48" }
/// ```
///
/// The data.gov.in CPCB resource publishes the long layout, one row per
/// station and pollutant.

use serde::Deserialize;
use serde_json::Value;

use crate::model::{Pollutant, ProviderRecord};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecordSchema {
    pub latitude: Vec<String>,
    pub longitude: Vec<String>,
    pub aqi: Vec<String>,
    pub category: Vec<String>,
    pub pm25: Vec<String>,
    pub pm10: Vec<String>,
    /// Long layout: field naming the pollutant a row measures.
    pub pollutant_id: Vec<String>,
    /// Long layout: field holding that pollutant's concentration.
    pub pollutant_value: Vec<String>,
}

fn names(aliases: &[&str]) -> Vec<String> {
    aliases.iter().map(|s| s.to_string()).collect()
}

impl RecordSchema {
    /// Field aliases seen across data.gov.in air-quality resources.
    pub fn ogd() -> Self {
        Self {
            latitude: names(&["latitude", "lat", "location_lat", "latitude_deg"]),
            longitude: names(&["longitude", "lon", "location_lon", "longitude_deg"]),
            aqi: names(&["aqi", "AQI", "aqi_value", "AQI_VALUE"]),
            category: names(&["category", "aqi_category"]),
            pm25: names(&["pm25", "pm2_5", "pm2.5", "PM2.5", "pm25_ugm3", "pm2_5_ugm3", "pm_2_5"]),
            pm10: names(&["pm10", "PM10", "pm10_ugm3", "pm_10"]),
            pollutant_id: names(&["pollutant_id"]),
            pollutant_value: names(&["avg_value"]),
        }
    }

    /// Latitude/longitude pair, or `None` if either half is missing.
    pub fn coordinates(&self, record: &ProviderRecord) -> Option<(f64, f64)> {
        let lat = first_number(record, &self.latitude)?;
        let lon = first_number(record, &self.longitude)?;
        Some((lat, lon))
    }

    /// A directly reported AQI value.
    pub fn direct_aqi(&self, record: &ProviderRecord) -> Option<f64> {
        first_number(record, &self.aqi)
    }

    /// The record's own category label, if it carries one.
    pub fn category(&self, record: &ProviderRecord) -> Option<String> {
        first_text(record, &self.category)
    }

    /// Concentration of `pollutant`, from a wide-layout field or, failing
    /// that, from a long-layout row measuring that pollutant.
    pub fn concentration(&self, record: &ProviderRecord, pollutant: Pollutant) -> Option<f64> {
        let wide = match pollutant {
            Pollutant::Pm25 => &self.pm25,
            Pollutant::Pm10 => &self.pm10,
        };
        if let Some(v) = first_number(record, wide) {
            return Some(v);
        }

        let id = first_text(record, &self.pollutant_id)?;
        if normalize_label(&id) == normalize_label(pollutant.label()) {
            first_number(record, &self.pollutant_value)
        } else {
            None
        }
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::ogd()
    }
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

/// First alias whose value parses as a finite number.
pub fn first_number(record: &ProviderRecord, aliases: &[String]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|key| record.get(key))
        .find_map(parse_number)
}

/// First alias holding a non-blank string.
pub fn first_text(record: &ProviderRecord, aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| record.get(key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a JSON value as a finite number. Strings are read leniently: the
/// longest leading numeric prefix counts, so `"23.02 N"` is 23.02 while
/// `"NA"` is nothing.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    }
}

fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut j = end + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - (end + 1);
        if digits > 0 {
            end = j;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut j = end + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// "PM2.5", "pm2_5" and "PM 2.5" all normalize to "pm25".
fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
