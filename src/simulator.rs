/// Time-aware air-quality simulator.
///
/// Used for zone enrichment and whenever no live provider is configured.
/// The value for a zone is a pure function of the zone key, the local date
/// and a 3-hour bucket of the local hour, plus a small jitter:
///
/// ```text
/// seed  = djb2("<zone_key>:<YYYY-MM-DD>:<hour / 3>")
/// base  = 30 + seed % 200
/// base  = max(base, 80)   if 09:00 <= hour < 18:00
/// base  = max(base, 100)  if hour >= 18:00
/// aqi   = clamp(base + jitter, 30, 300),  jitter in [-10, 10]
/// ```
///
/// No claim is made that these numbers resemble real air quality.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{serialize_iso_millis, Zone};

pub const AQI_MIN: i32 = 30;
pub const AQI_MAX: i32 = 300;
pub const JITTER_RANGE: i32 = 10;

/// Where the ±10 jitter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterMode {
    /// Independent thread RNG; two calls with identical inputs may differ.
    #[default]
    Random,
    /// Derived from the seed; the whole output is deterministic.
    Seeded,
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// djb2 over UTF-16 code units with wrapping 32-bit arithmetic.
pub fn djb2(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(5381u32, |h, unit| h.wrapping_mul(33).wrapping_add(u32::from(unit)))
}

/// Seed for a zone at a local date and hour. Hours in the same 3-hour bucket
/// share a seed.
pub fn seed_for(zone_key: &str, date: NaiveDate, hour: u32) -> u32 {
    djb2(&format!("{}:{}:{}", zone_key, date.format("%Y-%m-%d"), hour / 3))
}

/// Seeded base value with the time-of-day floor applied.
pub fn base_value(seed: u32, hour: u32) -> i32 {
    // seed % 200 < 200, so the cast is lossless
    let base = AQI_MIN + (seed % 200) as i32;
    if (9..18).contains(&hour) {
        base.max(80)
    } else if hour >= 18 {
        base.max(100)
    } else {
        base
    }
}

fn seeded_jitter(seed: u32) -> i32 {
    // re-mix so the jitter is not a function of seed % 200
    let mut x = seed ^ (seed >> 16);
    x = x.wrapping_mul(0x45d9_f3b);
    x ^= x >> 16;
    (x % (2 * JITTER_RANGE as u32 + 1)) as i32 - JITTER_RANGE
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Simulated AQI for one zone at one instant, as listed by `/api/aqi-today`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneAqiReading {
    pub zone_id: String,
    pub zone_name: String,
    pub aqi: i32,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub hour: u32,
    pub date: String,
}

#[derive(Debug, Clone, Copy)]
pub struct AqiSimulator {
    offset: FixedOffset,
    jitter: JitterMode,
}

impl AqiSimulator {
    pub fn new(offset: FixedOffset, jitter: JitterMode) -> Self {
        Self { offset, jitter }
    }

    /// The local wall-clock time used for date and hour bucketing.
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    /// Seeded, floored value before jitter.
    pub fn base_aqi(&self, zone_key: &str, now: DateTime<Utc>) -> i32 {
        let local = self.local_time(now);
        let seed = seed_for(zone_key, local.date_naive(), local.hour());
        base_value(seed, local.hour())
    }

    /// Simulated AQI for `zone_key` at `now`, always within [30, 300].
    pub fn simulate(&self, zone_key: &str, now: DateTime<Utc>) -> i32 {
        let local = self.local_time(now);
        let seed = seed_for(zone_key, local.date_naive(), local.hour());
        let base = base_value(seed, local.hour());

        let jitter = match self.jitter {
            JitterMode::Random => rand::thread_rng().gen_range(-JITTER_RANGE..=JITTER_RANGE),
            JitterMode::Seeded => seeded_jitter(seed),
        };

        (base + jitter).clamp(AQI_MIN, AQI_MAX)
    }

    /// Simulated readings for every zone, all stamped with the same instant.
    pub fn current_readings(&self, zones: &[Zone], now: DateTime<Utc>) -> Vec<ZoneAqiReading> {
        let local = self.local_time(now);
        let date = local.date_naive().format("%Y-%m-%d").to_string();

        zones
            .iter()
            .map(|zone| ZoneAqiReading {
                zone_id: zone.zone_id.clone(),
                zone_name: zone.name.clone(),
                aqi: self.simulate(zone.seed_key(), now),
                timestamp: now,
                hour: local.hour(),
                date: date.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
