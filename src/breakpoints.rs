/// Concentration-to-index conversion for PM2.5 and PM10.
///
/// Each pollutant has a fixed table of concentration ranges, each mapped
/// linearly onto an index range. This is the single source of truth for the
/// breakpoints; nothing else in the service should hardcode them.
///
/// Sources:
///   - US-EPA AQI technical assistance document (2012 PM2.5 revision)

use crate::model::Pollutant;

// ---------------------------------------------------------------------------
// Breakpoint tables
// ---------------------------------------------------------------------------

/// One linear segment of a pollutant's index curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Lowest concentration in the segment (µg/m³), inclusive.
    pub conc_low: f64,
    /// Highest concentration in the segment (µg/m³), inclusive.
    pub conc_high: f64,
    pub index_low: i32,
    pub index_high: i32,
}

const fn bp(conc_low: f64, conc_high: f64, index_low: i32, index_high: i32) -> Breakpoint {
    Breakpoint { conc_low, conc_high, index_low, index_high }
}

/// PM2.5 breakpoints, 24-hour average, ascending by `conc_low`.
pub static PM25_BREAKPOINTS: &[Breakpoint] = &[
    bp(0.0, 12.0, 0, 50),
    bp(12.1, 35.4, 51, 100),
    bp(35.5, 55.4, 101, 150),
    bp(55.5, 150.4, 151, 200),
    bp(150.5, 250.4, 201, 300),
    bp(250.5, 350.4, 301, 400),
    bp(350.5, 500.4, 401, 500),
];

/// PM10 breakpoints, 24-hour average, ascending by `conc_low`.
pub static PM10_BREAKPOINTS: &[Breakpoint] = &[
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 154.0, 51, 100),
    bp(155.0, 254.0, 101, 150),
    bp(255.0, 354.0, 151, 200),
    bp(355.0, 424.0, 201, 300),
    bp(425.0, 504.0, 301, 400),
    bp(505.0, 604.0, 401, 500),
];

/// Returns the breakpoint table for a pollutant.
pub fn table_for(pollutant: Pollutant) -> &'static [Breakpoint] {
    match pollutant {
        Pollutant::Pm25 => PM25_BREAKPOINTS,
        Pollutant::Pm10 => PM10_BREAKPOINTS,
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Converts a concentration to an index using the first segment that
/// contains it.
///
/// Returns `None` for non-finite input and for concentrations outside every
/// segment: negatives, the small gaps between segments (e.g. 12.05 for
/// PM2.5), and anything above the top segment. There is no extrapolation.
pub fn to_index(concentration: f64, table: &[Breakpoint]) -> Option<i32> {
    if !concentration.is_finite() {
        return None;
    }

    let b = table
        .iter()
        .find(|b| b.conc_low <= concentration && concentration <= b.conc_high)?;

    let slope = f64::from(b.index_high - b.index_low) / (b.conc_high - b.conc_low);
    let index = slope * (concentration - b.conc_low) + f64::from(b.index_low);
    Some(index.round() as i32)
}

/// Shorthand for `to_index` against the pollutant's own table.
pub fn pollutant_index(pollutant: Pollutant, concentration: f64) -> Option<i32> {
    to_index(concentration, table_for(pollutant))
}

// ---------------------------------------------------------------------------
// Dominant pollutant
// ---------------------------------------------------------------------------

/// The worse of the per-pollutant indices and which pollutant produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DominantIndex {
    pub index: i32,
    pub pollutant: Pollutant,
}

/// Picks the overall index from the PM2.5 and PM10 sub-indices.
///
/// The larger index wins; PM2.5 wins ties. With only one index present that
/// one is used, with neither the result is `None`.
pub fn dominant(pm25: Option<i32>, pm10: Option<i32>) -> Option<DominantIndex> {
    match (pm25, pm10) {
        (Some(a), Some(b)) if b > a => Some(DominantIndex { index: b, pollutant: Pollutant::Pm10 }),
        (Some(a), _) => Some(DominantIndex { index: a, pollutant: Pollutant::Pm25 }),
        (None, Some(b)) => Some(DominantIndex { index: b, pollutant: Pollutant::Pm10 }),
        (None, None) => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
