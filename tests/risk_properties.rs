/// Property tests for the scoring primitives
///
/// Covers the invariants the map relies on regardless of input:
/// - haversine distance is a metric on the sphere (zero, symmetric, bounded)
/// - simulated AQI stays in range and is stable within a 3-hour bucket
/// - breakpoint conversion is monotonic inside the tables
/// - zone risk stays in [0, 1]
///
/// Run with: cargo test --test risk_properties

use riskmap_service::breakpoints::{pollutant_index, to_index, PM10_BREAKPOINTS, PM25_BREAKPOINTS};
use riskmap_service::model::{Baseline, Pollutant, Zone};
use riskmap_service::resolver::{haversine_km, EARTH_RADIUS_KM};
use riskmap_service::risk::{aggregate, aqi_component};
use riskmap_service::simulator::{AqiSimulator, JitterMode, AQI_MAX, AQI_MIN, JITTER_RANGE};

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike, Utc};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn ist_simulator(jitter: JitterMode) -> AqiSimulator {
    AqiSimulator::new(FixedOffset::east_opt(330 * 60).unwrap(), jitter)
}

fn instant(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

// 2020-01-01 .. 2030-01-01
fn any_instant() -> impl Strategy<Value = i64> {
    1_577_836_800i64..1_893_456_000i64
}

fn lat() -> impl Strategy<Value = f64> {
    -90.0f64..=90.0
}

fn lon() -> impl Strategy<Value = f64> {
    -180.0f64..=180.0
}

proptest! {
    #[test]
    fn test_haversine_self_distance_is_zero(a in lat(), b in lon()) {
        prop_assert!(haversine_km(a, b, a, b).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_symmetric_and_bounded(a in lat(), b in lon(), c in lat(), d in lon()) {
        let there = haversine_km(a, b, c, d);
        let back = haversine_km(c, d, a, b);
        prop_assert!((there - back).abs() < 1e-6);
        prop_assert!(there >= 0.0);
        prop_assert!(there <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
    }

    #[test]
    fn test_simulated_aqi_in_range(key in "[a-z_0-9]{0,16}", secs in any_instant()) {
        for mode in [JitterMode::Random, JitterMode::Seeded] {
            let aqi = ist_simulator(mode).simulate(&key, instant(secs));
            prop_assert!((AQI_MIN..=AQI_MAX).contains(&aqi));
        }
    }

    #[test]
    fn test_simulated_aqi_near_base(key in "ahm_00[1-8]", secs in any_instant()) {
        let sim = ist_simulator(JitterMode::Random);
        let now = instant(secs);
        let base = sim.base_aqi(&key, now);
        let aqi = sim.simulate(&key, now);
        prop_assert!((aqi - base.clamp(AQI_MIN, AQI_MAX)).abs() <= JITTER_RANGE);
    }

    #[test]
    fn test_base_stable_within_bucket(key in "ahm_00[1-8]", secs in any_instant(), step in 0i64..10_800) {
        let sim = ist_simulator(JitterMode::Seeded);
        let local = sim.local_time(instant(secs));

        // start of the local 3-hour bucket containing `secs`
        let into_bucket = i64::from(local.hour() % 3) * 3600
            + i64::from(local.minute()) * 60
            + i64::from(local.second());
        let start = instant(secs) - Duration::seconds(into_bucket);
        let later = start + Duration::seconds(step);

        prop_assert_eq!(sim.base_aqi(&key, start), sim.base_aqi(&key, later));
        prop_assert_eq!(sim.simulate(&key, start), sim.simulate(&key, later));
    }

    #[test]
    fn test_time_of_day_floors(key in "[a-z_0-9]{1,12}", secs in any_instant()) {
        let sim = ist_simulator(JitterMode::Seeded);
        let now = instant(secs);
        let hour = sim.local_time(now).hour();
        let base = sim.base_aqi(&key, now);

        if (9..18).contains(&hour) {
            prop_assert!(base >= 80);
        } else if hour >= 18 {
            prop_assert!(base >= 100);
        }
        prop_assert!(base < 230);
    }

    #[test]
    fn test_pm25_index_monotonic(x in 0.0f64..500.4, y in 0.0f64..500.4) {
        let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
        if let (Some(a), Some(b)) = (to_index(lo, PM25_BREAKPOINTS), to_index(hi, PM25_BREAKPOINTS)) {
            prop_assert!(a <= b, "{} -> {} but {} -> {}", lo, a, hi, b);
            prop_assert!((0..=500).contains(&a));
        }
    }

    #[test]
    fn test_pm10_index_monotonic(x in 0u32..=604, y in 0u32..=604) {
        let (lo, hi) = (f64::from(x.min(y)), f64::from(x.max(y)));
        let a = pollutant_index(Pollutant::Pm10, lo);
        let b = pollutant_index(Pollutant::Pm10, hi);
        prop_assert!(a.is_some() && b.is_some());
        prop_assert!(a <= b);
    }

    #[test]
    fn test_out_of_table_has_no_index(c in 604.5f64..10_000.0) {
        prop_assert_eq!(to_index(c, PM10_BREAKPOINTS), None);
        prop_assert_eq!(to_index(-c, PM25_BREAKPOINTS), None);
    }

    #[test]
    fn test_risk_in_unit_interval(
        crime in 0.0f64..=1.0,
        traffic in 0.0f64..=1.0,
        flood in 0.0f64..=1.0,
        aqi in -100i32..1000,
    ) {
        let zone = Zone {
            zone_id: "z".into(),
            name: "Z".into(),
            population: None,
            geometry: Value::Null,
            properties: Map::new(),
            baseline: Some(Baseline { crime, traffic, flood }),
        };
        let result = aggregate(&zone, aqi, instant(1_760_853_600));

        prop_assert!((0.0..=1.0).contains(&result.risk));
        prop_assert_eq!(result.components.aqi, aqi_component(aqi));
        let mean = (crime + aqi_component(aqi) + traffic + flood) / 4.0;
        prop_assert!((result.risk - mean).abs() < 1e-12);
    }
}

#[test]
fn test_reference_zone_risk() {
    let zone = Zone {
        zone_id: "ahm_001".into(),
        name: "Old City".into(),
        population: None,
        geometry: Value::Null,
        properties: Map::new(),
        baseline: Some(Baseline { crime: 0.65, traffic: 0.72, flood: 0.15 }),
    };
    let result = aggregate(&zone, 50, instant(1_760_853_600));
    assert!((result.risk - 0.405).abs() < 1e-12);
}
