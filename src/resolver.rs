/// Nearest-station lookup over a batch of provider records.
///
/// Coordinates are read through the record schema; records without a
/// parseable latitude/longitude pair are skipped. Distance is great-circle
/// (haversine) on a spherical Earth.

use crate::ingest::schema::RecordSchema;
use crate::model::ProviderRecord;

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push `a` a hair past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// The closest geolocated record to a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestStation<'a> {
    pub record: &'a ProviderRecord,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StationResolver {
    schema: RecordSchema,
}

impl StationResolver {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Linear scan for the record closest to (`lat`, `lon`).
    ///
    /// Ties keep the earlier record. Returns `None` when no record carries
    /// a usable coordinate pair, including for an empty batch.
    pub fn nearest<'a>(
        &self,
        lat: f64,
        lon: f64,
        records: &'a [ProviderRecord],
    ) -> Option<NearestStation<'a>> {
        let mut best: Option<NearestStation<'a>> = None;

        for record in records {
            let Some((rlat, rlon)) = self.schema.coordinates(record) else {
                continue;
            };
            let distance_km = haversine_km(lat, lon, rlat, rlon);

            if best.as_ref().map_or(true, |b| distance_km < b.distance_km) {
                best = Some(NearestStation {
                    record,
                    lat: rlat,
                    lon: rlon,
                    distance_km,
                });
            }
        }

        best
    }

    /// Every record located exactly at (`lat`, `lon`), in batch order.
    ///
    /// Long-layout providers publish one row per station and pollutant, so
    /// this is the full set of readings for the station `nearest` picked.
    /// Its first element is the record `nearest` returned.
    pub fn station_rows<'a>(&self, lat: f64, lon: f64, records: &'a [ProviderRecord]) -> Vec<&'a ProviderRecord> {
        records
            .iter()
            .filter(|r| self.schema.coordinates(r) == Some((lat, lon)))
            .collect()
    }

    /// Number of records with a usable coordinate pair.
    pub fn geolocated_count(&self, records: &[ProviderRecord]) -> usize {
        records
            .iter()
            .filter(|r| self.schema.coordinates(r).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(values: Vec<Value>) -> Vec<ProviderRecord> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        assert_eq!(haversine_km(23.0225, 72.5714, 23.0225, 72.5714), 0.0);
        assert_eq!(haversine_km(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_haversine_known_distances() {
        // one degree of latitude is about 111.19 km on this sphere
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.195).abs() < 0.01, "got {}", d);

        // Ahmedabad to Gandhinagar, roughly 23 km
        let d = haversine_km(23.0225, 72.5714, 23.2156, 72.6369);
        assert!((20.0..25.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_haversine_antipodal_is_half_circumference() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_picks_closest_record() {
        let batch = records(vec![
            json!({ "station": "Chandkheda", "latitude": "23.1090", "longitude": "72.5740" }),
            json!({ "station": "Maninagar", "latitude": "22.9964", "longitude": "72.6024" }),
            json!({ "station": "Bopal", "lat": 23.0336, "lon": 72.4636 }),
        ]);
        let resolver = StationResolver::default();

        let nearest = resolver.nearest(23.00, 72.60, &batch).unwrap();
        assert_eq!(nearest.record["station"], "Maninagar");
        assert_eq!(nearest.lat, 22.9964);
        assert_eq!(nearest.lon, 72.6024);
        assert!(nearest.distance_km < 1.0);
    }

    #[test]
    fn test_nearest_skips_ungeolocated_records() {
        let batch = records(vec![
            json!({ "station": "no coords", "pm25": "300" }),
            json!({ "station": "bad coords", "latitude": "NA", "longitude": "NA" }),
            json!({ "station": "far", "latitude": 28.61, "longitude": 77.20 }),
        ]);
        let resolver = StationResolver::default();

        let nearest = resolver.nearest(23.0, 72.6, &batch).unwrap();
        assert_eq!(nearest.record["station"], "far");
        assert_eq!(resolver.geolocated_count(&batch), 1);
    }

    #[test]
    fn test_nearest_none_without_coordinates() {
        let batch = records(vec![
            json!({ "station": "A" }),
            json!({ "station": "B", "latitude": "23.0" }),
        ]);
        assert!(StationResolver::default().nearest(23.0, 72.6, &batch).is_none());
        assert!(StationResolver::default().nearest(23.0, 72.6, &[]).is_none());
    }

    #[test]
    fn test_nearest_tie_keeps_first_record() {
        let batch = records(vec![
            json!({ "station": "first", "latitude": 23.1, "longitude": 72.6 }),
            json!({ "station": "second", "latitude": 23.1, "longitude": 72.6 }),
        ]);
        let nearest = StationResolver::default().nearest(23.0, 72.6, &batch).unwrap();
        assert_eq!(nearest.record["station"], "first");
    }

    #[test]
    fn test_station_rows_collects_every_row_at_the_station() {
        let batch = records(vec![
            json!({ "station": "Maninagar", "latitude": "22.9964", "longitude": "72.6024", "pollutant_id": "NO2" }),
            json!({ "station": "Chandkheda", "latitude": "23.1090", "longitude": "72.5740", "pollutant_id": "PM10" }),
            json!({ "station": "Maninagar", "latitude": "22.9964", "longitude": "72.6024", "pollutant_id": "PM2.5" }),
            json!({ "station": "Maninagar", "latitude": 22.9964, "longitude": 72.6024, "pollutant_id": "PM10" }),
        ]);
        let resolver = StationResolver::default();
        let nearest = resolver.nearest(23.0, 72.6, &batch).unwrap();

        let rows = resolver.station_rows(nearest.lat, nearest.lon, &batch);
        let ids: Vec<&str> = rows.iter().map(|r| r["pollutant_id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["NO2", "PM2.5", "PM10"]);
        assert!(std::ptr::eq(rows[0], nearest.record));
    }

    #[test]
    fn test_nearest_accepts_zero_coordinates() {
        let batch = records(vec![
            json!({ "station": "null island", "latitude": 0, "longitude": 0 }),
            json!({ "station": "elsewhere", "latitude": 10, "longitude": 10 }),
        ]);
        let nearest = StationResolver::default().nearest(0.0, 0.0, &batch).unwrap();
        assert_eq!(nearest.record["station"], "null island");
        assert_eq!(nearest.distance_km, 0.0);
    }
}
