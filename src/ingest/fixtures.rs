/// Test fixtures: representative JSON payloads from the data.gov.in
/// resource API.
///
/// Response shape:
///   response.total        - record count (number, sometimes a string)
///   response.records[]    - flat objects, field names vary per resource
///
/// The CPCB real-time air quality resource uses the long layout: one row
/// per station and pollutant, with coordinates and values as STRINGS and
/// "NA" for missing readings. Other resources use a wide layout with one
/// row per station.

/// Long layout: two Ahmedabad stations. Maninagar reports PM2.5 and PM10
/// as separate rows; Chandkheda has only a PM10 row.
#[cfg(test)]
pub(crate) fn fixture_ogd_long_format_json() -> &'static str {
    r#"{
      "index_name": "Real time Air Quality Index from various locations",
      "title": "Real time Air Quality Index from various locations",
      "total": 3,
      "count": 3,
      "limit": "1000",
      "offset": "0",
      "records": [
        {
          "country": "India",
          "state": "Gujarat",
          "city": "Ahmedabad",
          "station": "Maninagar, Ahmedabad - GPCB",
          "last_update": "19-10-2026 10:00:00",
          "latitude": "22.9964",
          "longitude": "72.6024",
          "pollutant_id": "PM2.5",
          "min_value": "38",
          "max_value": "71",
          "avg_value": "48"
        },
        {
          "country": "India",
          "state": "Gujarat",
          "city": "Ahmedabad",
          "station": "Maninagar, Ahmedabad - GPCB",
          "last_update": "19-10-2026 10:00:00",
          "latitude": "22.9964",
          "longitude": "72.6024",
          "pollutant_id": "PM10",
          "min_value": "80",
          "max_value": "140",
          "avg_value": "97"
        },
        {
          "country": "India",
          "state": "Gujarat",
          "city": "Ahmedabad",
          "station": "Chandkheda, Ahmedabad - IITM",
          "last_update": "19-10-2026 10:00:00",
          "latitude": "23.1090",
          "longitude": "72.5740",
          "pollutant_id": "PM10",
          "min_value": "NA",
          "max_value": "NA",
          "avg_value": "NA"
        }
      ]
    }"#
}

/// Wide layout with a string `total`. The second record carries a direct
/// AQI and category alongside concentrations.
#[cfg(test)]
pub(crate) fn fixture_ogd_wide_format_json() -> &'static str {
    r#"{
      "total": "2",
      "records": [
        {
          "station": "Navrangpura",
          "lat": 23.0365,
          "lon": 72.5611,
          "pm2_5": "35.0",
          "pm10": "60"
        },
        {
          "station": "Bopal",
          "location_lat": "23.0336",
          "location_lon": "72.4636",
          "AQI": 168,
          "aqi_category": "Unhealthy",
          "pm25_ugm3": "90.2",
          "pm10_ugm3": "150"
        }
      ]
    }"#
}

/// Resource that exists but has no rows, and omits the array entirely.
#[cfg(test)]
pub(crate) fn fixture_ogd_no_records_json() -> &'static str {
    r#"{
      "total": 0,
      "count": 0,
      "message": "Resource has no data"
    }"#
}

/// Records without any recognizable coordinate fields.
#[cfg(test)]
pub(crate) fn fixture_ogd_ungeolocated_json() -> &'static str {
    r#"{
      "total": 2,
      "records": [
        { "station": "Unknown A", "pollutant_id": "PM2.5", "avg_value": "40" },
        { "station": "Unknown B", "latitude": "NA", "longitude": "NA", "aqi": "120" }
      ]
    }"#
}
