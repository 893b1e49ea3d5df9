#!/usr/bin/env rust
//! Provider Record Inspection
//!
//! Fetches a small page from the configured data.gov.in resource and prints
//! the first record, so the field aliases in riskmap.toml can be checked
//! against what the provider actually returns.
//!
//! For the configured resource:
//! 1. Fetch 5 records straight from the API (no cache)
//! 2. Print the reported total and the first record's field names
//! 3. Show what the record schema extracts from each record
//!
//! Usage:
//!   cargo run --bin inspect_provider
//!   cargo run --bin inspect_provider -- --config other.toml
//!
//! Environment:
//!   OGD_API_KEY - data.gov.in API key (from .env)

use riskmap_service::config::{load_config, DEFAULT_CONFIG_PATH};
use riskmap_service::ingest::ogd::{OgdClient, RecordSource, DEBUG_FETCH_LIMIT};
use riskmap_service::model::Pollutant;

use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    println!("🔎 Provider Record Inspection");
    println!("================================\n");

    let args: Vec<String> = env::args().collect();
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => args.get(i + 1).ok_or("--config requires a file path")?.clone(),
        None => DEFAULT_CONFIG_PATH.to_string(),
    };

    println!("📋 Loading configuration from {}...", config_path);
    let mut config = load_config(&config_path)?;
    config.apply_env_overrides()?;

    let Some(api_key) = config.provider.api_key.clone() else {
        eprintln!("\nOGD_API_KEY is not set. Add it to .env or the environment.\n");
        std::process::exit(1);
    };
    println!("✓ Resource {}\n", config.provider.resource_id);

    let client = OgdClient::new(
        &config.provider.base_url,
        &config.provider.resource_id,
        &api_key,
        config.provider.timeout(),
    )?;

    println!("📡 Fetching {} records...", DEBUG_FETCH_LIMIT);
    let batch = client.fetch_records(DEBUG_FETCH_LIMIT)?;
    match batch.total {
        Some(total) => println!("✓ Provider reports {} records in total\n", total),
        None => println!("✓ Provider did not report a total\n"),
    }

    let Some(first) = batch.records.first() else {
        println!("⚠ Resource returned no records");
        return Ok(());
    };

    println!("FIRST RECORD FIELDS");
    println!("================================");
    for key in first.keys() {
        println!("  {}", key);
    }
    println!("\n{}\n", serde_json::to_string_pretty(first)?);

    let schema = &config.provider.schema;
    println!("SCHEMA EXTRACTION");
    println!("================================");
    for (i, record) in batch.records.iter().enumerate() {
        let coords = schema
            .coordinates(record)
            .map(|(lat, lon)| format!("{:.4}, {:.4}", lat, lon))
            .unwrap_or_else(|| "none".to_string());
        let fmt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string());

        println!(
            "  #{}  coords: {:<20} aqi: {:<6} PM2.5: {:<6} PM10: {:<6} category: {}",
            i + 1,
            coords,
            fmt(schema.direct_aqi(record)),
            fmt(schema.concentration(record, Pollutant::Pm25)),
            fmt(schema.concentration(record, Pollutant::Pm10)),
            schema.category(record).unwrap_or_else(|| "-".to_string()),
        );
    }

    Ok(())
}
