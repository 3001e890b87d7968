//! Presets command implementation

use anyhow::Result;
use strategy_composer::api::EngineClient;
use strategy_composer::metadata::FALLBACK_INDICATORS;
use strategy_composer::{symbols, Config};
use tracing::info;

pub async fn run(config_path: Option<String>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env(),
    };
    let client = EngineClient::new(config.base_url.clone(), config.auth_token.clone());

    info!("Fetching preset catalog from {}", config.base_url);
    let catalog = client.fetch_preset_catalog().await?;

    println!("\n{}", "=".repeat(60));
    println!("PRESET CATALOG");
    println!("{}", "=".repeat(60));
    if catalog.presets.is_empty() {
        println!("(catalog returned no presets)");
    }
    for preset in &catalog.presets {
        match preset.entry_technicals.first() {
            Some(technical) => println!("{:<20} {}", preset.name, technical.value),
            None => println!("{:<20} (no encoded descriptor)", preset.name),
        }
    }

    println!("\nIndicators:");
    if catalog.indicators.is_empty() {
        for name in FALLBACK_INDICATORS {
            println!("  {}", name);
        }
    } else {
        for entry in &catalog.indicators {
            println!("  {}", entry.name);
        }
    }

    println!("\nSymbols:");
    for (symbol, lot) in symbols::known_symbols() {
        println!("  {:<12} lot {}", symbol, lot);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
