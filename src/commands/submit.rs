//! Submit command implementation

use anyhow::{Context, Result};
use strategy_composer::api::EngineClient;
use strategy_composer::config::StrategyFile;
use strategy_composer::{Config, StrategySide};
use tracing::info;

pub async fn run(config_path: Option<String>, strategy_path: String, dry_run: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env(),
    };
    let client = EngineClient::new(config.base_url.clone(), config.auth_token.clone());

    let strategy = StrategyFile::from_file(&strategy_path)?;
    info!("Loaded strategy file: {}", strategy_path);

    let mut composer = strategy.build_composer()?;

    // A preset seeds both sides from the catalog; the seeded selections
    // are then finalized into one entry and one exit condition.
    if let Some(preset) = &strategy.preset {
        info!("Applying preset: {}", preset);
        composer
            .apply_preset(&client, preset)
            .await
            .with_context(|| format!("failed to apply preset '{}'", preset))?;
        let entry = composer.add_condition(StrategySide::Entry);
        let exit = composer.add_condition(StrategySide::Exit);
        info!("Seeded entry condition: {}", entry);
        info!("Seeded exit condition: {}", exit);
    }

    let request = composer.compile()?;

    println!("\n{}", "=".repeat(60));
    println!("COMPILED PAYLOAD");
    println!("{}", "=".repeat(60));
    println!("{}", serde_json::to_string_pretty(&request)?);
    println!("{}", "=".repeat(60));

    if dry_run {
        println!("Dry run - not submitted");
        return Ok(());
    }

    let result = client.submit(&request).await?;
    println!(
        "Backtest submitted: {}",
        result.message.as_deref().unwrap_or("accepted")
    );

    Ok(())
}
