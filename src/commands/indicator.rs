//! Indicator command implementation

use anyhow::Result;
use strategy_composer::api::EngineClient;
use strategy_composer::metadata::{descriptor_or_fallback, indicator_api_value};
use strategy_composer::Config;
use tracing::info;

pub async fn run(config_path: Option<String>, name: String) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env(),
    };
    let client = EngineClient::new(config.base_url.clone(), config.auth_token.clone());

    let api_value = indicator_api_value(&name);
    info!("Fetching descriptor for {} ({})", name, api_value);
    let (descriptor, degraded) = descriptor_or_fallback(&client, &api_value).await;

    println!("\n{}", "=".repeat(60));
    println!("INDICATOR: {}", name);
    if degraded {
        println!("(metadata service unreachable - showing fallback dataset)");
    }
    println!("{}", "=".repeat(60));

    println!("Parameters:");
    if descriptor.indicator_fields().is_empty() {
        println!("  (none)");
    }
    for field in descriptor.indicator_fields() {
        println!("  {:<16} default {}", field.label, field.default_value);
    }

    println!("Companion functions:");
    for function in &descriptor.after {
        let params: Vec<String> = function
            .fields
            .iter()
            .map(|f| format!("{}={}", f.label, f.default_value))
            .collect();
        if params.is_empty() {
            println!("  {}", function.name);
        } else {
            println!("  {:<16} {}", function.name, params.join(", "));
        }
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
