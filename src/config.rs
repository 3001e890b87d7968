//! Configuration management
//!
//! Handles the engine connection config (JSON file with environment
//! variable support for the API token) and the declarative strategy file
//! the CLI compiles into a submission.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::api::DEFAULT_BASE_URL;
use crate::composer::{StrategyComposer, StrategySide};
use crate::types::{
    BacktestPeriod, ExpiryType, Instrument, PriceType, Side, StrikeOffset, TargetBasis,
    TradingDay, Validity,
};

/// Engine connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token; `BACKTEST_API_TOKEN` overrides the file value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            auth_token: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, then apply env overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus env overrides, for running without a config file
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BACKTEST_API_TOKEN") {
            self.auth_token = Some(token);
        }
    }
}

/// Declarative strategy description consumed by `submit`
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyFile {
    pub symbol: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,

    #[serde(default)]
    pub validity: Option<Validity>,
    #[serde(default)]
    pub expiry_type: Option<ExpiryType>,
    #[serde(default)]
    pub time_frame: Option<String>,

    /// Named preset to seed both sides from the remote catalog
    #[serde(default)]
    pub preset: Option<String>,
    /// Pre-encoded condition strings appended verbatim
    #[serde(default)]
    pub entry_conditions: Vec<String>,
    #[serde(default)]
    pub exit_conditions: Vec<String>,

    #[serde(default)]
    pub legs: Vec<LegSpec>,

    #[serde(default)]
    pub days: Option<Vec<TradingDay>>,
    /// "HH:MM"
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub no_of_times: Option<u32>,

    #[serde(default)]
    pub target_basis: Option<TargetBasis>,
    #[serde(default)]
    pub fixed_profit: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
}

/// One leg in the strategy file; omitted fields take composer defaults
#[derive(Debug, Clone, Deserialize)]
pub struct LegSpec {
    pub side: Side,
    #[serde(default)]
    pub instrument: Option<Instrument>,
    #[serde(default)]
    pub strike: Option<StrikeOffset>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub price_type: Option<PriceType>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub stoploss: Option<f64>,
}

impl StrategyFile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents =
            fs::read_to_string(path.as_ref()).context("Failed to read strategy file")?;
        serde_json::from_str(&contents).context("Failed to parse strategy JSON")
    }

    /// Build a composer from the declarative description. Preset
    /// application needs the metadata service and happens separately.
    pub fn build_composer(&self) -> Result<StrategyComposer> {
        let period = BacktestPeriod {
            from: self.from_date,
            to: self.to_date,
        };
        let mut composer = StrategyComposer::new(&self.symbol, period);

        if let Some(validity) = self.validity {
            composer.validity = validity;
        }
        if let Some(expiry) = self.expiry_type {
            composer.expiry_type = expiry;
        }
        if let Some(tf) = &self.time_frame {
            composer.time_frame = tf.clone();
        }

        if let Some(days) = &self.days {
            composer.schedule.days = days.clone();
        }
        if let Some(start) = &self.start_time {
            composer.schedule.start = parse_time(start)?;
        }
        if let Some(end) = &self.end_time {
            composer.schedule.end = parse_time(end)?;
        }
        if let Some(n) = self.no_of_times {
            composer.schedule.no_of_times = n;
        }

        if let Some(basis) = self.target_basis {
            composer.risk.target_basis = basis;
        }
        if let Some(profit) = self.fixed_profit {
            composer.risk.fixed_profit = profit;
        }
        if let Some(loss) = self.stop_loss {
            composer.risk.stop_loss = loss;
        }

        for (i, spec) in self.legs.iter().enumerate() {
            // The entry set seeds one default leg; the first spec edits it
            let id = if i == 0 {
                composer.entry.legs.legs()[0].id
            } else {
                composer.entry.legs.add()
            };
            let lot = composer.lot_size();
            // Supplied quantities are snapped to the symbol's lot multiple
            let quantity = composer
                .entry
                .legs
                .snap_quantity(spec.quantity.unwrap_or(lot));
            let leg = composer
                .entry
                .legs
                .leg_mut(id)
                .context("leg just added must exist")?;
            leg.side = spec.side;
            if let Some(instrument) = spec.instrument {
                leg.instrument = instrument;
            }
            if let Some(strike) = spec.strike {
                leg.strike = strike;
            }
            leg.quantity = quantity;
            if let Some(price_type) = spec.price_type {
                leg.price_type = price_type;
            }
            leg.target = spec.target.unwrap_or(0.0);
            leg.stoploss = spec.stoploss.unwrap_or(0.0);
        }

        for condition in &self.entry_conditions {
            composer
                .side_mut(StrategySide::Entry)
                .conditions
                .push(condition.as_str().into());
        }
        for condition in &self.exit_conditions {
            composer
                .side_mut(StrategySide::Exit)
                .conditions
                .push(condition.as_str().into());
        }

        Ok(composer)
    }
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .with_context(|| format!("invalid time '{}', expected HH:MM", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_strategy_file_minimal() {
        let file: StrategyFile = serde_json::from_str(
            r#"{
                "symbol": "NIFTY",
                "from_date": "2026-01-30",
                "to_date": "2026-02-06",
                "entry_conditions": ["EMA,7,Greater Than ( > ),EMA,21,AND"]
            }"#,
        )
        .unwrap();

        let composer = file.build_composer().unwrap();
        assert_eq!(composer.symbol(), "NIFTY");
        assert_eq!(composer.entry.conditions.len(), 1);
        assert_eq!(composer.entry.legs.len(), 1);
        let request = composer.compile().unwrap();
        assert_eq!(request.entry_parameters[0].qty, "65");
    }

    #[test]
    fn test_strategy_file_with_legs_and_schedule() {
        let file: StrategyFile = serde_json::from_str(
            r#"{
                "symbol": "SBIN",
                "from_date": "2026-01-01",
                "to_date": "2026-03-01",
                "validity": "Positional",
                "start_time": "10:00",
                "end_time": "15:00",
                "days": ["Monday", "Friday"],
                "legs": [
                    { "side": "BUY", "quantity": 1500, "target": 12.5 },
                    { "side": "SELL", "instrument": "FUT" }
                ],
                "entry_conditions": ["RSI,14,Lesser Than ( < ),Close,1,AND"]
            }"#,
        )
        .unwrap();

        let composer = file.build_composer().unwrap();
        assert_eq!(composer.validity, Validity::Positional);
        assert_eq!(composer.schedule.days.len(), 2);
        assert_eq!(composer.entry.legs.len(), 2);

        let legs = composer.entry.legs.legs();
        assert_eq!(legs[0].quantity, 1500);
        assert_eq!(legs[0].target, 12.5);
        assert_eq!(legs[1].side, Side::Sell);
        assert_eq!(legs[1].instrument, Instrument::Fut);
        assert_eq!(legs[1].quantity, 750); // SBIN lot

        let request = composer.compile().unwrap();
        assert_eq!(request.computation_time[0].entry_time, "10:00");
        assert_eq!(request.daily_parameters[0].tuesday, "False");
    }

    #[test]
    fn test_strategy_file_quantity_snapped_to_lot() {
        let file: StrategyFile = serde_json::from_str(
            r#"{
                "symbol": "SBIN",
                "from_date": "2026-01-30",
                "to_date": "2026-02-06",
                "legs": [
                    { "side": "BUY", "quantity": 1000 },
                    { "side": "BUY", "quantity": 0 }
                ],
                "entry_conditions": ["EMA,7,Greater Than ( > ),EMA,21,AND"]
            }"#,
        )
        .unwrap();

        let composer = file.build_composer().unwrap();
        // 1000 is not a multiple of SBIN's 750 lot; nearest multiple wins
        assert_eq!(composer.entry.legs.legs()[0].quantity, 750);
        // Zero clamps to one lot
        assert_eq!(composer.entry.legs.legs()[1].quantity, 750);

        let request = composer.compile().unwrap();
        assert_eq!(request.entry_parameters[0].qty, "750");
        assert_eq!(request.entry_parameters[1].qty, "750");
    }

    #[test]
    fn test_strategy_file_bad_time_rejected() {
        let file: StrategyFile = serde_json::from_str(
            r#"{
                "symbol": "NIFTY",
                "from_date": "2026-01-30",
                "to_date": "2026-02-06",
                "start_time": "9am"
            }"#,
        )
        .unwrap();
        assert!(file.build_composer().is_err());
    }
}
