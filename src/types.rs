//! Core data types shared across the strategy composer

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade direction for a leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Opposite direction, used when deriving the reverse-entry block
    pub fn flipped(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tradable instrument kind for a leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Instrument {
    Ce,
    Pe,
    Fut,
    Eq,
}

impl Instrument {
    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::Ce => "CE",
            Instrument::Pe => "PE",
            Instrument::Fut => "FUT",
            Instrument::Eq => "EQ",
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strike selection relative to the spot price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrikeOffset {
    Atm,
    Itm,
    Otm,
}

impl StrikeOffset {
    pub fn as_str(self) -> &'static str {
        match self {
            StrikeOffset::Atm => "ATM",
            StrikeOffset::Itm => "ITM",
            StrikeOffset::Otm => "OTM",
        }
    }
}

impl std::fmt::Display for StrikeOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit for a leg's target/stoploss values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceType {
    Pts,
    #[serde(rename = "%")]
    Percent,
}

impl PriceType {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceType::Pts => "Pts",
            PriceType::Percent => "%",
        }
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order validity for the whole strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Intraday,
    Positional,
}

impl Validity {
    pub fn as_str(self) -> &'static str {
        match self {
            Validity::Intraday => "Intraday",
            Validity::Positional => "Positional",
        }
    }
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derivative expiry cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryType {
    Weekly,
    Monthly,
}

impl ExpiryType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryType::Weekly => "Weekly",
            ExpiryType::Monthly => "Monthly",
        }
    }
}

impl std::fmt::Display for ExpiryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical joiner between successive conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }

    /// Parse from the encoded form used by the preset catalog
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Combinator::And),
            "OR" => Some(Combinator::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basis for the strategy-level fixed profit target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetBasis {
    /// Absolute currency value (`₹` in the UI, `Value` on the wire)
    Value,
    #[serde(rename = "%")]
    Percent,
}

impl TargetBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetBasis::Value => "Value",
            TargetBasis::Percent => "%",
        }
    }
}

/// Trading days the engine can evaluate (the market trades weekdays only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl TradingDay {
    pub const ALL: [TradingDay; 5] = [
        TradingDay::Monday,
        TradingDay::Tuesday,
        TradingDay::Wednesday,
        TradingDay::Thursday,
        TradingDay::Friday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TradingDay::Monday => "Monday",
            TradingDay::Tuesday => "Tuesday",
            TradingDay::Wednesday => "Wednesday",
            TradingDay::Thursday => "Thursday",
            TradingDay::Friday => "Friday",
        }
    }
}

impl std::fmt::Display for TradingDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computation window and day selection for the strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub days: Vec<TradingDay>,
    pub start: chrono::NaiveTime,
    pub end: chrono::NaiveTime,
    pub no_of_times: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            days: TradingDay::ALL.to_vec(),
            start: chrono::NaiveTime::from_hms_opt(9, 15, 0).expect("valid time"),
            end: chrono::NaiveTime::from_hms_opt(15, 30, 0).expect("valid time"),
            no_of_times: 0,
        }
    }
}

impl Schedule {
    pub fn has_day(&self, day: TradingDay) -> bool {
        self.days.contains(&day)
    }

    /// Toggle a day's membership in the selection
    pub fn toggle_day(&mut self, day: TradingDay) {
        if let Some(pos) = self.days.iter().position(|d| *d == day) {
            self.days.remove(pos);
        } else {
            self.days.push(day);
        }
    }
}

/// Strategy-level target and stop-loss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub target_basis: TargetBasis,
    pub fixed_profit: f64,
    pub stop_loss: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            target_basis: TargetBasis::Value,
            fixed_profit: 0.0,
            stop_loss: 0.0,
        }
    }
}

/// Inclusive date range the backtest runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// Failures while talking to the metadata/catalog service.
///
/// Per-side and recoverable: a failed descriptor load for the entry side
/// never touches the exit side, and every variant can be retried.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed metadata response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        MetadataError::Network(err.to_string())
    }
}

/// Failures while applying a named preset
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Pre-submit validation gate. Each reason blocks submission on its own;
/// a payload is never partially built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no symbol selected")]
    NoSymbol,

    #[error("at least one entry trade leg is required")]
    NoEntryLegs,

    #[error("at least one trading day must be selected")]
    NoTradingDays,

    #[error("from date {from} is after to date {to}")]
    InvalidDateRange {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },

    #[error("at least one entry technical condition is required")]
    NoEntryConditions,
}

/// Failures at final submission. Composer state is preserved so the
/// trader can retry without data loss.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        SubmitError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_flip_is_involutive() {
        assert_eq!(Side::Buy.flipped(), Side::Sell);
        assert_eq!(Side::Sell.flipped(), Side::Buy);
        assert_eq!(Side::Buy.flipped().flipped(), Side::Buy);
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(Side::Buy.as_str(), "BUY");
        assert_eq!(Instrument::Fut.as_str(), "FUT");
        assert_eq!(StrikeOffset::Atm.as_str(), "ATM");
        assert_eq!(PriceType::Percent.as_str(), "%");
        assert_eq!(TargetBasis::Value.as_str(), "Value");
    }

    #[test]
    fn test_combinator_parse() {
        assert_eq!(Combinator::parse("AND"), Some(Combinator::And));
        assert_eq!(Combinator::parse(" or "), Some(Combinator::Or));
        assert_eq!(Combinator::parse("XOR"), None);
    }

    #[test]
    fn test_schedule_day_toggle() {
        let mut schedule = Schedule::default();
        assert!(schedule.has_day(TradingDay::Wednesday));
        schedule.toggle_day(TradingDay::Wednesday);
        assert!(!schedule.has_day(TradingDay::Wednesday));
        schedule.toggle_day(TradingDay::Wednesday);
        assert!(schedule.has_day(TradingDay::Wednesday));
    }

    #[test]
    fn test_side_serde_uppercase() {
        let json = serde_json::to_string(&Side::Sell).unwrap();
        assert_eq!(json, "\"SELL\"");
        let side: Side = serde_json::from_str("\"BUY\"").unwrap();
        assert_eq!(side, Side::Buy);
    }
}
