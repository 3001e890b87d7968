//! Strategy composer: the mutable working state for one strategy
//!
//! Owns both sides (entry and exit), each a parametrized instance of the
//! same condition/leg machinery, plus the strategy-level scalars. The
//! payload compiler only ever borrows this state read-only.

use crate::condition::{select_indicator, Condition, ConditionBuilder, ConditionSet};
use crate::legs::TradeLegSet;
use crate::metadata::MetadataService;
use crate::payload::{self, BacktestRequest, StrategySnapshot};
use crate::preset;
use crate::symbols;
use crate::types::{
    BacktestPeriod, ExpiryType, MetadataError, PresetError, RiskParams, Schedule, ValidationError,
    Validity,
};

/// Which side of the strategy an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySide {
    Entry,
    Exit,
}

/// Everything one side owns: its working condition selection, its
/// finalized conditions, and its trade legs
#[derive(Debug)]
pub struct SideState {
    pub builder: ConditionBuilder,
    pub conditions: ConditionSet,
    pub legs: TradeLegSet,
}

#[derive(Debug)]
pub struct StrategyComposer {
    symbol: String,
    lot_size: u32,
    pub validity: Validity,
    pub expiry_type: ExpiryType,
    pub time_frame: String,
    pub entry: SideState,
    pub exit: SideState,
    pub schedule: Schedule,
    pub risk: RiskParams,
    pub period: BacktestPeriod,
}

impl StrategyComposer {
    pub fn new(symbol: &str, period: BacktestPeriod) -> Self {
        let symbol = symbol.to_ascii_uppercase();
        let lot_size = symbols::lot_size(&symbol);
        let instrument = symbols::default_instrument(&symbol);

        StrategyComposer {
            entry: SideState {
                builder: ConditionBuilder::new(),
                conditions: ConditionSet::default(),
                legs: TradeLegSet::entry(lot_size, instrument),
            },
            exit: SideState {
                builder: ConditionBuilder::new(),
                conditions: ConditionSet::default(),
                legs: TradeLegSet::exit(lot_size, instrument),
            },
            symbol,
            lot_size,
            validity: Validity::Intraday,
            expiry_type: ExpiryType::Weekly,
            time_frame: "5".to_string(),
            schedule: Schedule::default(),
            risk: RiskParams::default(),
            period,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn lot_size(&self) -> u32 {
        self.lot_size
    }

    pub fn side_mut(&mut self, side: StrategySide) -> &mut SideState {
        match side {
            StrategySide::Entry => &mut self.entry,
            StrategySide::Exit => &mut self.exit,
        }
    }

    pub fn side(&self, side: StrategySide) -> &SideState {
        match side {
            StrategySide::Entry => &self.entry,
            StrategySide::Exit => &self.exit,
        }
    }

    /// Change the traded symbol. Updates the lot size (the step unit for
    /// all leg quantity adjustments) and, when the symbol moves between the
    /// index and equity instrument universes, rewrites each leg's
    /// instrument to the new default.
    pub fn set_symbol(&mut self, symbol: &str) {
        let symbol = symbol.to_ascii_uppercase();
        let rewrite = symbols::is_index(&symbol) != symbols::is_index(&self.symbol);
        let lot_size = symbols::lot_size(&symbol);
        let instrument = symbols::default_instrument(&symbol);

        self.entry
            .legs
            .apply_symbol_change(lot_size, instrument, rewrite);
        self.exit
            .legs
            .apply_symbol_change(lot_size, instrument, rewrite);
        self.symbol = symbol;
        self.lot_size = lot_size;
    }

    /// Select an indicator on one side and load its metadata
    /// (load-then-seed; a newer selection wins over an in-flight fetch)
    pub async fn select_indicator<M: MetadataService>(
        &mut self,
        side: StrategySide,
        service: &M,
        label: &str,
    ) -> Result<(), MetadataError> {
        select_indicator(&mut self.side_mut(side).builder, service, label).await
    }

    /// Apply a named preset: seeds the entry side with the preset's
    /// canonical operator and the exit side with its polarity inversion
    pub async fn apply_preset<M: MetadataService>(
        &mut self,
        service: &M,
        name: &str,
    ) -> Result<(), PresetError> {
        preset::apply_preset(
            service,
            name,
            &mut self.entry.builder,
            &mut self.exit.builder,
        )
        .await
    }

    /// Finalize the side's working selection into its condition set and
    /// return the encoded condition
    pub fn add_condition(&mut self, side: StrategySide) -> Condition {
        let state = self.side_mut(side);
        let condition = state.builder.finalize();
        state.conditions.push(condition.clone());
        condition
    }

    pub fn remove_condition(&mut self, side: StrategySide, index: usize) -> Option<Condition> {
        self.side_mut(side).conditions.remove(index)
    }

    /// Read-only view for the payload compiler
    pub fn snapshot(&self) -> StrategySnapshot<'_> {
        StrategySnapshot {
            symbol: &self.symbol,
            exchange: symbols::exchange(&self.symbol),
            validity: self.validity,
            expiry_type: self.expiry_type,
            time_frame: &self.time_frame,
            entry_legs: &self.entry.legs,
            entry_conditions: &self.entry.conditions,
            exit_conditions: &self.exit.conditions,
            schedule: &self.schedule,
            risk: &self.risk,
            period: &self.period,
        }
    }

    /// Compile the current state into the wire payload, or fail the
    /// validation gate. Never produces a partial payload.
    pub fn compile(&self) -> Result<BacktestRequest, ValidationError> {
        payload::compile(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Instrument;
    use chrono::NaiveDate;

    fn test_period() -> BacktestPeriod {
        BacktestPeriod {
            from: NaiveDate::from_ymd_opt(2026, 1, 30).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
        }
    }

    #[test]
    fn test_new_composer_seeds_from_symbol() {
        let composer = StrategyComposer::new("nifty", test_period());
        assert_eq!(composer.symbol(), "NIFTY");
        assert_eq!(composer.lot_size(), 65);
        assert_eq!(composer.entry.legs.len(), 1);
        assert_eq!(composer.entry.legs.legs()[0].quantity, 65);
        assert_eq!(composer.entry.legs.legs()[0].instrument, Instrument::Ce);
        assert!(composer.exit.legs.is_empty());
    }

    #[test]
    fn test_symbol_change_between_universes_rewrites_instruments() {
        let mut composer = StrategyComposer::new("NIFTY", test_period());
        composer.set_symbol("RELIANCE");
        assert_eq!(composer.lot_size(), 500);
        assert_eq!(composer.entry.legs.legs()[0].instrument, Instrument::Eq);
        // Quantity survives the switch
        assert_eq!(composer.entry.legs.legs()[0].quantity, 65);
    }

    #[test]
    fn test_symbol_change_within_universe_keeps_instruments() {
        let mut composer = StrategyComposer::new("NIFTY", test_period());
        composer
            .entry
            .legs
            .leg_mut(1)
            .unwrap()
            .instrument = Instrument::Pe;
        composer.set_symbol("BANKNIFTY");
        assert_eq!(composer.lot_size(), 30);
        assert_eq!(composer.entry.legs.legs()[0].instrument, Instrument::Pe);
    }

    #[test]
    fn test_compile_fails_without_entry_conditions() {
        let composer = StrategyComposer::new("NIFTY", test_period());
        assert_eq!(
            composer.compile().unwrap_err(),
            ValidationError::NoEntryConditions
        );
    }
}
