//! Quick-configuration presets
//!
//! A preset is a named, pre-authored strategy template in the remote
//! catalog. Applying one seeds both sides of the composer: the entry side
//! with the preset's canonical operator and the exit side with its polarity
//! inversion, same indicator and companion function on both. Seeding is
//! two-phase per side: the indicator's metadata load must resolve before
//! the preset's parameter values are written (load-then-seed, never
//! seed-before-load).

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::condition::{invert_operator, select_indicator, ConditionBuilder};
use crate::metadata::{MetadataService, NamedEntry};
use crate::types::{Combinator, PresetError};

/// `/technical_default_strategies` response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PresetCatalog {
    #[serde(rename = "List", default)]
    pub presets: Vec<PresetDescriptor>,
    #[serde(rename = "Indicators", default)]
    pub indicators: Vec<NamedEntry>,
}

impl PresetCatalog {
    /// Exact-name lookup; no fuzzy matching
    pub fn find(&self, name: &str) -> Option<&PresetDescriptor> {
        self.presets.iter().find(|p| p.name == name)
    }
}

/// One catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct PresetDescriptor {
    #[serde(rename = "StrategyName")]
    pub name: String,
    #[serde(rename = "EntryTechnicals", default)]
    pub entry_technicals: Vec<EncodedTechnical>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodedTechnical {
    pub value: String,
}

/// Parsed form of a preset's six-field encoded descriptor:
/// `indicator, period1, comparisonSymbol, companionIndicator, period2, combinator`
#[derive(Debug, Clone, PartialEq)]
pub struct PresetSeed {
    pub indicator: String,
    pub period1: f64,
    pub comparison: String,
    pub function: String,
    pub period2: f64,
    pub combinator: Combinator,
}

impl PresetSeed {
    /// Fixed-arity parse. Fewer than six fields means the entry is not
    /// seedable and the caller falls back to the static indicator table.
    pub fn parse(encoded: &str) -> Option<Self> {
        let fields: Vec<&str> = encoded.split(',').collect();
        if fields.len() < 6 {
            return None;
        }
        Some(PresetSeed {
            indicator: fields[0].trim().to_string(),
            period1: fields[1].trim().parse().unwrap_or(1.0),
            comparison: fields[2].trim().to_string(),
            function: fields[3].trim().to_string(),
            period2: fields[4].trim().parse().unwrap_or(1.0),
            combinator: Combinator::parse(fields[5]).unwrap_or(Combinator::And),
        })
    }
}

/// Canonical entry operator per preset. These override whatever raw symbol
/// the catalog descriptor carries.
static PRESET_ENTRY_OPERATORS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("EMA CrossOver", "Crosses Above"),
            ("SuperTrend", "Greater Than ( > )"),
            ("Parabolic SAR", "Lesser Than ( < )"),
            ("BBands BreakOut", "Greater Than ( > )"),
            ("MACD Crosssover", "Greater Than ( > )"),
        ])
    });

/// Exit operators are the entry operators' fixed polarity inversions
static PRESET_EXIT_OPERATORS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        PRESET_ENTRY_OPERATORS
            .iter()
            .map(|(preset, op)| (*preset, invert_operator(op)))
            .collect()
    });

/// Indicator-only seed used when a catalog entry has no well-formed
/// six-field descriptor
static PRESET_FALLBACK_INDICATORS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("EMA CrossOver", "EMA"),
            ("SuperTrend", "Close"),
            ("Parabolic SAR", "Parabolic SAR"),
            ("BBands BreakOut", "Close"),
            ("MACD Crosssover", "MACD"),
        ])
    });

pub fn preset_entry_operator(preset: &str) -> Option<&'static str> {
    PRESET_ENTRY_OPERATORS.get(preset).copied()
}

pub fn preset_exit_operator(preset: &str) -> Option<&'static str> {
    PRESET_EXIT_OPERATORS.get(preset).copied()
}

/// Resolve a named preset and seed both sides.
///
/// Sides are seeded sequentially, entry first; each side's parameter writes
/// happen strictly after that side's own metadata load resolves. A metadata
/// failure raises the failing side's error flag and aborts only this
/// preset-apply action.
pub async fn apply_preset<M: MetadataService>(
    service: &M,
    name: &str,
    entry: &mut ConditionBuilder,
    exit: &mut ConditionBuilder,
) -> Result<(), PresetError> {
    let catalog = service.preset_catalog().await?;
    let preset = catalog
        .find(name)
        .ok_or_else(|| PresetError::NotFound(name.to_string()))?;

    let seed = preset
        .entry_technicals
        .first()
        .and_then(|t| PresetSeed::parse(&t.value));

    match seed {
        Some(seed) => {
            let entry_op = preset_entry_operator(&preset.name)
                .map(str::to_string)
                .unwrap_or_else(|| seed.comparison.clone());
            let exit_op = preset_exit_operator(&preset.name)
                .map(str::to_string)
                .unwrap_or_else(|| invert_operator(&seed.comparison).to_string());

            select_indicator(entry, service, &seed.indicator).await?;
            seed_side(entry, &seed, entry_op);

            select_indicator(exit, service, &seed.indicator).await?;
            seed_side(exit, &seed, exit_op);
        }
        None => {
            // Indicator-only seed from the static table
            let indicator = PRESET_FALLBACK_INDICATORS
                .get(preset.name.as_str())
                .copied()
                .unwrap_or("Close");

            select_indicator(entry, service, indicator).await?;
            if let Some(op) = preset_entry_operator(&preset.name) {
                entry.set_operator(op);
            }

            select_indicator(exit, service, indicator).await?;
            if let Some(op) = preset_exit_operator(&preset.name) {
                exit.set_operator(op);
            }
        }
    }

    Ok(())
}

fn seed_side(builder: &mut ConditionBuilder, seed: &PresetSeed, operator: String) {
    builder.seed_params(vec![("Period".to_string(), seed.period1)]);
    builder.set_operator(operator);
    builder.seed_function(
        seed.function.clone(),
        vec![("Period".to_string(), seed.period2)],
    );
    builder.set_combinator(seed.combinator);
}
