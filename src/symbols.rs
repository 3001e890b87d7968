//! Static symbol reference data: lot sizes, exchange routing, and the
//! instrument sets each symbol can trade
//!
//! Read-only and process-wide. Lot sizes drive leg quantity defaults and
//! the quantity step unit.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::Instrument;

static LOT_SIZES: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(|| {
    HashMap::from([
        ("NIFTY", 65),
        ("BANKNIFTY", 30),
        ("RELIANCE", 500),
        ("SBIN", 750),
        ("TATASTEEL", 5500),
    ])
});

/// Lot size for a symbol; unknown symbols trade in units of 1
pub fn lot_size(symbol: &str) -> u32 {
    LOT_SIZES
        .get(symbol.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(1)
}

/// All known symbols with their lot sizes, for listings
pub fn known_symbols() -> Vec<(&'static str, u32)> {
    let mut symbols: Vec<_> = LOT_SIZES.iter().map(|(s, l)| (*s, *l)).collect();
    symbols.sort();
    symbols
}

/// Index derivatives route to NFO; everything else trades cash on NSE
pub fn is_index(symbol: &str) -> bool {
    matches!(symbol.to_ascii_uppercase().as_str(), "NIFTY" | "BANKNIFTY")
}

pub fn exchange(symbol: &str) -> &'static str {
    if is_index(symbol) {
        "NFO"
    } else {
        "NSE"
    }
}

/// Instruments a symbol can trade, default first
pub fn instrument_options(symbol: &str) -> &'static [Instrument] {
    if is_index(symbol) {
        &[Instrument::Ce, Instrument::Pe, Instrument::Fut]
    } else {
        &[Instrument::Eq, Instrument::Fut, Instrument::Ce, Instrument::Pe]
    }
}

/// Default instrument seeded into new legs for this symbol
pub fn default_instrument(symbol: &str) -> Instrument {
    instrument_options(symbol)[0]
}
