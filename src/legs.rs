//! Trade legs: per-side ordered leg collections with lot-size stepping
//! and mirror derivation for the automatic reverse-entry block

use serde::{Deserialize, Serialize};

use crate::types::{Instrument, PriceType, Side, StrikeOffset};

/// One tradable order making up part of the strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLeg {
    pub id: u64,
    pub side: Side,
    pub instrument: Instrument,
    pub strike: StrikeOffset,
    /// Always a positive multiple of the lot size in effect when stepped
    pub quantity: u32,
    pub price_type: PriceType,
    pub target: f64,
    pub stoploss: f64,
}

impl TradeLeg {
    /// Identical leg with the direction flipped
    pub fn mirrored(&self) -> TradeLeg {
        TradeLeg {
            side: self.side.flipped(),
            ..self.clone()
        }
    }
}

/// Quantity stepper direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

/// Ordered collection of legs for one side.
///
/// The entry set enforces a floor of one leg (a strategy without an entry
/// leg cannot be submitted); the exit set may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLegSet {
    legs: Vec<TradeLeg>,
    lot_size: u32,
    default_side: Side,
    default_instrument: Instrument,
    keep_one: bool,
    next_id: u64,
}

impl TradeLegSet {
    /// Entry-side set, seeded with one default leg
    pub fn entry(lot_size: u32, default_instrument: Instrument) -> Self {
        let mut set = TradeLegSet {
            legs: Vec::new(),
            lot_size: lot_size.max(1),
            default_side: Side::Buy,
            default_instrument,
            keep_one: true,
            next_id: 1,
        };
        set.add();
        set
    }

    /// Exit-side set, initially empty
    pub fn exit(lot_size: u32, default_instrument: Instrument) -> Self {
        TradeLegSet {
            legs: Vec::new(),
            lot_size: lot_size.max(1),
            default_side: Side::Sell,
            default_instrument,
            keep_one: false,
            next_id: 1,
        }
    }

    pub fn legs(&self) -> &[TradeLeg] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn lot_size(&self) -> u32 {
        self.lot_size
    }

    pub fn leg_mut(&mut self, id: u64) -> Option<&mut TradeLeg> {
        self.legs.iter_mut().find(|l| l.id == id)
    }

    /// Append a leg with defaults seeded from the current lot size and
    /// default instrument. Returns its id.
    pub fn add(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.legs.push(TradeLeg {
            id,
            side: self.default_side,
            instrument: self.default_instrument,
            strike: StrikeOffset::Atm,
            quantity: self.lot_size,
            price_type: PriceType::Pts,
            target: 0.0,
            stoploss: 0.0,
        });
        id
    }

    /// Remove by id. A removal that would empty a floor-enforcing set is a
    /// no-op. Returns whether a leg was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        if self.keep_one && self.legs.len() <= 1 {
            return false;
        }
        let before = self.legs.len();
        self.legs.retain(|l| l.id != id);
        self.legs.len() != before
    }

    /// Step a leg's quantity by the current lot size, clamped to one lot
    pub fn adjust_quantity(&mut self, id: u64, direction: StepDirection) -> bool {
        let lot = self.lot_size;
        let Some(leg) = self.leg_mut(id) else {
            return false;
        };
        leg.quantity = match direction {
            StepDirection::Up => leg.quantity.saturating_add(lot),
            StepDirection::Down => leg.quantity.saturating_sub(lot).max(lot),
        };
        true
    }

    /// Snap a requested quantity to the nearest multiple of the current
    /// lot size, floor clamped to one lot
    pub fn snap_quantity(&self, quantity: u32) -> u32 {
        let lot = self.lot_size;
        let lots = (quantity.saturating_add(lot / 2)) / lot;
        lots.max(1).saturating_mul(lot)
    }

    /// Propagate a symbol change: the new lot size becomes the step unit
    /// and default for future legs. When the allowed instrument set changed
    /// structurally (index vs. equity), every leg's instrument is rewritten
    /// to the new default; quantities are left alone and pick up the new
    /// step on the next adjustment.
    pub fn apply_symbol_change(
        &mut self,
        lot_size: u32,
        default_instrument: Instrument,
        rewrite_instruments: bool,
    ) {
        self.lot_size = lot_size.max(1);
        self.default_instrument = default_instrument;
        if rewrite_instruments {
            for leg in &mut self.legs {
                leg.instrument = default_instrument;
            }
        }
    }

    /// Parallel leg list with every direction flipped, used to build the
    /// reverse-entry block of the payload
    pub fn mirror(&self) -> Vec<TradeLeg> {
        self.legs.iter().map(TradeLeg::mirrored).collect()
    }
}
