//! Strategy Composer
//!
//! Compose algorithmic trading strategies - entry/exit technical
//! conditions, trade legs, scheduling, and risk parameters - and submit
//! them to a remote backtesting engine as a structured request.

pub mod api;
pub mod composer;
pub mod condition;
pub mod config;
pub mod legs;
pub mod metadata;
pub mod payload;
pub mod preset;
pub mod symbols;
pub mod types;

pub use composer::{StrategyComposer, StrategySide};
pub use config::Config;
pub use types::*;
