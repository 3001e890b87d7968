//! CLI command implementations

pub mod indicator;
pub mod presets;
pub mod submit;
