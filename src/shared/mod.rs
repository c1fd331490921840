//! Shared utilities and types used across the API and exchange modules.

pub mod decimal;
pub mod params;
pub mod types;

// Re-export commonly used items
pub use decimal::{decimal_from_value, f64_from_value, parse_decimal};
pub use params::Params;
pub use types::*;
