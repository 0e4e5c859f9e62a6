// Technical indicators
pub mod moving_average;

pub use moving_average::calculate_ema;
