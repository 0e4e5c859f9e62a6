// Signal detection and confirmation
pub mod confirmation;
pub mod trend;

pub use confirmation::{confirm, Confirmation};
pub use trend::TrendDetector;
