pub mod constants;
pub mod stress;

pub use stress::{ConfigError, StressConfig};
