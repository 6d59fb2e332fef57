mod runner;

pub use runner::{StressHandle, StressRunner};
