//! # Single-flight job dispatch
//!
//! At most one job per key runs at any instant, across threads and across
//! processes sharing the same lock directory.
//!
//! - `lock`: exclusive advisory lock file per key (fs2)
//! - `guard`: dispatch onto a bounded worker pool while the key lock is held

mod guard;
mod lock;

pub use guard::{JobHandle, SingleFlightGuard};
pub use lock::KeyLock;
