pub mod runtime;
pub mod status;
pub mod workloads;

pub use runtime::{StressHandle, StressRunner};
pub use status::{CycleState, StatusMonitor, StressStatus, ThreadState};
pub use workloads::stress::{StressCycle, metrics};
