mod memory;

pub use memory::{CallCounts, GENESIS, MemoryLedger, MemoryLedgerError};
