pub mod error;
pub mod ledger;
pub mod payments;
pub mod primitives;
pub mod single_flight;
pub mod stats;

pub use error::{DynError, StressError, panic_message};
pub use ledger::{Network, Payment, Remote, RemoteSet, Txn, Wallet, WalletStore};
pub use payments::PaymentTracker;
pub use primitives::{Amount, AmountParseError, PrivateKey, PublicKey, WalletId};
pub use single_flight::{JobHandle, SingleFlightGuard};
pub use stats::{MetricSummary, StatSample, StatsRecorder};
