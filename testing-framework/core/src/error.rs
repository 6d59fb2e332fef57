use std::{any::Any, io, path::PathBuf};

use thiserror::Error;

use crate::primitives::Amount;

/// Error type used at collaborator boundaries (stores, networks, jobs).
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StressError {
    #[error("invalid stress configuration: {0}")]
    Config(String),
    #[error("too few wallets in the pool to pay: {available} available, at least {required} required")]
    TooFewWallets { available: usize, required: usize },
    #[error("no wallet in the pool could send {amount} after trying {tried} senders")]
    NoFundedSender { amount: Amount, tried: usize },
    #[error("a job for key `{key}` is already running")]
    DuplicateJob { key: String },
    #[error("payment token `{token}` is already pending")]
    DuplicateToken { token: String },
    #[error("job key `{key}` is not a valid lock name")]
    InvalidKey { key: String },
    #[error("lock file {} is not usable: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("wallet store `{op}` failed: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: DynError,
    },
}

impl StressError {
    #[must_use]
    pub fn store(op: &'static str) -> impl FnOnce(DynError) -> Self {
        move |source| Self::Store { op, source }
    }
}

/// Attempts to turn a panic payload into a readable string for diagnostics.
#[must_use]
pub fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic.downcast::<String>().map_or_else(
        |panic| {
            panic.downcast::<&'static str>().map_or_else(
                |_| "unknown panic".to_owned(),
                |message| (*message).to_owned(),
            )
        },
        |message| *message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_static_and_owned_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "unknown panic");
    }

    #[test]
    fn too_few_wallets_is_descriptive() {
        let err = StressError::TooFewWallets {
            available: 1,
            required: 2,
        };
        assert!(err.to_string().contains("too few wallets"));
    }
}
