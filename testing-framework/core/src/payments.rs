use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

use crate::error::StressError;

/// In-flight payments keyed by their correlation token.
///
/// A token is inserted when its payment is dispatched and removed the first
/// time a matching arrival is observed, so no token resolves twice.
#[derive(Debug, Default)]
pub struct PaymentTracker {
    pending: HashMap<String, Instant>,
}

impl PaymentTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `token`. An already pending token is never overwritten.
    pub fn record(&mut self, token: impl Into<String>, at: Instant) -> Result<(), StressError> {
        let token = token.into();
        if self.pending.contains_key(&token) {
            return Err(StressError::DuplicateToken { token });
        }
        self.pending.insert(token, at);
        Ok(())
    }

    /// Stops tracking `token` and returns how long it was pending. Unknown
    /// tokens yield `None`.
    pub fn resolve(&mut self, token: &str, observed_at: Instant) -> Option<Duration> {
        self.pending
            .remove(token)
            .map(|dispatched_at| observed_at.saturating_duration_since(dispatched_at))
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.pending.contains_key(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
