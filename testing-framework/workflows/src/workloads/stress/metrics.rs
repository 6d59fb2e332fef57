//! Metric names recorded by the stress cycle.

/// Seconds one full cycle took.
pub const CYCLE: &str = "cycle";
/// One sample per cycle that failed or panicked.
pub const CYCLE_ERROR: &str = "cycle-error";
/// Amount of each dispatched payment, in units.
pub const PAID: &str = "paid";
/// Seconds between dispatch and observed arrival of a payment.
pub const ARRIVED: &str = "arrived";
/// Payments whose sender push failed. Their token stays pending and only
/// resolves if the payment reaches the network some other way.
pub const UNPUSHED: &str = "unpushed";
pub const CREATED: &str = "created";
pub const REMOVED: &str = "removed";

/// Network operations timed individually.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Pull,
    Push,
    Pay,
}

impl Op {
    /// Metric holding the duration of successful calls, in seconds.
    #[must_use]
    pub const fn metric(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Pay => "pay",
        }
    }

    /// Metric receiving a `1` for every failed call.
    #[must_use]
    pub const fn error_metric(self) -> &'static str {
        match self {
            Self::Pull => "pull-error",
            Self::Push => "push-error",
            Self::Pay => "pay-error",
        }
    }
}
