// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Optional lifecycle inspection for operators.

/// Coarse lifecycle of an operator's subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Created, no upstream subscription received yet
    Idle,
    /// Subscribed and able to deliver signals
    Active,
    /// A terminal signal has been delivered downstream
    Terminated,
    /// The downstream cancelled
    Cancelled,
}

impl Lifecycle {
    /// Returns `true` once no further signal will be delivered downstream.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Terminated | Self::Cancelled)
    }
}

/// Read-only view on an operator's state, for debugging and tests.
///
/// Observations are racy snapshots: by the time the caller looks at the result,
/// a concurrent signal may already have moved the operator on.
pub trait Introspect {
    /// Short operator name, e.g. `"skip_while"`.
    fn name(&self) -> &'static str;

    /// Current lifecycle stage.
    fn lifecycle(&self) -> Lifecycle;

    /// Outstanding demand tracked by the operator, if it tracks any.
    fn requested(&self) -> Option<u64> {
        None
    }
}
