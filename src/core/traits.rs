//! Core traits for durable storage and time
//!
//! These abstractions let the engines run against a file-backed journal and
//! the system clock in production, and against in-memory doubles in tests.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::BankResult;

/// Append-only log of committed units of work
///
/// An event must be fully written before `append` returns `Ok`. Callers append
/// while holding the locks of the entities the event describes and only then
/// publish the new state, so a failed append leaves no visible effect.
pub trait Journal<E>: Send + Sync {
    /// Durably record one event
    fn append(&self, event: &E) -> BankResult<()>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for daily limits
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
