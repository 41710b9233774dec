//! Injected dependencies.
//!
//! Time is abstracted behind [`Clock`] so that pricing tiers, expiry and
//! transition timestamps are deterministic under test.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
