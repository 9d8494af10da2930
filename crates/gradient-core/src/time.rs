//! Simulated time
//!
//! [`SimTime`] is a monotonic instant measured in nanoseconds since the
//! start of a run. It is what packets carry as their origination stamp and
//! what latency is computed from.

use std::ops::Add;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Monotonic instant, nanoseconds since the start of a run
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of a run
    pub const ZERO: SimTime = SimTime(0);

    /// Create an instant from nanoseconds since start
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create an instant from a duration since start
    pub fn from_duration(since_start: Duration) -> Self {
        Self(u64::try_from(since_start.as_nanos()).unwrap_or(u64::MAX))
    }

    /// Nanoseconds since start
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Elapsed time since start
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.0)
    }

    /// Time elapsed since an earlier instant, zero if `earlier` is later
    pub fn saturating_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        let rhs = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);
        SimTime(self.0.saturating_add(rhs))
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_duration().as_secs_f64())
    }
}
