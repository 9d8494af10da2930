//! Collaborator traits
//!
//! The protocol core consumes these services but never implements them.
//! Every core operation receives the acting node's environment explicitly,
//! so there is no ambient lookup of per-node state.
//!
//! ## Key Traits
//!
//! - [`Clock`]: Monotonic time
//! - [`Scheduler`]: One-shot delayed callbacks for the acting node
//! - [`Jitter`]: Uniform random delays in `[0, bound)`
//! - [`Transport`]: Best-effort local broadcast
//! - [`Locator`]: Node positions
//!
//! [`NodeEnv`] bundles all five and is blanket-implemented.

use std::time::Duration;

use derive_more::Display;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::identity::{NodeId, Position};
use crate::packet::Packet;
use crate::time::SimTime;

/// Callbacks a node can schedule for itself
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Timer {
    /// Broadcast a BUILD announcement
    #[display("tx_build")]
    Build,
    /// Originate a DATA packet
    #[display("tx_data")]
    Data,
    /// Send the head of the forward buffer
    #[display("tx_forward")]
    Forward,
}

/// Time abstraction
pub trait Clock {
    /// Current instant
    fn now(&self) -> SimTime;
}

/// One-shot callback scheduling
///
/// Once scheduled, a callback always fires; there is no cancellation.
/// Callbacks for one node run in scheduled-time order.
pub trait Scheduler {
    /// Run `timer` on the acting node after `delay`
    fn schedule(&mut self, delay: Duration, timer: Timer);
}

/// Bounded random delay generation
pub trait Jitter {
    /// Uniform delay in `[0, bound)`; zero when `bound` is zero
    fn random_delay(&mut self, bound: Duration) -> Duration;
}

/// Best-effort local broadcast
///
/// No delivery or ordering guarantees. Receivers learn the sender from the
/// packet's `source` field.
pub trait Transport {
    /// Broadcast a packet to all neighbours
    fn broadcast(&mut self, packet: &Packet) -> Result<(), TransportError>;

    /// Bytes the link layer prepends to every frame
    fn header_overhead(&self) -> usize {
        0
    }
}

/// Position service
pub trait Locator {
    /// Current position of a node
    fn position_of(&self, node: NodeId) -> Position;
}

/// Everything a node needs from its hosting environment
pub trait NodeEnv: Clock + Scheduler + Jitter + Transport + Locator {}

impl<T: Clock + Scheduler + Jitter + Transport + Locator> NodeEnv for T {}

/// Draw a uniform delay in `[0, bound)` from `rng`
///
/// Shared by the environments that implement [`Jitter`].
pub fn uniform_delay<R: Rng + ?Sized>(rng: &mut R, bound: Duration) -> Duration {
    let bound = u64::try_from(bound.as_nanos()).unwrap_or(u64::MAX);
    if bound == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rng.random_range(0..bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_uniform_delay_within_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        for bound_ms in [1u64, 50, 500, 1000] {
            let bound = Duration::from_millis(bound_ms);
            for _ in 0..1_000 {
                let d = uniform_delay(&mut rng, bound);
                assert!(d < bound, "{:?} not below {:?}", d, bound);
            }
        }
    }

    #[test]
    fn test_uniform_delay_zero_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(uniform_delay(&mut rng, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_timer_display() {
        assert_eq!(Timer::Build.to_string(), "tx_build");
        assert_eq!(Timer::Data.to_string(), "tx_data");
        assert_eq!(Timer::Forward.to_string(), "tx_forward");
    }
}
