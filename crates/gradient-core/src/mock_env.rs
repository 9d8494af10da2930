//! Recording environment for testing
//!
//! [`MockEnv`] implements every collaborator trait in memory. It records
//! scheduled callbacks, broadcast packets, and random draws so tests can
//! drive a single node step by step and inspect what it did.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use gradient_core::{MockEnv, NodeId, Scheduler, Timer};
//!
//! let mut env = MockEnv::new(NodeId(3));
//! env.schedule(Duration::from_millis(20), Timer::Forward);
//!
//! let (at, timer) = env.fire_next().unwrap();
//! assert_eq!(timer, Timer::Forward);
//! assert_eq!(at.as_duration(), Duration::from_millis(20));
//! ```

use std::collections::HashMap;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::TransportError;
use crate::identity::{NodeId, Position};
use crate::packet::Packet;
use crate::time::SimTime;
use crate::traits::{Clock, Jitter, Locator, Scheduler, Timer, Transport, uniform_delay};

/// How [`MockEnv`] answers random delay requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JitterMode {
    /// Always zero
    Zero,
    /// Fixed fraction of the bound, clamped below it
    Fraction(f64),
    /// Seeded uniform draws
    Seeded(u64),
}

/// A callback recorded by [`MockEnv`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    /// When it was requested
    pub scheduled_at: SimTime,
    /// Requested delay
    pub delay: Duration,
    /// When it fires
    pub fires_at: SimTime,
    pub timer: Timer,
    /// Insertion order, used to break ties
    seq: u64,
}

/// A random delay handed out by [`MockEnv`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterDraw {
    pub bound: Duration,
    pub value: Duration,
}

/// In-memory environment for driving one node
#[derive(Debug)]
pub struct MockEnv {
    node: NodeId,
    now: SimTime,
    jitter: JitterMode,
    rng: StdRng,
    pending: Vec<ScheduledTimer>,
    next_seq: u64,
    positions: HashMap<NodeId, Position>,
    failures_remaining: usize,
    /// Every packet successfully broadcast, in order
    pub sent: Vec<Packet>,
    /// Every random delay handed out, in order
    pub draws: Vec<JitterDraw>,
    /// Every callback ever scheduled, in order
    pub scheduled: Vec<ScheduledTimer>,
    /// Broadcasts that were rejected
    pub failed_sends: usize,
}

impl MockEnv {
    /// Create an environment acting on behalf of `node`
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            now: SimTime::ZERO,
            jitter: JitterMode::Zero,
            rng: StdRng::seed_from_u64(0),
            pending: Vec::new(),
            next_seq: 0,
            positions: HashMap::new(),
            failures_remaining: 0,
            sent: Vec::new(),
            draws: Vec::new(),
            scheduled: Vec::new(),
            failed_sends: 0,
        }
    }

    /// Set how random delays are answered
    pub fn with_jitter(mut self, mode: JitterMode) -> Self {
        if let JitterMode::Seeded(seed) = mode {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.jitter = mode;
        self
    }

    /// Set a node's position
    pub fn with_position(mut self, node: NodeId, position: Position) -> Self {
        self.positions.insert(node, position);
        self
    }

    /// The node this environment acts for
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Make the next `count` broadcasts fail
    pub fn fail_next_broadcasts(&mut self, count: usize) {
        self.failures_remaining = count;
    }

    /// Move the clock forward without firing callbacks
    pub fn advance(&mut self, by: Duration) {
        self.now = self.now + by;
    }

    /// Callbacks scheduled but not yet fired, earliest first
    pub fn pending(&self) -> Vec<ScheduledTimer> {
        let mut pending = self.pending.clone();
        pending.sort_by_key(|t| (t.fires_at, t.seq));
        pending
    }

    /// Number of pending callbacks of one kind
    pub fn pending_count(&self, timer: Timer) -> usize {
        self.pending.iter().filter(|t| t.timer == timer).count()
    }

    /// Pop the earliest pending callback and move the clock to it
    pub fn fire_next(&mut self) -> Option<(SimTime, Timer)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.fires_at, t.seq))
            .map(|(idx, _)| idx)?;
        let entry = self.pending.remove(idx);
        if entry.fires_at > self.now {
            self.now = entry.fires_at;
        }
        Some((self.now, entry.timer))
    }

    /// Take and clear the recorded broadcasts
    pub fn take_sent(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.sent)
    }
}

impl Clock for MockEnv {
    fn now(&self) -> SimTime {
        self.now
    }
}

impl Scheduler for MockEnv {
    fn schedule(&mut self, delay: Duration, timer: Timer) {
        let entry = ScheduledTimer {
            scheduled_at: self.now,
            delay,
            fires_at: self.now + delay,
            timer,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.push(entry);
        self.scheduled.push(entry);
    }
}

impl Jitter for MockEnv {
    fn random_delay(&mut self, bound: Duration) -> Duration {
        let value = match self.jitter {
            JitterMode::Zero => Duration::ZERO,
            JitterMode::Fraction(f) => {
                if bound.is_zero() {
                    Duration::ZERO
                } else {
                    bound
                        .mul_f64(f.clamp(0.0, 1.0))
                        .min(bound - Duration::from_nanos(1))
                }
            }
            JitterMode::Seeded(_) => uniform_delay(&mut self.rng, bound),
        };
        self.draws.push(JitterDraw { bound, value });
        value
    }
}

impl Transport for MockEnv {
    fn broadcast(&mut self, packet: &Packet) -> Result<(), TransportError> {
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            self.failed_sends += 1;
            return Err(TransportError::HeaderRejected("mock failure".into()));
        }
        self.sent.push(packet.clone());
        Ok(())
    }
}

impl Locator for MockEnv {
    fn position_of(&self, node: NodeId) -> Position {
        self.positions.get(&node).copied().unwrap_or_default()
    }
}
