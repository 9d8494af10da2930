//! Data origination
//!
//! The designated origin creates one DATA packet per period. It waits for
//! the gradient to reach it first: an origin without a depth defers and
//! tries again a period later.

use std::time::Duration;

use gradient_core::{DataPacket, Mobility, NodeEnv, NodeId, Packet, Timer, TransportError};
use tracing::{debug, trace, warn};

use crate::config::TimingConfig;
use crate::gradient::GradientState;

/// Result of one `tx_data` callback
#[derive(Debug, Clone, PartialEq)]
pub enum Origination {
    /// A new DATA packet was broadcast
    Sent(DataPacket),
    /// The node has not joined the gradient yet
    Deferred,
    /// The broadcast failed; the sequence number was not consumed
    Failed(TransportError),
}

/// Periodic DATA source
#[derive(Debug, Clone)]
pub struct Originator {
    period: Duration,
    jitter: Duration,
    time_space: Duration,
    next_sequence: u32,
    sent: u64,
}

impl Originator {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            period: timing.period,
            jitter: timing.jitter,
            time_space: timing.time_space,
            next_sequence: 1,
            sent: 0,
        }
    }

    /// Sequence number the next packet will carry
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Packets successfully originated
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Schedule the first origination after `period + U(jitter) + U(time_space)`
    pub fn start<E: NodeEnv>(&self, env: &mut E) {
        let wait = self.period + env.random_delay(self.jitter) + env.random_delay(self.time_space);
        env.schedule(wait, Timer::Data);
    }

    /// Handle a `tx_data` callback
    ///
    /// The next origination is scheduled after `period + U(jitter)` in every
    /// case.
    pub fn tick_origination<E: NodeEnv>(
        &mut self,
        env: &mut E,
        node: NodeId,
        state: &GradientState,
        status: Mobility,
    ) -> Origination {
        let outcome = match state.depth().filter(|_| state.is_active()) {
            None => {
                trace!(node = %node, "Origination deferred, not on gradient");
                Origination::Deferred
            }
            Some(depth) => {
                let packet = DataPacket {
                    source: node,
                    origin: node,
                    sequence: self.next_sequence,
                    depth,
                    origin_position: env.position_of(node),
                    origin_timestamp: env.now(),
                    status,
                };
                match env.broadcast(&Packet::Data(packet.clone())) {
                    Ok(()) => {
                        self.next_sequence = self.next_sequence.wrapping_add(1);
                        self.sent += 1;
                        debug!(node = %node, depth, seq = packet.sequence, "Originated DATA");
                        Origination::Sent(packet)
                    }
                    Err(error) => {
                        warn!(node = %node, error = %error, "Origination abandoned");
                        Origination::Failed(error)
                    }
                }
            }
        };

        let wait = self.period + env.random_delay(self.jitter);
        env.schedule(wait, Timer::Data);
        outcome
    }
}
