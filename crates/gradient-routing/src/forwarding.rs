//! DATA forwarding logic
//!
//! Every received DATA packet is classified by [`Forwarder::on_data_received`].
//! The rules are evaluated in order:
//!
//! 1. **IGNORE**: the receiver has not joined the gradient
//! 2. **IGNORE**: the sender is not farther from the sink than the receiver
//! 3. **DROP**: the sequence number is already in the cache
//! 4. **DELIVER**: the receiver is the sink; every copy is delivered and
//!    the cache is left untouched
//! 5. **DROP**: the forward buffer is full
//! 6. **ENQUEUE**: append to the forward buffer and remember the sequence
//!
//! Rule 2 means packets only move toward strictly smaller depth, so the
//! relay graph is acyclic.
//!
//! The buffer drains one record per `tx_forward` callback. The first drain
//! is scheduled when a record lands in an empty buffer; each drain schedules
//! the next while records remain.

use std::time::Duration;

use gradient_core::{
    DataPacket, DeliveryRecord, IgnoreReason, Mobility, NodeEnv, NodeId, Packet, Role, SimTime,
    Timer, TransportError,
};
use tracing::{debug, trace, warn};

use crate::buffer::{ForwardBuffer, ForwardRecord};
use crate::gradient::GradientState;
use crate::seqcache::SequenceCache;

/// Decision taken for one received DATA packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardAction {
    /// Reached the sink
    Deliver(DeliveryRecord),
    /// Queued for relay; `schedule_drain` is set when the buffer was empty
    Enqueue { schedule_drain: bool },
    /// Sequence number already seen
    DropDuplicateOrStale,
    /// Forward buffer at capacity
    DropBufferFull,
    /// Not for this node
    Ignore(IgnoreReason),
}

impl ForwardAction {
    /// Whether the packet was taken in (enqueued or delivered)
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Deliver(_) | Self::Enqueue { .. })
    }
}

/// Result of one `tx_forward` callback
#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    /// The head record was rebroadcast
    Sent(DataPacket),
    /// The head record was removed but the broadcast failed
    Failed(TransportError),
    /// Nothing to send
    Empty,
}

/// Sequence cache and forward buffer of one node
#[derive(Debug, Clone)]
pub struct Forwarder {
    cache: SequenceCache,
    buffer: ForwardBuffer,
    /// Upper bound of the delay before the first drain
    delay: Duration,
    /// Upper bound of the delay between consecutive drains
    jitter: Duration,
}

impl Forwarder {
    /// Create a forwarder with the given capacities and drain delays
    pub fn new(
        sequence_capacity: usize,
        buffer_capacity: usize,
        delay: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            cache: SequenceCache::new(sequence_capacity),
            buffer: ForwardBuffer::new(buffer_capacity),
            delay,
            jitter,
        }
    }

    pub fn cache(&self) -> &SequenceCache {
        &self.cache
    }

    pub fn buffer(&self) -> &ForwardBuffer {
        &self.buffer
    }

    /// Classify a received DATA packet and update cache and buffer
    ///
    /// Does not schedule anything; an `Enqueue { schedule_drain: true }`
    /// must be followed by [`Forwarder::schedule_first_drain`].
    pub fn on_data_received(
        &mut self,
        state: &GradientState,
        packet: &DataPacket,
        now: SimTime,
    ) -> ForwardAction {
        let depth = match state.depth() {
            Some(depth) if state.is_active() => depth,
            _ => return ForwardAction::Ignore(IgnoreReason::Inactive),
        };

        if packet.depth <= depth {
            return ForwardAction::Ignore(IgnoreReason::NoProgress);
        }

        if self.cache.contains(packet.sequence) {
            return ForwardAction::DropDuplicateOrStale;
        }

        if state.role() == Role::Sink {
            return ForwardAction::Deliver(DeliveryRecord {
                origin: packet.origin,
                latency: now.saturating_since(packet.origin_timestamp),
                sequence: packet.sequence,
                last_hop: packet.source,
                delivered_at: now,
            });
        }

        match self.buffer.push(ForwardRecord::from(packet)) {
            Ok(enqueued) => {
                self.cache.insert(packet.sequence);
                ForwardAction::Enqueue {
                    schedule_drain: enqueued.was_empty,
                }
            }
            Err(_) => ForwardAction::DropBufferFull,
        }
    }

    /// Schedule the first drain after a random delay in `[0, delay)`
    pub fn schedule_first_drain<E: NodeEnv>(&self, env: &mut E) {
        let wait = env.random_delay(self.delay);
        env.schedule(wait, Timer::Forward);
    }

    /// Handle a `tx_forward` callback: rebroadcast the head record
    ///
    /// Only `source` and `depth` are rewritten. If records remain, the next
    /// drain is scheduled after a random delay in `[0, jitter)`, whether or
    /// not this broadcast succeeded.
    pub fn drain<E: NodeEnv>(
        &mut self,
        env: &mut E,
        node: NodeId,
        state: &GradientState,
        status: Mobility,
    ) -> DrainOutcome {
        let Some(record) = self.buffer.pop() else {
            trace!(node = %node, "Drain fired on empty buffer");
            return DrainOutcome::Empty;
        };

        if !self.buffer.is_empty() {
            let wait = env.random_delay(self.jitter);
            env.schedule(wait, Timer::Forward);
        }

        // Records are only queued while the node has a depth
        let Some(depth) = state.depth() else {
            warn!(
                node = %node,
                seq = record.sequence,
                "Forward buffer non-empty without a depth, record discarded"
            );
            return DrainOutcome::Empty;
        };
        let packet = record.to_packet(node, depth, status);
        match env.broadcast(&Packet::Data(packet.clone())) {
            Ok(()) => {
                debug!(
                    node = %node,
                    depth,
                    origin = %packet.origin,
                    seq = packet.sequence,
                    queued = self.buffer.len(),
                    "Forwarded DATA"
                );
                DrainOutcome::Sent(packet)
            }
            Err(error) => {
                warn!(
                    node = %node,
                    seq = packet.sequence,
                    error = %error,
                    "Forward abandoned"
                );
                DrainOutcome::Failed(error)
            }
        }
    }
}
