//! Per-node protocol driver
//!
//! [`GradientNode`] owns everything one node knows: its gradient state, its
//! sequence cache and forward buffer, its origination schedule, and its
//! counters. It is driven entirely from outside. The host calls
//! [`GradientNode::on_timer`] when a scheduled callback fires and
//! [`GradientNode::on_receive`] when a packet arrives, passing the node's
//! environment each time.

use std::time::Duration;

use gradient_core::{
    BuildPacket, CodecError, DataPacket, Mobility, NodeEnv, NodeId, NodeReport, Packet, Role,
    Timer, TransportError, decode,
};
use tracing::{debug, info, trace, warn};

use crate::config::ProtocolConfig;
use crate::forwarding::{DrainOutcome, ForwardAction, Forwarder};
use crate::gradient::{BuildOutcome, GradientState};
use crate::origination::{Origination, Originator};

/// What a fired callback did
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// A BUILD announcement went out
    Announced(BuildPacket),
    /// A new DATA packet was originated
    Originated(DataPacket),
    /// The head of the forward buffer was relayed
    Forwarded(DataPacket),
    /// Origination postponed until the node joins the gradient
    Deferred,
    /// Nothing to send
    Idle,
    /// The send was abandoned
    Failed { timer: Timer, error: TransportError },
}

impl TxOutcome {
    /// The packet put on the air, if any
    pub fn packet(&self) -> Option<Packet> {
        match self {
            Self::Announced(p) => Some(Packet::Build(p.clone())),
            Self::Originated(p) | Self::Forwarded(p) => Some(Packet::Data(p.clone())),
            _ => None,
        }
    }
}

/// What a received packet did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxOutcome {
    Build(BuildOutcome),
    Data(ForwardAction),
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    received: u64,
    dropped: u64,
    forwarded: u64,
    duplicates: u64,
}

/// One node running the gradient protocol
#[derive(Debug, Clone)]
pub struct GradientNode {
    id: NodeId,
    status: Mobility,
    delay: Duration,
    heartbeat: Duration,
    gradient: GradientState,
    forwarder: Forwarder,
    originator: Option<Originator>,
    counters: Counters,
}

impl GradientNode {
    /// Create the node `id` as configured
    ///
    /// The role and whether the node originates data follow from the
    /// configured sink and origin identities.
    pub fn new(id: NodeId, config: &ProtocolConfig) -> Self {
        let timing = &config.timing;
        Self {
            id,
            status: Mobility::Static,
            delay: timing.delay,
            heartbeat: timing.heartbeat_interval(),
            gradient: GradientState::for_role(config.role_of(id)),
            forwarder: Forwarder::new(
                config.sequence_capacity,
                config.buffer_capacity,
                timing.delay,
                timing.jitter,
            ),
            originator: config.is_origin(id).then(|| Originator::new(timing)),
            counters: Counters::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.gradient.role()
    }

    pub fn gradient(&self) -> &GradientState {
        &self.gradient
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Whether this node originates DATA
    pub fn is_origin(&self) -> bool {
        self.originator.is_some()
    }

    /// Mobility status stamped into outgoing headers
    pub fn set_mobility(&mut self, status: Mobility) {
        self.status = status;
    }

    /// Schedule the node's first callbacks
    ///
    /// The sink announces immediately. The origin starts after one period
    /// plus random spread. Everyone else waits to hear something.
    pub fn bootstrap<E: NodeEnv>(&mut self, env: &mut E) {
        if self.role() == Role::Sink && self.gradient.claim_announce() {
            env.schedule(Duration::ZERO, Timer::Build);
        }
        if let Some(originator) = &self.originator {
            originator.start(env);
        }
        trace!(node = %self.id, role = %self.role(), "Bootstrapped");
    }

    /// Handle a fired callback
    pub fn on_timer<E: NodeEnv>(&mut self, env: &mut E, timer: Timer) -> TxOutcome {
        match timer {
            Timer::Build => self.tx_build(env),
            Timer::Data => self.tx_data(env),
            Timer::Forward => self.tx_forward(env),
        }
    }

    fn tx_build<E: NodeEnv>(&mut self, env: &mut E) -> TxOutcome {
        let position = env.position_of(self.id);
        let Some(packet) = self
            .gradient
            .announcement(self.id, position, env.now(), self.status)
        else {
            return TxOutcome::Idle;
        };

        let result = env.broadcast(&Packet::Build(packet.clone()));

        if self.role() == Role::Sink {
            if result.is_ok() {
                self.gradient.advance_generation();
            }
            // Heartbeat: the latch stays set until the next announcement
            self.gradient.claim_announce();
            env.schedule(self.heartbeat, Timer::Build);
        }

        match result {
            Ok(()) => {
                debug!(
                    node = %self.id,
                    depth = packet.depth,
                    seq = packet.sequence,
                    "Announced BUILD"
                );
                TxOutcome::Announced(packet)
            }
            Err(error) => {
                warn!(node = %self.id, error = %error, "Announcement abandoned");
                TxOutcome::Failed {
                    timer: Timer::Build,
                    error,
                }
            }
        }
    }

    fn tx_data<E: NodeEnv>(&mut self, env: &mut E) -> TxOutcome {
        let Some(originator) = self.originator.as_mut() else {
            return TxOutcome::Idle;
        };
        match originator.tick_origination(env, self.id, &self.gradient, self.status) {
            Origination::Sent(packet) => TxOutcome::Originated(packet),
            Origination::Deferred => TxOutcome::Deferred,
            Origination::Failed(error) => TxOutcome::Failed {
                timer: Timer::Data,
                error,
            },
        }
    }

    fn tx_forward<E: NodeEnv>(&mut self, env: &mut E) -> TxOutcome {
        match self
            .forwarder
            .drain(env, self.id, &self.gradient, self.status)
        {
            DrainOutcome::Sent(packet) => {
                self.counters.forwarded += 1;
                TxOutcome::Forwarded(packet)
            }
            DrainOutcome::Failed(error) => TxOutcome::Failed {
                timer: Timer::Forward,
                error,
            },
            DrainOutcome::Empty => TxOutcome::Idle,
        }
    }

    /// Handle a packet heard from a neighbour
    pub fn on_receive<E: NodeEnv>(&mut self, env: &mut E, packet: &Packet) -> RxOutcome {
        match packet {
            Packet::Build(build) => RxOutcome::Build(self.on_build(env, build)),
            Packet::Data(data) => RxOutcome::Data(self.on_data(env, data)),
        }
    }

    /// Decode a wire frame and handle the packet inside
    pub fn on_frame<E: NodeEnv>(
        &mut self,
        env: &mut E,
        frame: &[u8],
    ) -> Result<RxOutcome, CodecError> {
        let packet = decode(frame)?;
        Ok(self.on_receive(env, &packet))
    }

    fn on_build<E: NodeEnv>(&mut self, env: &mut E, packet: &BuildPacket) -> BuildOutcome {
        let outcome = self.gradient.on_build_received(packet);
        if outcome.accepted {
            debug!(
                node = %self.id,
                depth = ?self.gradient.depth(),
                seq = packet.sequence,
                parent = %packet.source,
                "Accepted BUILD"
            );
        }
        if outcome.should_announce {
            let wait = env.random_delay(self.delay);
            env.schedule(wait, Timer::Build);
        }
        outcome
    }

    fn on_data<E: NodeEnv>(&mut self, env: &mut E, packet: &DataPacket) -> ForwardAction {
        let action = self
            .forwarder
            .on_data_received(&self.gradient, packet, env.now());

        match &action {
            ForwardAction::Deliver(record) => {
                self.counters.received += 1;
                info!(
                    node = %self.id,
                    origin = %record.origin,
                    latency_us = u64::try_from(record.latency.as_micros()).unwrap_or(u64::MAX),
                    seq = record.sequence,
                    last_hop = %record.last_hop,
                    "Delivered DATA"
                );
            }
            ForwardAction::Enqueue { schedule_drain } => {
                self.counters.received += 1;
                if *schedule_drain {
                    self.forwarder.schedule_first_drain(env);
                }
                trace!(
                    node = %self.id,
                    seq = packet.sequence,
                    queued = self.forwarder.buffer().len(),
                    "Queued DATA"
                );
            }
            ForwardAction::DropDuplicateOrStale => {
                self.counters.duplicates += 1;
                trace!(node = %self.id, seq = packet.sequence, "Duplicate DATA");
            }
            ForwardAction::DropBufferFull => {
                self.counters.dropped += 1;
                debug!(node = %self.id, seq = packet.sequence, "Forward buffer full, dropped");
            }
            ForwardAction::Ignore(reason) => {
                trace!(node = %self.id, seq = packet.sequence, %reason, "Ignored DATA");
            }
        }
        action
    }

    /// Terminal counters
    pub fn report(&self) -> NodeReport {
        NodeReport {
            node: self.id,
            depth: self.gradient.depth(),
            packets_sent: self.originator.as_ref().map_or(0, Originator::sent),
            packets_received: self.counters.received,
            packets_dropped: self.counters.dropped,
            packets_forwarded: self.counters.forwarded,
            duplicates: self.counters.duplicates,
        }
    }
}
