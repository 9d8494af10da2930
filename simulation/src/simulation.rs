//! Simulation engine for gradient routing
//!
//! Implements a discrete-event simulation with:
//! - One [`GradientNode`] per deployed node
//! - A shared event queue for scheduled callbacks and frame receptions
//! - A lossy broadcast radio over the deployment's links
//! - Delivery records and per-node reports collected for analysis
//!
//! Every callback runs with the acting node's environment ([`NodeCtx`]) and
//! inside its log context, so per-node state is never looked up globally.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use gradient_core::{
    Clock, ConfigError, DeliveryRecord, Jitter, Locator, NodeId, NodeReport, Packet, Position,
    Scheduler, SimTime, Timer, Transport, TransportError, encode, frame_len, peek_kind,
    uniform_delay,
};
use gradient_logging::NodeContextGuard;
use gradient_routing::{
    ForwardAction, GradientNode, ProtocolConfig, RxOutcome, TxOutcome, format_time, parse_time,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::engine::{Event, EventQueue};
use crate::error::{SimError, SimResult};
use crate::radio::RadioConfig;
use crate::topology::Deployment;

/// Configuration for the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Simulated time covered by [`Simulation::run`]
    #[serde(with = "duration_format")]
    pub duration: Duration,
    /// Seed for jitter, losses and header failures
    pub seed: u64,
    /// Protocol parameters shared by every node
    pub protocol: ProtocolConfig,
    /// Radio model
    pub radio: RadioConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(600),
            seed: 1,
            protocol: ProtocolConfig::default(),
            radio: RadioConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.protocol.validate()?;
        self.radio.validate()
    }
}

mod duration_format {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw)))
    }
}

/// Simulation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub builds_sent: u64,
    pub builds_accepted: u64,
    pub data_originated: u64,
    pub originations_deferred: u64,
    pub forwards: u64,
    /// Every copy delivered at the sink
    pub deliveries: u64,
    /// Distinct `(origin, sequence)` pairs delivered at the sink
    pub unique_deliveries: u64,
    pub duplicates: u64,
    pub buffer_drops: u64,
    pub ignored: u64,
    pub transport_failures: u64,
    pub radio_losses: u64,
    pub malformed_frames: u64,
    pub frames_on_air: u64,
    /// Bytes on air including link header overhead
    pub bytes_on_air: u64,
    /// Sum of end-to-end delivery latencies
    pub total_latency: Duration,
}

impl SimStats {
    /// Fraction of originated packets that reached the sink at least once
    pub fn delivery_ratio(&self) -> f64 {
        if self.data_originated == 0 {
            return 0.0;
        }
        (self.unique_deliveries as f64 / self.data_originated as f64).min(1.0)
    }

    /// Mean end-to-end latency of delivered packets
    pub fn average_latency(&self) -> Option<Duration> {
        let count = u32::try_from(self.deliveries).ok().filter(|c| *c > 0)?;
        Some(self.total_latency / count)
    }

    fn record_tx(&mut self, outcome: &TxOutcome) {
        match outcome {
            TxOutcome::Announced(_) => self.builds_sent += 1,
            TxOutcome::Originated(_) => self.data_originated += 1,
            TxOutcome::Forwarded(_) => self.forwards += 1,
            TxOutcome::Deferred => self.originations_deferred += 1,
            TxOutcome::Failed { .. } => self.transport_failures += 1,
            TxOutcome::Idle => {}
        }
    }

    fn record_rx(&mut self, outcome: &RxOutcome) {
        match outcome {
            RxOutcome::Build(build) => {
                if build.accepted {
                    self.builds_accepted += 1;
                }
            }
            RxOutcome::Data(action) => match action {
                ForwardAction::Deliver(record) => {
                    self.deliveries += 1;
                    self.total_latency += record.latency;
                }
                ForwardAction::Enqueue { .. } => {}
                ForwardAction::DropDuplicateOrStale => self.duplicates += 1,
                ForwardAction::DropBufferFull => self.buffer_drops += 1,
                ForwardAction::Ignore(_) => self.ignored += 1,
            },
        }
    }
}

/// The environment of one node for the duration of one callback
pub struct NodeCtx<'a> {
    node: NodeId,
    now: SimTime,
    queue: &'a mut EventQueue,
    rng: &'a mut StdRng,
    deployment: &'a Deployment,
    radio: &'a RadioConfig,
    stats: &'a mut SimStats,
}

impl Clock for NodeCtx<'_> {
    fn now(&self) -> SimTime {
        self.now
    }
}

impl Scheduler for NodeCtx<'_> {
    fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.queue.push(
            self.now + delay,
            Event::Timer {
                node: self.node,
                timer,
            },
        );
    }
}

impl Jitter for NodeCtx<'_> {
    fn random_delay(&mut self, bound: Duration) -> Duration {
        uniform_delay(&mut *self.rng, bound)
    }
}

impl Transport for NodeCtx<'_> {
    fn broadcast(&mut self, packet: &Packet) -> Result<(), TransportError> {
        let p = self.radio.header_failure_probability;
        if p > 0.0 && self.rng.random::<f64>() < p {
            return Err(TransportError::HeaderRejected(format!(
                "link layer refused {} frame",
                packet.kind()
            )));
        }

        let frame = encode(packet).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let on_air = frame_len(packet, self.header_overhead())
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.stats.frames_on_air += 1;
        self.stats.bytes_on_air += on_air as u64;

        let arrival = self.now + self.radio.propagation_delay;
        let loss = self.radio.loss_probability;
        for neighbor in self.deployment.neighbors(self.node).into_iter().flatten() {
            if loss > 0.0 && self.rng.random::<f64>() < loss {
                self.stats.radio_losses += 1;
                trace!(from = %self.node, to = %neighbor, kind = %packet.kind(), "Frame lost");
                continue;
            }
            self.queue.push(
                arrival,
                Event::Receive {
                    node: *neighbor,
                    frame: frame.clone(),
                },
            );
        }
        Ok(())
    }

    fn header_overhead(&self) -> usize {
        self.radio.header_overhead
    }
}

impl Locator for NodeCtx<'_> {
    fn position_of(&self, node: NodeId) -> Position {
        self.deployment.position(node).unwrap_or_default()
    }
}

/// The simulation state
#[derive(Debug)]
pub struct Simulation {
    /// Node placement and links
    pub deployment: Deployment,
    /// Configuration
    pub config: SimConfig,
    /// Statistics
    pub stats: SimStats,
    /// Every delivery at the sink, in order
    pub deliveries: Vec<DeliveryRecord>,
    delivered: BTreeSet<(NodeId, u32)>,
    nodes: BTreeMap<NodeId, GradientNode>,
    queue: EventQueue,
    now: SimTime,
    rng: StdRng,
    started: bool,
}

impl Simulation {
    /// Create a simulation over `deployment`
    ///
    /// Fails if the configuration is invalid or names a sink or origin that
    /// is not deployed.
    pub fn new(deployment: Deployment, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let protocol = &config.protocol;
        if !deployment.contains(protocol.sink) {
            return Err(SimError::SinkMissing(protocol.sink));
        }
        if let Some(origin) = protocol.origin.filter(|o| !deployment.contains(*o)) {
            return Err(SimError::OriginMissing(origin));
        }

        let nodes = deployment
            .node_ids()
            .into_iter()
            .map(|id| (id, GradientNode::new(id, protocol)))
            .collect();

        Ok(Self {
            deployment,
            stats: SimStats::default(),
            deliveries: Vec::new(),
            delivered: BTreeSet::new(),
            nodes,
            queue: EventQueue::new(),
            now: SimTime::ZERO,
            rng: StdRng::seed_from_u64(config.seed),
            started: false,
            config,
        })
    }

    /// Bootstrap every node; later calls do nothing
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        info!(
            nodes = self.nodes.len(),
            sink = %self.config.protocol.sink,
            seed = self.config.seed,
            "Simulation starting"
        );

        for (id, node) in self.nodes.iter_mut() {
            let _guard = NodeContextGuard::new(*id, node.role());
            let mut ctx = NodeCtx {
                node: *id,
                now: self.now,
                queue: &mut self.queue,
                rng: &mut self.rng,
                deployment: &self.deployment,
                radio: &self.config.radio,
                stats: &mut self.stats,
            };
            node.bootstrap(&mut ctx);
        }
    }

    /// Process the next event; returns false when none is left
    pub fn step(&mut self) -> bool {
        self.start();
        let Some((at, event)) = self.queue.pop() else {
            return false;
        };
        self.now = at;

        let id = event.node();
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!(node = %id, "Event for unknown node");
            return true;
        };
        let _guard = NodeContextGuard::new(id, node.role());
        let mut ctx = NodeCtx {
            node: id,
            now: at,
            queue: &mut self.queue,
            rng: &mut self.rng,
            deployment: &self.deployment,
            radio: &self.config.radio,
            stats: &mut self.stats,
        };

        match event {
            Event::Timer { timer, .. } => {
                trace!(node = %id, %timer, at = %at, "Timer fired");
                let outcome = node.on_timer(&mut ctx, timer);
                self.stats.record_tx(&outcome);
            }
            Event::Receive { frame, .. } => match node.on_frame(&mut ctx, &frame) {
                Ok(outcome) => {
                    self.stats.record_rx(&outcome);
                    if let RxOutcome::Data(ForwardAction::Deliver(record)) = outcome {
                        if self.delivered.insert((record.origin, record.sequence)) {
                            self.stats.unique_deliveries += 1;
                        }
                        self.deliveries.push(record);
                    }
                }
                Err(error) => {
                    self.stats.malformed_frames += 1;
                    warn!(
                        node = %id,
                        kind = ?peek_kind(&frame).ok(),
                        error = %error,
                        "Malformed frame dropped"
                    );
                }
            },
        }
        true
    }

    /// Process every event due at or before `until`
    pub fn run_until(&mut self, until: SimTime) {
        self.start();
        while self.queue.peek_time().is_some_and(|t| t <= until) {
            self.step();
        }
        if until > self.now {
            self.now = until;
        }
    }

    /// Advance simulated time by `duration`
    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now + duration);
    }

    /// Run for the configured duration
    pub fn run(&mut self) {
        self.run_for(self.config.duration);
        info!(at = %self.now, "Simulation complete");
        debug!("Stats: {:?}", self.stats);
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Events waiting in the queue
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&GradientNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GradientNode> {
        self.nodes.values()
    }

    /// Current depth of every node
    pub fn depths(&self) -> BTreeMap<NodeId, Option<u32>> {
        self.nodes
            .iter()
            .map(|(id, node)| (*id, node.gradient().depth()))
            .collect()
    }

    /// Whether every node reachable from the sink has the shortest-path depth
    pub fn gradient_converged(&self) -> bool {
        let depths = self.depths();
        self.deployment
            .hop_distances(self.config.protocol.sink)
            .iter()
            .all(|(id, hops)| depths.get(id).copied().flatten() == Some(*hops))
    }

    /// Per-node terminal counters, logged one line per node
    pub fn teardown(&self) -> Vec<NodeReport> {
        let reports: Vec<NodeReport> = self.nodes.values().map(GradientNode::report).collect();
        for report in &reports {
            info!(
                node = %report.node,
                forwarded = report.packets_forwarded,
                duplicates = report.duplicates,
                "STATS {}",
                report
            );
        }
        reports
    }

    /// One-line summary of the current state
    pub fn state_summary(&self) -> String {
        let joined = self
            .nodes
            .values()
            .filter(|n| n.gradient().is_active())
            .count();
        let queued: usize = self
            .nodes
            .values()
            .map(|n| n.forwarder().buffer().len())
            .sum();
        format!(
            "{}: {}/{} on gradient, {} queued, {} delivered, {} events pending",
            self.now,
            joined,
            self.nodes.len(),
            queued,
            self.stats.deliveries,
            self.queue.len()
        )
    }
}
