//! Real-time driver
//!
//! Runs every node of a deployment as its own tokio task. Frames travel over
//! unbounded channels, one inbox per node, and scheduled callbacks fire on
//! the tokio clock. The protocol code is the same [`GradientNode`] the
//! discrete-event simulator drives; only the environment differs.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::Arc;
use std::time::Duration;

use gradient_core::{
    Clock, DeliveryRecord, Jitter, Locator, NodeId, NodeReport, Packet, Position, Scheduler,
    SimTime, Timer, Transport, TransportError, encode, uniform_delay,
};
use gradient_logging::NodeContextGuard;
use gradient_routing::{ForwardAction, GradientNode, RxOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{SimError, SimResult};
use crate::radio::RadioConfig;
use crate::simulation::SimConfig;
use crate::topology::Deployment;

type Frame = Vec<u8>;

/// Everything collected from a finished live run
#[derive(Debug, Clone, Default)]
pub struct LiveReport {
    /// Terminal counters, one per node, in id order
    pub reports: Vec<NodeReport>,
    /// Deliveries at the sink, in arrival order
    pub deliveries: Vec<DeliveryRecord>,
    /// Bytes handed to the radio, link headers included
    pub bytes_on_air: u64,
}

impl LiveReport {
    pub fn report_for(&self, node: NodeId) -> Option<&NodeReport> {
        self.reports.iter().find(|r| r.node == node)
    }
}

/// Environment of one node task
struct LiveEnv {
    node: NodeId,
    epoch: Instant,
    timers: BinaryHeap<Reverse<(Instant, u64, Timer)>>,
    next_timer: u64,
    rng: StdRng,
    neighbors: Vec<(NodeId, mpsc::UnboundedSender<Frame>)>,
    positions: Arc<BTreeMap<NodeId, Position>>,
    radio: RadioConfig,
    bytes_on_air: u64,
}

impl LiveEnv {
    fn next_deadline(&self) -> Option<Instant> {
        self.timers.peek().map(|Reverse((at, _, _))| *at)
    }

    fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        match self.timers.peek() {
            Some(Reverse((at, _, _))) if *at <= now => {
                self.timers.pop().map(|Reverse((_, _, timer))| timer)
            }
            _ => None,
        }
    }
}

impl Clock for LiveEnv {
    fn now(&self) -> SimTime {
        SimTime::from_duration(Instant::now().saturating_duration_since(self.epoch))
    }
}

impl Scheduler for LiveEnv {
    fn schedule(&mut self, delay: Duration, timer: Timer) {
        let seq = self.next_timer;
        self.next_timer += 1;
        self.timers.push(Reverse((Instant::now() + delay, seq, timer)));
    }
}

impl Jitter for LiveEnv {
    fn random_delay(&mut self, bound: Duration) -> Duration {
        uniform_delay(&mut self.rng, bound)
    }
}

impl Transport for LiveEnv {
    fn broadcast(&mut self, packet: &Packet) -> Result<(), TransportError> {
        let p = self.radio.header_failure_probability;
        if p > 0.0 && self.rng.random::<f64>() < p {
            return Err(TransportError::HeaderRejected(format!(
                "link layer refused {} frame",
                packet.kind()
            )));
        }
        let frame = encode(packet).map_err(|e| TransportError::SendFailed(e.to_string()))?;

        if !self.neighbors.is_empty() && self.neighbors.iter().all(|(_, o)| o.is_closed()) {
            return Err(TransportError::MediumClosed);
        }
        self.bytes_on_air += (frame.len() + self.header_overhead()) as u64;

        let loss = self.radio.loss_probability;
        for (neighbor, outbox) in &self.neighbors {
            if loss > 0.0 && self.rng.random::<f64>() < loss {
                trace!(from = %self.node, to = %neighbor, "Frame lost");
                continue;
            }
            // A neighbour that already stopped simply misses the frame
            let _ = outbox.send(frame.clone());
        }
        Ok(())
    }

    fn header_overhead(&self) -> usize {
        self.radio.header_overhead
    }
}

impl Locator for LiveEnv {
    fn position_of(&self, node: NodeId) -> Position {
        self.positions.get(&node).copied().unwrap_or_default()
    }
}

/// What a node task hands back when it stops
struct NodeOutcome {
    report: NodeReport,
    deliveries: Vec<DeliveryRecord>,
    bytes_on_air: u64,
}

/// One node running on the tokio runtime
struct NodeTask {
    node: GradientNode,
    env: LiveEnv,
    inbox: mpsc::UnboundedReceiver<Frame>,
    shutdown_rx: broadcast::Receiver<()>,
    deliveries: Vec<DeliveryRecord>,
}

impl NodeTask {
    fn spawn(self) -> JoinHandle<NodeOutcome> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> NodeOutcome {
        let id = self.node.id();
        let role = self.node.role();
        {
            let _guard = NodeContextGuard::new(id, role);
            self.node.bootstrap(&mut self.env);
        }
        debug!(node = %id, %role, "Node task started");

        loop {
            let deadline = self.env.next_deadline();
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    debug!(node = %id, "Node task shutting down");
                    break;
                }
                Some(frame) = self.inbox.recv() => {
                    let _guard = NodeContextGuard::new(id, role);
                    self.handle_frame(&frame);
                }
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    let _guard = NodeContextGuard::new(id, role);
                    let now = Instant::now();
                    while let Some(timer) = self.env.pop_due(now) {
                        self.node.on_timer(&mut self.env, timer);
                    }
                }
            }
        }

        NodeOutcome {
            report: self.node.report(),
            deliveries: self.deliveries,
            bytes_on_air: self.env.bytes_on_air,
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        match self.node.on_frame(&mut self.env, frame) {
            Ok(RxOutcome::Data(ForwardAction::Deliver(record))) => self.deliveries.push(record),
            Ok(_) => {}
            Err(error) => warn!(node = %self.node.id(), error = %error, "Malformed frame dropped"),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    if let Some(at) = deadline {
        tokio::time::sleep_until(at).await;
    }
}

/// Run `deployment` in real time for `duration`
///
/// Each node gets its own task and a jitter source seeded from the
/// configured seed and its id. Radio losses and header failures follow the
/// configured radio; propagation is immediate.
pub async fn run_live(
    deployment: &Deployment,
    config: &SimConfig,
    duration: Duration,
) -> SimResult<LiveReport> {
    config.validate()?;
    let protocol = &config.protocol;
    if !deployment.contains(protocol.sink) {
        return Err(SimError::SinkMissing(protocol.sink));
    }
    if let Some(origin) = protocol.origin.filter(|o| !deployment.contains(*o)) {
        return Err(SimError::OriginMissing(origin));
    }

    let ids = deployment.node_ids();
    let positions: Arc<BTreeMap<NodeId, Position>> = Arc::new(
        ids.iter()
            .map(|id| (*id, deployment.position(*id).unwrap_or_default()))
            .collect(),
    );

    let mut outboxes = BTreeMap::new();
    let mut inboxes = BTreeMap::new();
    for id in &ids {
        let (tx, rx) = mpsc::unbounded_channel();
        outboxes.insert(*id, tx);
        inboxes.insert(*id, rx);
    }

    let (shutdown_tx, _) = broadcast::channel(1);
    let epoch = Instant::now();
    let mut handles = Vec::with_capacity(ids.len());

    for id in &ids {
        let Some(inbox) = inboxes.remove(id) else {
            continue;
        };
        let neighbors = deployment
            .neighbors(*id)
            .into_iter()
            .flatten()
            .filter_map(|n| outboxes.get(n).map(|tx| (*n, tx.clone())))
            .collect();

        let task = NodeTask {
            node: GradientNode::new(*id, protocol),
            env: LiveEnv {
                node: *id,
                epoch,
                timers: BinaryHeap::new(),
                next_timer: 0,
                rng: StdRng::seed_from_u64(config.seed ^ u64::from(id.as_u32())),
                neighbors,
                positions: Arc::clone(&positions),
                radio: config.radio.clone(),
                bytes_on_air: 0,
            },
            inbox,
            shutdown_rx: shutdown_tx.subscribe(),
            deliveries: Vec::new(),
        };
        handles.push(task.spawn());
    }
    drop(outboxes);

    info!(nodes = ids.len(), ?duration, "Live network started");
    tokio::time::sleep(duration).await;
    // Receivers may already be gone if a task ended early
    let _ = shutdown_tx.send(());

    let mut report = LiveReport::default();
    for handle in handles {
        let outcome = handle.await?;
        report.reports.push(outcome.report);
        report.deliveries.extend(outcome.deliveries);
        report.bytes_on_air += outcome.bytes_on_air;
    }
    report.deliveries.sort_by_key(|d| d.delivered_at);

    info!(deliveries = report.deliveries.len(), "Live network stopped");
    Ok(report)
}
