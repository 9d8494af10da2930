//! Protocol property tests for gradient-routing
//!
//! Each node is driven through its own `MockEnv`; packets are carried
//! between nodes by hand, so every hop in a scenario is explicit.

use std::time::Duration;

use gradient_core::{
    BuildPacket, DataPacket, JitterMode, MockEnv, Mobility, NodeId, Packet, Position, SimTime,
    Timer,
};
use gradient_routing::{
    ForwardAction, GradientNode, ProtocolConfig, RxOutcome, TimingConfig, TxOutcome,
};

// Test helpers
fn config() -> ProtocolConfig {
    ProtocolConfig::default()
}

fn build(source: u32, sequence: u32, depth: u32) -> Packet {
    Packet::Build(BuildPacket {
        source: NodeId(source),
        sequence,
        depth,
        position: Position::default(),
        timestamp: SimTime::ZERO,
        status: Mobility::Static,
    })
}

fn data(source: u32, sequence: u32, depth: u32) -> Packet {
    Packet::Data(DataPacket {
        source: NodeId(source),
        origin: NodeId(1),
        sequence,
        depth,
        origin_position: Position::new(10.0, 0.0),
        origin_timestamp: SimTime::ZERO,
        status: Mobility::Static,
    })
}

/// A sensor node that has joined the gradient at `depth`
fn sensor_at(id: u32, depth: u32) -> (GradientNode, MockEnv) {
    let mut env = MockEnv::new(NodeId(id));
    let mut node = GradientNode::new(NodeId(id), &config());
    node.on_receive(&mut env, &build(0, 0, depth - 1));
    // Let the re-announcement go so only data callbacks remain
    while let Some((_, timer)) = env.fire_next() {
        node.on_timer(&mut env, timer);
    }
    env.take_sent();
    (node, env)
}

/// Fire callbacks until one of kind `wanted` runs, returning its outcome
fn fire_until(node: &mut GradientNode, env: &mut MockEnv, wanted: Timer) -> Option<TxOutcome> {
    while let Some((_, timer)) = env.fire_next() {
        let outcome = node.on_timer(env, timer);
        if timer == wanted {
            return Some(outcome);
        }
    }
    None
}

fn data_action(outcome: RxOutcome) -> ForwardAction {
    match outcome {
        RxOutcome::Data(action) => action,
        other => panic!("expected a DATA outcome, got {:?}", other),
    }
}

#[test]
fn test_accepted_data_always_moves_down_gradient() {
    for node_depth in 1..6u32 {
        for sender_depth in 0..8u32 {
            let (mut node, mut env) = sensor_at(2, node_depth);
            let action = data_action(node.on_receive(&mut env, &data(9, 100, sender_depth)));
            if action.is_accepted() {
                assert!(
                    node_depth < sender_depth,
                    "depth {} accepted from depth {}",
                    node_depth,
                    sender_depth
                );
            } else {
                assert!(sender_depth <= node_depth);
            }
        }
    }
}

#[test]
fn test_sink_depth_is_always_zero() {
    let mut env = MockEnv::new(NodeId(0)).with_jitter(JitterMode::Seeded(3));
    let mut sink = GradientNode::new(NodeId(0), &config());
    sink.bootstrap(&mut env);

    for step in 0..50u32 {
        sink.on_receive(&mut env, &build(step % 7 + 1, step, step % 3));
        sink.on_receive(&mut env, &data(step % 5 + 1, step, step % 4 + 1));
        if step % 10 == 0 {
            if let Some((_, timer)) = env.fire_next() {
                sink.on_timer(&mut env, timer);
            }
        }
        assert_eq!(sink.gradient().depth(), Some(0));
    }
    assert_eq!(sink.report().depth, Some(0));
}

#[test]
fn test_cached_sequence_never_accepted_again() {
    let (mut relay, mut env) = sensor_at(2, 1);
    let first = data_action(relay.on_receive(&mut env, &data(5, 42, 2)));
    assert!(first.is_accepted());

    for (source, depth) in [(5, 2), (6, 3), (7, 9)] {
        let again = data_action(relay.on_receive(&mut env, &data(source, 42, depth)));
        assert_eq!(again, ForwardAction::DropDuplicateOrStale);
    }
    assert_eq!(relay.report().duplicates, 3);
    assert_eq!(relay.forwarder().buffer().len(), 1);
}

#[test]
fn test_buffer_never_exceeds_capacity() {
    let (mut relay, mut env) = sensor_at(2, 1);
    for seq in 1..=25 {
        relay.on_receive(&mut env, &data(5, seq, 2));
        assert!(relay.forwarder().buffer().len() <= 10);
    }
    assert_eq!(relay.report().packets_dropped, 15);
}

#[test]
fn test_gradient_convergence() {
    let cfg = config();
    let mut sink_env = MockEnv::new(NodeId(0));
    let mut a_env = MockEnv::new(NodeId(1));
    let mut b_env = MockEnv::new(NodeId(2));
    let mut sink = GradientNode::new(NodeId(0), &cfg);
    let mut a = GradientNode::new(NodeId(1), &cfg);
    let mut b = GradientNode::new(NodeId(2), &cfg);

    // Generation 0
    sink.bootstrap(&mut sink_env);
    let gen0 = fire_until(&mut sink, &mut sink_env, Timer::Build)
        .and_then(|o| o.packet())
        .unwrap();
    a.on_receive(&mut a_env, &gen0);
    let from_a = fire_until(&mut a, &mut a_env, Timer::Build)
        .and_then(|o| o.packet())
        .unwrap();
    b.on_receive(&mut b_env, &from_a);

    assert_eq!(a.gradient().depth(), Some(1));
    assert_eq!(b.gradient().depth(), Some(2));
    assert_eq!(b.gradient().parent(), Some(NodeId(1)));

    // Generation 1 after the heartbeat, same topology
    let gen1 = fire_until(&mut sink, &mut sink_env, Timer::Build)
        .and_then(|o| o.packet())
        .unwrap();
    assert_eq!(gen1.sequence(), 1);
    a.on_receive(&mut a_env, &gen1);
    let from_a = fire_until(&mut a, &mut a_env, Timer::Build)
        .and_then(|o| o.packet())
        .unwrap();
    b.on_receive(&mut b_env, &from_a);

    assert_eq!(a.gradient().depth(), Some(1));
    assert_eq!(b.gradient().depth(), Some(2));
    assert_eq!(a.gradient().build_seqno(), Some(1));
    assert_eq!(b.gradient().build_seqno(), Some(1));
}

#[test]
fn test_forwarding_dag_delivers_unmodified() {
    let (mut relay, mut relay_env) = sensor_at(2, 2);
    let mut sink_env = MockEnv::new(NodeId(0));
    let mut sink = GradientNode::new(NodeId(0), &config());

    let original = Packet::Data(DataPacket {
        source: NodeId(1),
        origin: NodeId(1),
        sequence: 7,
        depth: 3,
        origin_position: Position::new(30.0, 0.0),
        origin_timestamp: SimTime::ZERO,
        status: Mobility::Static,
    });

    let queued = data_action(relay.on_receive(&mut relay_env, &original));
    assert_eq!(queued, ForwardAction::Enqueue { schedule_drain: true });

    let relayed = match fire_until(&mut relay, &mut relay_env, Timer::Forward) {
        Some(TxOutcome::Forwarded(packet)) => packet,
        other => panic!("expected a forward, got {:?}", other),
    };
    let Packet::Data(original) = original else {
        unreachable!()
    };
    assert_eq!(relayed, original.relayed_by(NodeId(2), 2, Mobility::Static));

    sink_env.advance(Duration::from_millis(300));
    let delivered = data_action(sink.on_receive(&mut sink_env, &Packet::Data(relayed)));
    let ForwardAction::Deliver(record) = delivered else {
        panic!("sink should deliver, got {:?}", delivered);
    };
    assert_eq!(record.origin, NodeId(1));
    assert_eq!(record.sequence, 7);
    assert_eq!(record.last_hop, NodeId(2));
    assert_eq!(record.latency, Duration::from_millis(300));
}

#[test]
fn test_drop_and_count() {
    let (mut relay, mut env) = sensor_at(2, 1);
    for seq in 1..=10 {
        let action = data_action(relay.on_receive(&mut env, &data(5, seq, 2)));
        assert!(action.is_accepted());
    }
    let before = relay.report().packets_dropped;

    let action = data_action(relay.on_receive(&mut env, &data(5, 11, 2)));
    assert_eq!(action, ForwardAction::DropBufferFull);
    assert_eq!(relay.report().packets_dropped, before + 1);

    let queued: Vec<u32> = relay.forwarder().buffer().iter().map(|r| r.sequence).collect();
    assert_eq!(queued, (1..=10).collect::<Vec<_>>());

    let mut drained = Vec::new();
    while let Some((_, timer)) = env.fire_next() {
        if let TxOutcome::Forwarded(packet) = relay.on_timer(&mut env, timer) {
            drained.push(packet.sequence);
        }
    }
    assert_eq!(drained, (1..=10).collect::<Vec<_>>());
    assert_eq!(relay.report().packets_forwarded, 10);
}

#[test]
fn test_every_delay_within_its_bound() {
    let timing = TimingConfig::default();
    let bounds = [timing.delay, timing.jitter, timing.time_space];

    let mut env = MockEnv::new(NodeId(1)).with_jitter(JitterMode::Seeded(11));
    let mut origin = GradientNode::new(NodeId(1), &config());
    origin.bootstrap(&mut env);

    let mut seq = 1_000;
    for round in 0..200u32 {
        origin.on_receive(&mut env, &build(0, round, 0));
        for _ in 0..3 {
            seq += 1;
            origin.on_receive(&mut env, &data(5, seq, 2));
        }
        for _ in 0..4 {
            if let Some((_, timer)) = env.fire_next() {
                origin.on_timer(&mut env, timer);
            }
        }
    }

    assert!(!env.draws.is_empty());
    for draw in &env.draws {
        assert!(bounds.contains(&draw.bound), "unexpected bound {:?}", draw.bound);
        assert!(draw.value < draw.bound, "{:?} not below {:?}", draw.value, draw.bound);
    }
}

#[test]
fn test_transport_failure_keeps_cadence() {
    let mut env = MockEnv::new(NodeId(0));
    let mut sink = GradientNode::new(NodeId(0), &config());
    sink.bootstrap(&mut env);
    env.fail_next_broadcasts(1);

    let failed = fire_until(&mut sink, &mut env, Timer::Build).unwrap();
    assert!(matches!(failed, TxOutcome::Failed { timer: Timer::Build, .. }));
    assert_eq!(env.pending_count(Timer::Build), 1);

    let TxOutcome::Announced(retry) = fire_until(&mut sink, &mut env, Timer::Build).unwrap()
    else {
        panic!("heartbeat should announce");
    };
    assert_eq!(retry.sequence, 0, "failed heartbeat does not consume a generation");
}
