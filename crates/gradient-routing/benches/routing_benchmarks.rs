//! Gradient routing performance benchmarks
//!
//! Benchmarks for the per-packet hot paths:
//! - Sequence cache lookups and inserts
//! - Forwarding decisions on received DATA
//! - BUILD acceptance
//! - Wire encoding and decoding
//!
//! Run with: cargo bench -p gradient-routing

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use gradient_core::{BuildPacket, DataPacket, Mobility, NodeId, Packet, Position, SimTime};
use gradient_routing::{Forwarder, GradientState, SequenceCache};

fn data(sequence: u32, depth: u32) -> DataPacket {
    DataPacket {
        source: NodeId(5),
        origin: NodeId(1),
        sequence,
        depth,
        origin_position: Position::new(12.5, 40.0),
        origin_timestamp: SimTime::from_nanos(1_000),
        status: Mobility::Static,
    }
}

fn build(sequence: u32, depth: u32) -> BuildPacket {
    BuildPacket {
        source: NodeId(3),
        sequence,
        depth,
        position: Position::default(),
        timestamp: SimTime::ZERO,
        status: Mobility::Static,
    }
}

fn joined_at(depth: u32) -> GradientState {
    let mut state = GradientState::sensor();
    state.on_build_received(&build(0, depth - 1));
    state
}

// ============================================================================
// Sequence Cache
// ============================================================================

fn bench_sequence_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_cache");

    let mut cache = SequenceCache::new(10);
    for seq in 0..10 {
        cache.insert(seq);
    }

    group.bench_function("contains_hit", |b| b.iter(|| cache.contains(black_box(7))));
    group.bench_function("contains_miss", |b| b.iter(|| cache.contains(black_box(70))));

    group.bench_function("insert_wrapping", |b| {
        let mut cache = SequenceCache::new(10);
        let mut seq = 0u32;
        b.iter(|| {
            seq = seq.wrapping_add(1);
            cache.insert(black_box(seq));
        })
    });

    group.finish();
}

// ============================================================================
// Forwarding decisions
// ============================================================================

fn bench_forwarding(c: &mut Criterion) {
    let mut group = c.benchmark_group("forwarding");
    let state = joined_at(2);
    let now = SimTime::from_nanos(5_000_000);

    group.bench_function("enqueue_into_empty", |b| {
        b.iter_batched(
            || Forwarder::new(10, 10, Duration::from_millis(500), Duration::from_millis(50)),
            |mut fwd| fwd.on_data_received(&state, black_box(&data(7, 3)), now),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("duplicate", |b| {
        let mut fwd = Forwarder::new(10, 10, Duration::from_millis(500), Duration::from_millis(50));
        fwd.on_data_received(&state, &data(7, 3), now);
        b.iter(|| fwd.on_data_received(&state, black_box(&data(7, 3)), now))
    });

    group.bench_function("no_progress", |b| {
        let mut fwd = Forwarder::new(10, 10, Duration::from_millis(500), Duration::from_millis(50));
        b.iter(|| fwd.on_data_received(&state, black_box(&data(9, 1)), now))
    });

    let sink = GradientState::sink();
    group.bench_function("deliver_at_sink", |b| {
        let mut fwd = Forwarder::new(10, 10, Duration::from_millis(500), Duration::from_millis(50));
        let mut seq = 0u32;
        b.iter(|| {
            seq = seq.wrapping_add(1);
            fwd.on_data_received(&sink, black_box(&data(seq, 1)), now)
        })
    });

    group.finish();
}

// ============================================================================
// Gradient construction
// ============================================================================

fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient");

    group.bench_function("accept_newer_generation", |b| {
        let mut state = joined_at(3);
        let mut seq = 0u32;
        b.iter(|| {
            seq = seq.wrapping_add(1);
            state.on_build_received(black_box(&build(seq, 2)))
        })
    });

    group.bench_function("reject_same_generation", |b| {
        let mut state = joined_at(3);
        b.iter(|| state.on_build_received(black_box(&build(0, 4))))
    });

    group.finish();
}

// ============================================================================
// Wire codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let packet = Packet::Data(data(1234, 3));
    let frame = gradient_core::encode(&packet).unwrap_or_default();

    group.bench_function("encode_data", |b| {
        b.iter(|| gradient_core::encode(black_box(&packet)))
    });
    group.bench_function("decode_data", |b| {
        b.iter(|| gradient_core::decode(black_box(&frame)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sequence_cache,
    bench_forwarding,
    bench_gradient,
    bench_codec
);
criterion_main!(benches);
