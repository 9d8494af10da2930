//! Pre-defined simulation scenarios
//!
//! Each scenario builds a deployment, runs it, prints what happened and
//! hands the finished simulation back for inspection.

use std::time::Duration;

use gradient_core::NodeId;
use tracing::info;

use crate::error::SimResult;
use crate::radio::RadioConfig;
use crate::simulation::{SimConfig, Simulation};
use crate::topology::{DeploymentBuilder, from_edges};

/// Print the statistics block shared by every scenario
pub fn print_stats(sim: &Simulation) {
    let stats = &sim.stats;
    println!("\n=== Final Statistics ===");
    println!("  BUILD sent: {}", stats.builds_sent);
    println!("  BUILD accepted: {}", stats.builds_accepted);
    println!("  DATA originated: {}", stats.data_originated);
    println!("  Originations deferred: {}", stats.originations_deferred);
    println!("  Forwards: {}", stats.forwards);
    println!("  Deliveries: {}", stats.deliveries);
    println!("  Distinct packets delivered: {}", stats.unique_deliveries);
    println!("  Duplicates: {}", stats.duplicates);
    println!("  Buffer drops: {}", stats.buffer_drops);
    println!("  Transport failures: {}", stats.transport_failures);
    println!("  Radio losses: {}", stats.radio_losses);
    println!("  Bytes on air: {}", stats.bytes_on_air);
    println!("  Delivery ratio: {:.1}%", stats.delivery_ratio() * 100.0);
    if let Some(latency) = stats.average_latency() {
        println!("  Average latency: {:?}", latency);
    }

    println!("\n=== Node Reports ===");
    for report in sim.teardown() {
        println!("  {}", report);
    }
}

fn print_depths(sim: &Simulation) {
    println!("\n--- Gradient ---");
    for (node, depth) in sim.depths() {
        match depth {
            Some(d) => println!("  {:>3}: depth {}", node, d),
            None => println!("  {:>3}: not joined", node),
        }
    }
    println!(
        "  Converged to shortest paths: {}",
        sim.gradient_converged()
    );
}

/// Scenario: a line with the sink at one end and the origin at the other
///
/// Every packet travels `nodes - 1` hops.
pub fn run_line_scenario(nodes: u32, seed: u64) -> SimResult<Simulation> {
    info!(nodes, "=== Running Line Scenario ===");
    let deployment = DeploymentBuilder::new(nodes.max(2)).line();
    println!("{}", deployment.visualize());

    let mut config = SimConfig {
        seed,
        ..SimConfig::default()
    };
    config.protocol.origin = Some(NodeId(nodes.max(2) - 1));

    let mut sim = Simulation::new(deployment, config)?;
    sim.run_for(Duration::from_secs(5));
    print_depths(&sim);

    sim.run();
    println!("\n  {}", sim.state_summary());
    print_stats(&sim);
    Ok(sim)
}

/// Scenario: a square grid with diagonal links, origin in the far corner
///
/// Several relays share each depth, so copies of one packet meet at the
/// next ring and all but the first are dropped as duplicates.
pub fn run_grid_scenario(side: u32, seed: u64) -> SimResult<Simulation> {
    info!(side, "=== Running Grid Scenario ===");
    let side = side.max(2);
    let deployment = DeploymentBuilder::new(side * side).range(15.0).grid(side);
    println!("{}", deployment.visualize());

    let mut config = SimConfig {
        seed,
        ..SimConfig::default()
    };
    config.protocol.origin = Some(NodeId(side * side - 1));

    let mut sim = Simulation::new(deployment, config)?;
    sim.run();
    print_depths(&sim);
    print_stats(&sim);
    Ok(sim)
}

/// Scenario: a random field over a lossy radio
pub fn run_lossy_scenario(nodes: u32, loss: f64, seed: u64) -> SimResult<Simulation> {
    info!(nodes, loss, "=== Running Lossy Scenario ===");
    let deployment = DeploymentBuilder::new(nodes.max(2))
        .range(35.0)
        .random(100.0, seed);
    println!("{}", deployment.visualize());
    if !deployment.is_connected() {
        println!("  Warning: field is partitioned; some nodes can never join");
    }

    let origin = deployment
        .hop_distances(NodeId::SINK)
        .into_iter()
        .max_by_key(|(_, hops)| *hops)
        .map(|(node, _)| node)
        .filter(|node| *node != NodeId::SINK);

    let mut config = SimConfig {
        radio: RadioConfig::lossy(loss),
        seed,
        ..SimConfig::default()
    };
    config.protocol.origin = origin;

    let mut sim = Simulation::new(deployment, config)?;
    sim.run();
    print_depths(&sim);
    print_stats(&sim);
    Ok(sim)
}

/// Scenario: origination outpaces the first drain of each relay
///
/// A relay waits up to `delay` before sending the head of a freshly
/// filled buffer. With a period far below that, packets pile up and
/// arrivals beyond the buffer capacity are dropped.
pub fn run_congestion_scenario(seed: u64) -> SimResult<Simulation> {
    info!("=== Running Congestion Scenario ===");
    let deployment = DeploymentBuilder::new(4).line();
    println!("{}", deployment.visualize());

    let mut config = SimConfig {
        duration: Duration::from_secs(30),
        seed,
        ..SimConfig::default()
    };
    config.protocol.origin = Some(NodeId(3));
    config.protocol.timing.delay = Duration::from_secs(2);
    config.protocol.timing.period = Duration::from_millis(20);
    config.protocol.timing.jitter = Duration::from_millis(10);
    config.protocol.timing.time_space = Duration::from_millis(100);

    let mut sim = Simulation::new(deployment, config)?;
    sim.run();
    print_stats(&sim);
    Ok(sim)
}

/// Scenario: two equal-length paths from the origin to the sink
///
/// ```text
///     1
///   /   \
/// 0       3
///   \   /
///     2
/// ```
///
/// Both relays forward every packet and the sink delivers both copies.
pub fn run_diamond_scenario(seed: u64) -> SimResult<Simulation> {
    info!("=== Running Diamond Scenario ===");
    let deployment = from_edges(&[(0, 1), (0, 2), (1, 3), (2, 3)]);
    println!("{}", deployment.visualize());

    let mut config = SimConfig {
        duration: Duration::from_secs(120),
        seed,
        ..SimConfig::default()
    };
    config.protocol.origin = Some(NodeId(3));

    let mut sim = Simulation::new(deployment, config)?;
    sim.run();
    print_depths(&sim);
    print_stats(&sim);
    Ok(sim)
}
