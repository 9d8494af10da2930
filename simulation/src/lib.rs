//! # Gradient Simulation
//!
//! Runs the gradient routing protocol over simulated sensor deployments.
//!
//! ## Overview
//!
//! One sink roots a hop-count gradient. Its BUILD announcements flood the
//! field; every node adopts the shortest path it hears of and re-announces
//! once. An origin node then emits DATA periodically, and each packet is
//! relayed only by nodes strictly closer to the sink until it reaches it.
//!
//! ## Architecture
//!
//! - **Topology** (`topology.rs`): Node placement and unit-disk links
//! - **Engine** (`engine.rs`): Time-ordered event queue
//! - **Radio** (`radio.rs`): Broadcast delay, per-receiver loss, header failures
//! - **Simulation** (`simulation.rs`): Discrete-event driver and statistics
//! - **Live** (`live.rs`): One tokio task per node on the wall clock
//! - **Scenarios** (`scenarios.rs`): Pre-built runs
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use gradient_core::NodeId;
//! use gradient_simulation::{DeploymentBuilder, SimConfig, Simulation};
//!
//! // 0 - 1 - 2 - 3, sink at 0, origin at 3
//! let deployment = DeploymentBuilder::new(4).line();
//! let mut config = SimConfig::default();
//! config.protocol.origin = Some(NodeId(3));
//!
//! let mut sim = Simulation::new(deployment, config).unwrap();
//! sim.run_for(Duration::from_secs(5));
//! assert!(sim.gradient_converged());
//!
//! sim.run_for(Duration::from_secs(60));
//! assert!(sim.stats.deliveries > 0);
//! ```

pub mod engine;
pub mod error;
pub mod live;
pub mod radio;
pub mod scenarios;
pub mod simulation;
pub mod topology;

#[cfg(test)]
mod integration_scenarios;

// Re-export main types
pub use engine::{Event, EventQueue};
pub use error::{SimError, SimResult};
pub use live::{LiveReport, run_live};
pub use radio::RadioConfig;
pub use scenarios::print_stats;
pub use simulation::{NodeCtx, SimConfig, SimStats, Simulation};
pub use topology::{Deployment, DeploymentBuilder, from_edges};
