//! # Gradient Routing
//!
//! Protocol core for gradient routing in multi-hop sensor networks.
//!
//! A single sink floods BUILD announcements that give every node a hop
//! distance (its depth). Data then flows from a periodic origin toward the
//! sink, relayed only by nodes strictly closer to it than the previous hop.
//!
//! ## Core Components
//!
//! - [`GradientState`]: Depth, generation, and parent tracking driven by BUILD packets
//! - [`Forwarder`]: Per-packet forwarding decisions over a [`SequenceCache`] and [`ForwardBuffer`]
//! - [`Originator`]: Periodic DATA source that waits for the gradient
//! - [`GradientNode`]: Binds the above to one node and its environment
//! - [`ProtocolConfig`]: Timing and capacity parameters
//!
//! ## Gradient Construction
//!
//! A node accepts a BUILD packet when it is from a newer generation or
//! offers a strictly shorter path. Acceptance schedules one jittered
//! re-announcement; further acceptances before it fires collapse into it.
//! The sink re-announces on a fixed heartbeat so the gradient refreshes
//! even if reactive propagation stalls.
//!
//! ## Forwarding
//!
//! 1. **IGNORE**: Receiver off the gradient, or sender not farther from the sink
//! 2. **DROP**: Sequence number already seen
//! 3. **DELIVER**: Receiver is the sink
//! 4. **DROP**: Forward buffer full
//! 5. **ENQUEUE**: Otherwise, relayed later one record per jittered callback
//!
//! ## Example
//!
//! ```rust
//! use gradient_core::{MockEnv, NodeId, Timer};
//! use gradient_routing::{GradientNode, ProtocolConfig, TxOutcome};
//!
//! let config = ProtocolConfig::default();
//! let mut env = MockEnv::new(config.sink);
//! let mut sink = GradientNode::new(config.sink, &config);
//!
//! sink.bootstrap(&mut env);
//! let (_, timer) = env.fire_next().unwrap();
//! assert_eq!(timer, Timer::Build);
//! assert!(matches!(sink.on_timer(&mut env, timer), TxOutcome::Announced(_)));
//! ```

pub mod buffer;
pub mod config;
pub mod forwarding;
pub mod gradient;
pub mod node;
pub mod origination;
pub mod seqcache;

pub use buffer::{Enqueued, ForwardBuffer, ForwardRecord};
pub use config::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_SEQUENCE_CAPACITY, ProtocolConfig, TimingConfig, format_time,
    parse_time,
};
pub use forwarding::{DrainOutcome, ForwardAction, Forwarder};
pub use gradient::{BuildOutcome, GradientState};
pub use node::{GradientNode, RxOutcome, TxOutcome};
pub use origination::{Origination, Originator};
pub use seqcache::SequenceCache;
