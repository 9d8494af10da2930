//! # Gradient Core
//!
//! Core types, errors, and collaborator traits for gradient routing.
//!
//! This crate provides the foundational abstractions that let the same
//! protocol logic run inside the discrete-event simulator (for testing and
//! experiments) and inside a real-time driver.
//!
//! ## Key Traits
//!
//! - [`Clock`]: Monotonic time source
//! - [`Scheduler`]: One-shot delayed callbacks, never cancelled
//! - [`Jitter`]: Bounded uniform random delays
//! - [`Transport`]: Best-effort local broadcast
//! - [`Locator`]: Node positions (used only to stamp packets)
//!
//! ## Key Types
//!
//! - [`NodeId`] / [`Position`]: Node identity and location
//! - [`Packet`]: BUILD and DATA messages sharing a header shape
//! - [`DeliveryRecord`] / [`NodeReport`]: Diagnostics exposed to operators

pub mod codec;
pub mod error;
pub mod event;
pub mod identity;
pub mod mock_env;
pub mod packet;
pub mod time;
pub mod traits;

// Re-export main types
pub use codec::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use mock_env::*;
pub use packet::*;
pub use time::*;
pub use traits::*;
