//! Error types for gradient routing
//!
//! Steady-state anomalies (full buffers, duplicates) are protocol outcomes,
//! not errors. The types here cover what can actually fail: loading
//! configuration, handing a frame to the layer below, and decoding frames.

use thiserror::Error;

/// Errors raised while loading or validating configuration
///
/// These are fatal at initialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid time value for {key}: {value:?}")]
    InvalidTime { key: String, value: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown parameter: {0}")]
    UnknownKey(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the link layer
///
/// Non-fatal: the failed send is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Link header rejected: {0}")]
    HeaderRejected(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Broadcast medium closed")]
    MediumClosed,
}

/// Errors encoding or decoding wire frames
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown packet kind: {0}")]
    UnknownPacketKind(u8),

    #[error("Frame truncated: {len} bytes")]
    Truncated { len: usize },

    #[error("Body error: {0}")]
    Body(#[from] postcard::Error),
}
