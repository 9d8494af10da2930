//! Diagnostic records exposed to operators

use std::time::Duration;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::identity::NodeId;
use crate::time::SimTime;

/// Emitted by the sink for every delivered DATA packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// First sender
    pub origin: NodeId,
    /// `now - origin_timestamp`
    pub latency: Duration,
    pub sequence: u32,
    /// Neighbour that handed the packet to the sink
    pub last_hop: NodeId,
    /// When the sink received it
    pub delivered_at: SimTime,
}

/// Per-node terminal counters, reported on teardown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node: NodeId,
    /// `None` if the node never joined the gradient
    pub depth: Option<u32>,
    /// DATA packets originated by this node
    pub packets_sent: u64,
    /// DATA packets accepted (enqueued or delivered)
    pub packets_received: u64,
    /// DATA packets dropped because the forward buffer was full
    pub packets_dropped: u64,
    /// DATA packets relayed from the forward buffer
    pub packets_forwarded: u64,
    /// DATA packets suppressed by the sequence cache
    pub duplicates: u64,
}

impl std::fmt::Display for NodeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depth = self.depth.map(i64::from).unwrap_or(-1);
        write!(
            f,
            "({}) {} {} {} {}",
            self.node, depth, self.packets_sent, self.packets_received, self.packets_dropped
        )
    }
}

/// Why a DATA packet was ignored without being counted as a drop
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Receiver has not joined the gradient
    #[display("Receiver not on gradient")]
    Inactive,
    /// Sender is not farther from the sink than the receiver
    #[display("No progress toward sink")]
    NoProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display_matches_stats_line() {
        let report = NodeReport {
            node: NodeId(4),
            depth: Some(2),
            packets_sent: 0,
            packets_received: 12,
            packets_dropped: 1,
            packets_forwarded: 11,
            duplicates: 3,
        };
        assert_eq!(report.to_string(), "(4) 2 0 12 1");

        let detached = NodeReport {
            depth: None,
            ..report
        };
        assert!(detached.to_string().starts_with("(4) -1 "));
    }

    #[test]
    fn test_ignore_reason_display() {
        assert_eq!(IgnoreReason::Inactive.to_string(), "Receiver not on gradient");
        assert_eq!(IgnoreReason::NoProgress.to_string(), "No progress toward sink");
    }
}
