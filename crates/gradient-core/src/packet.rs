//! Packet model
//!
//! Two packet kinds share one header shape. BUILD packets carry gradient
//! information and are evaluated and discarded on receipt. DATA packets are
//! relayed hop by hop toward the sink, carrying the origin's identity,
//! sequence number, timestamp, and position unchanged; only `source` and
//! `depth` are rewritten at each hop.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::identity::{NodeId, Position};
use crate::time::SimTime;

/// Role of a node in the gradient
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Roots the gradient and terminates all data
    #[display("sink")]
    Sink,
    /// Ordinary node: joins the gradient and relays data
    #[display("sensor")]
    Sensor,
}

/// Mobility status stamped into every header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mobility {
    #[default]
    Static,
    Moving,
}

/// Packet kind tag, as carried on the wire
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketKind {
    #[display("BUILD")]
    Build = 0,
    #[display("DATA")]
    Data = 1,
}

impl TryFrom<u8> for PacketKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Build),
            1 => Ok(Self::Data),
            other => Err(other),
        }
    }
}

/// Gradient construction message
///
/// Always broadcast; never buffered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPacket {
    /// Announcing node
    pub source: NodeId,
    /// Gradient generation
    pub sequence: u32,
    /// Announcing node's depth
    pub depth: u32,
    /// Announcing node's position
    pub position: Position,
    /// When the announcement was sent
    pub timestamp: SimTime,
    pub status: Mobility,
}

/// Payload message relayed toward the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPacket {
    /// Last hop
    pub source: NodeId,
    /// First sender
    pub origin: NodeId,
    /// Origin-local, monotonic
    pub sequence: u32,
    /// Depth of the last hop
    pub depth: u32,
    /// Position of the origin when the packet was created
    pub origin_position: Position,
    /// When the origin created the packet
    pub origin_timestamp: SimTime,
    pub status: Mobility,
}

impl DataPacket {
    /// Copy of this packet as rebroadcast by a relay
    pub fn relayed_by(&self, relay: NodeId, relay_depth: u32, status: Mobility) -> Self {
        Self {
            source: relay,
            depth: relay_depth,
            status,
            ..self.clone()
        }
    }
}

/// A packet as exchanged between neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Build(BuildPacket),
    Data(DataPacket),
}

impl Packet {
    /// The wire tag for this packet
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Build(_) => PacketKind::Build,
            Packet::Data(_) => PacketKind::Data,
        }
    }

    /// The node that transmitted this copy
    pub fn source(&self) -> NodeId {
        match self {
            Packet::Build(p) => p.source,
            Packet::Data(p) => p.source,
        }
    }

    /// Depth of the transmitting node
    pub fn depth(&self) -> u32 {
        match self {
            Packet::Build(p) => p.depth,
            Packet::Data(p) => p.depth,
        }
    }

    /// Sequence number (gradient generation or data sequence)
    pub fn sequence(&self) -> u32 {
        match self {
            Packet::Build(p) => p.sequence,
            Packet::Data(p) => p.sequence,
        }
    }
}

impl From<BuildPacket> for Packet {
    fn from(packet: BuildPacket) -> Self {
        Packet::Build(packet)
    }
}

impl From<DataPacket> for Packet {
    fn from(packet: DataPacket) -> Self {
        Packet::Data(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(seq: u32) -> DataPacket {
        DataPacket {
            source: NodeId(5),
            origin: NodeId(5),
            sequence: seq,
            depth: 3,
            origin_position: Position::new(10.0, 20.0),
            origin_timestamp: SimTime::from_nanos(1_000),
            status: Mobility::Static,
        }
    }

    #[test]
    fn test_relayed_rewrites_only_source_and_depth() {
        let original = data(7);
        let relayed = original.relayed_by(NodeId(2), 2, Mobility::Static);

        assert_eq!(relayed.source, NodeId(2));
        assert_eq!(relayed.depth, 2);
        assert_eq!(relayed.origin, original.origin);
        assert_eq!(relayed.sequence, original.sequence);
        assert_eq!(relayed.origin_timestamp, original.origin_timestamp);
        assert_eq!(relayed.origin_position, original.origin_position);
    }

    #[test]
    fn test_packet_accessors() {
        let packet = Packet::from(data(9));
        assert_eq!(packet.kind(), PacketKind::Data);
        assert_eq!(packet.source(), NodeId(5));
        assert_eq!(packet.depth(), 3);
        assert_eq!(packet.sequence(), 9);
    }

    #[test]
    fn test_kind_tag() {
        assert_eq!(PacketKind::try_from(0), Ok(PacketKind::Build));
        assert_eq!(PacketKind::try_from(1), Ok(PacketKind::Data));
        assert_eq!(PacketKind::try_from(7), Err(7));
        assert_eq!(PacketKind::Build.to_string(), "BUILD");
    }
}
