//! Forward buffer
//!
//! A bounded FIFO of DATA records awaiting relay. A full buffer drops new
//! arrivals; it never blocks and never evicts queued records, so whatever
//! is accepted drains in arrival order.

use std::collections::VecDeque;

use gradient_core::{DataPacket, Mobility, NodeId, Position, SimTime};

/// The fields of a DATA packet kept while it waits to be relayed
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRecord {
    /// Neighbour the packet was received from
    pub source: NodeId,
    pub origin: NodeId,
    pub sequence: u32,
    /// Depth of the neighbour it was received from
    pub depth: u32,
    pub origin_timestamp: SimTime,
    pub origin_position: Position,
    pub status: Mobility,
}

impl ForwardRecord {
    /// DATA packet to rebroadcast, stamped with the relay's identity and depth
    pub fn to_packet(&self, relay: NodeId, relay_depth: u32, status: Mobility) -> DataPacket {
        DataPacket {
            source: relay,
            origin: self.origin,
            sequence: self.sequence,
            depth: relay_depth,
            origin_position: self.origin_position,
            origin_timestamp: self.origin_timestamp,
            status,
        }
    }
}

impl From<&DataPacket> for ForwardRecord {
    fn from(packet: &DataPacket) -> Self {
        Self {
            source: packet.source,
            origin: packet.origin,
            sequence: packet.sequence,
            depth: packet.depth,
            origin_timestamp: packet.origin_timestamp,
            origin_position: packet.origin_position,
            status: packet.status,
        }
    }
}

/// Result of a successful push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// The buffer was empty before this push, so no drain is scheduled yet
    pub was_empty: bool,
}

/// Bounded FIFO of records awaiting relay
#[derive(Debug, Clone)]
pub struct ForwardBuffer {
    records: VecDeque<ForwardRecord>,
    capacity: usize,
}

impl ForwardBuffer {
    /// Create an empty buffer holding at most `capacity` records
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record at the tail
    ///
    /// Returns the record back if the buffer is full; queued records are
    /// left untouched.
    pub fn push(&mut self, record: ForwardRecord) -> Result<Enqueued, ForwardRecord> {
        if self.is_full() {
            return Err(record);
        }
        let was_empty = self.records.is_empty();
        self.records.push_back(record);
        Ok(Enqueued { was_empty })
    }

    /// Remove the head record
    pub fn pop(&mut self) -> Option<ForwardRecord> {
        self.records.pop_front()
    }

    /// Peek at the head record
    pub fn front(&self) -> Option<&ForwardRecord> {
        self.records.front()
    }

    /// Queued records, head first
    pub fn iter(&self) -> impl Iterator<Item = &ForwardRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
