//! Discrete-event queue
//!
//! Events are ordered by time, then by insertion order, so callbacks due
//! at the same instant run in the order they were scheduled. Nothing is
//! ever cancelled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use gradient_core::{NodeId, SimTime, Timer};

/// Something that happens to one node at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A callback the node scheduled for itself
    Timer { node: NodeId, timer: Timer },
    /// A frame arriving over the air
    Receive { node: NodeId, frame: Vec<u8> },
}

impl Event {
    /// The node the event is delivered to
    pub fn node(&self) -> NodeId {
        match self {
            Event::Timer { node, .. } | Event::Receive { node, .. } => *node,
        }
    }
}

#[derive(Debug)]
struct Scheduled {
    at: SimTime,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// Min-heap of pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` at `at`
    pub fn push(&mut self, at: SimTime, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { at, seq, event }));
    }

    /// Remove the earliest event
    pub fn pop(&mut self) -> Option<(SimTime, Event)> {
        self.heap.pop().map(|Reverse(s)| (s.at, s.event))
    }

    /// Time of the earliest event
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(s)| s.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total events ever scheduled
    pub fn scheduled_total(&self) -> u64 {
        self.next_seq
    }
}
