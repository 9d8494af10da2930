//! Sequence cache for duplicate suppression
//!
//! A fixed-capacity ring of the most recently accepted DATA sequence
//! numbers. The newest entry overwrites the oldest; membership is the only
//! query. Nothing beyond recency is guaranteed.

/// Fixed-capacity recency window of sequence numbers
#[derive(Debug, Clone)]
pub struct SequenceCache {
    slots: Vec<Option<u32>>,
    /// Next slot to overwrite
    cursor: usize,
}

impl SequenceCache {
    /// Create an empty cache holding at most `capacity` entries
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
        }
    }

    /// Whether `sequence` is in the window
    pub fn contains(&self, sequence: u32) -> bool {
        self.slots.contains(&Some(sequence))
    }

    /// Record `sequence`, evicting the oldest entry if full
    pub fn insert(&mut self, sequence: u32) {
        self.slots[self.cursor] = Some(sequence);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
