//! Bounded log block table
//!
//! Maps logical block index -> owned [`LogBlock`], holding at most
//! `capacity` entries. Each insertion is stamped with a sequence number and
//! an ordered index over those stamps makes "oldest entry" explicit instead
//! of relying on container iteration order.

use crate::log_block::LogBlock;
use flashsim_common::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Insertion-ordered, capacity-bounded map of live log blocks
#[derive(Debug, Clone)]
pub struct LogMap {
    capacity: usize,
    next_seq: u64,
    /// block index -> (insertion stamp, log block)
    entries: HashMap<u64, (u64, LogBlock)>,
    /// insertion stamp -> block index
    order: BTreeMap<u64, u64>,
}

impl LogMap {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_seq: 0,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// No room for another entry without evicting
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, block_index: u64) -> bool {
        self.entries.contains_key(&block_index)
    }

    pub fn get(&self, block_index: u64) -> Option<&LogBlock> {
        self.entries.get(&block_index).map(|(_, log)| log)
    }

    pub fn get_mut(&mut self, block_index: u64) -> Option<&mut LogBlock> {
        self.entries.get_mut(&block_index).map(|(_, log)| log)
    }

    /// Admit a new log block as the youngest entry
    ///
    /// The caller must make room first; inserting into a full map or a
    /// second log block for the same index is refused.
    pub fn insert(&mut self, block_index: u64, log: LogBlock) -> Result<()> {
        if self.contains(block_index) {
            return Err(Error::internal(format!(
                "logical block {block_index} already has a log block"
            )));
        }
        if self.is_full() {
            return Err(Error::internal(format!(
                "log map full ({} entries)",
                self.capacity
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, block_index);
        self.entries.insert(block_index, (seq, log));
        Ok(())
    }

    /// Remove and return the log block for `block_index`
    pub fn remove(&mut self, block_index: u64) -> Option<LogBlock> {
        let (seq, log) = self.entries.remove(&block_index)?;
        self.order.remove(&seq);
        Some(log)
    }

    /// Logical block index of the oldest entry
    pub fn oldest(&self) -> Option<u64> {
        self.order.first_key_value().map(|(_, &block_index)| block_index)
    }
}
