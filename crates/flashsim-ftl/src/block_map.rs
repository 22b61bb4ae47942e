//! Block-level mapping table
//!
//! One entry per logical block: the physical data block holding its last
//! merged contents, or nothing if the block has never been merged.

use flashsim_common::PhysicalBlock;

/// Logical block index -> physical data block
#[derive(Debug, Clone)]
pub struct BlockMap {
    entries: Vec<Option<PhysicalBlock>>,
}

impl BlockMap {
    #[must_use]
    pub fn new(logical_blocks: usize) -> Self {
        Self {
            entries: vec![None; logical_blocks],
        }
    }

    pub fn get(&self, block_index: u64) -> Option<PhysicalBlock> {
        self.entries.get(block_index as usize).copied().flatten()
    }

    /// Map a logical block, returning the data block it replaces
    pub fn set(&mut self, block_index: u64, block: PhysicalBlock) -> Option<PhysicalBlock> {
        self.entries
            .get_mut(block_index as usize)
            .and_then(|entry| entry.replace(block))
    }

    /// Drop the mapping for a logical block
    pub fn unmap(&mut self, block_index: u64) -> Option<PhysicalBlock> {
        self.entries
            .get_mut(block_index as usize)
            .and_then(Option::take)
    }
}
