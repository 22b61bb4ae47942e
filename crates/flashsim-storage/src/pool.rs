//! Free block pool
//!
//! One bit per erase block: 0 = erased and free, 1 = handed out. Allocation
//! scans forward from a rotating hint so consecutive allocations spread over
//! the array instead of hammering the low blocks.

use flashsim_common::{Error, Result};

/// Bitmap of free erase blocks
#[derive(Debug, Clone)]
pub struct FreeBlockPool {
    /// Bitmap data
    bits: Vec<u8>,
    /// Total number of blocks
    total_blocks: u64,
    /// Number of free blocks (cached)
    free_blocks: u64,
    /// Hint for next free block search
    search_hint: u64,
}

impl FreeBlockPool {
    /// Create a pool with every block free
    #[must_use]
    pub fn new(total_blocks: u64) -> Self {
        Self {
            bits: vec![0u8; total_blocks.div_ceil(8) as usize],
            total_blocks,
            free_blocks: total_blocks,
            search_hint: 0,
        }
    }

    /// Check if a block is handed out
    pub fn is_allocated(&self, block: u64) -> bool {
        if block >= self.total_blocks {
            return true; // Out of range blocks are never free
        }
        Self::is_set(&self.bits, block)
    }

    fn is_set(bits: &[u8], block: u64) -> bool {
        bits[(block / 8) as usize] & (1 << (block % 8)) != 0
    }

    fn set(bits: &mut [u8], block: u64) {
        bits[(block / 8) as usize] |= 1 << (block % 8);
    }

    fn clear(bits: &mut [u8], block: u64) {
        bits[(block / 8) as usize] &= !(1 << (block % 8));
    }

    fn find_free_in_range(&self, start: u64, end: u64) -> Option<u64> {
        (start..end.min(self.total_blocks)).find(|&block| !Self::is_set(&self.bits, block))
    }

    /// Take the next free block
    pub fn allocate(&mut self) -> Option<u64> {
        let hint = self.search_hint;
        let block = self
            .find_free_in_range(hint, self.total_blocks)
            .or_else(|| (hint > 0).then(|| self.find_free_in_range(0, hint)).flatten())?;

        Self::set(&mut self.bits, block);
        self.free_blocks -= 1;
        self.search_hint = (block + 1) % self.total_blocks.max(1);
        Some(block)
    }

    /// Return an erased block to the pool
    pub fn release(&mut self, block: u64) -> Result<()> {
        if block >= self.total_blocks {
            return Err(Error::invalid_address(format!(
                "block {} out of range (max {})",
                block, self.total_blocks
            )));
        }
        if !Self::is_set(&self.bits, block) {
            return Err(Error::internal(format!("block {block} is already free")));
        }

        Self::clear(&mut self.bits, block);
        self.free_blocks += 1;
        Ok(())
    }

    /// Get the number of free blocks
    pub const fn free_count(&self) -> u64 {
        self.free_blocks
    }

    /// Get the total number of blocks
    pub const fn total_count(&self) -> u64 {
        self.total_blocks
    }

    /// Get the number of blocks in use
    pub const fn allocated_count(&self) -> u64 {
        self.total_blocks - self.free_blocks
    }
}
