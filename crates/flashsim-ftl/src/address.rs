//! Logical address splitting
//!
//! Maps a logical page number onto (logical block, page offset):
//!
//! ```text
//! logical page:  [ block index ......... | offset ]
//!                  address >> shift        address & (block_size - 1)
//! ```

use flashsim_common::{Error, Result};

/// Splits logical page numbers using a power-of-two block size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSplitter {
    shift: u32,
    mask: u64,
}

impl AddressSplitter {
    /// Create a splitter for `block_size` pages per block
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size == 0 || !block_size.is_power_of_two() {
            return Err(Error::configuration(format!(
                "block size {block_size} is not a power of two"
            )));
        }
        Ok(Self {
            shift: block_size.trailing_zeros(),
            mask: block_size as u64 - 1,
        })
    }

    /// Pages per block
    pub const fn block_size(&self) -> usize {
        1 << self.shift
    }

    /// log2 of the block size
    pub const fn shift(&self) -> u32 {
        self.shift
    }

    /// Decompose a logical page number into (block index, page offset)
    #[inline]
    pub const fn split(&self, address: u64) -> (u64, usize) {
        (address >> self.shift, (address & self.mask) as usize)
    }

    /// Recombine a block index and page offset into a logical page number
    #[inline]
    pub const fn join(&self, block_index: u64, page_offset: usize) -> u64 {
        (block_index << self.shift) | page_offset as u64
    }
}
