//! Log blocks
//!
//! A log block absorbs out-of-place writes for one logical block. Pages are
//! appended to the physical block in arrival order; the slot table records,
//! per logical page offset, where its most recent copy lives.

use flashsim_common::{PhysicalAddress, PhysicalBlock};

/// Page-mapped record for one logical block being written out of place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBlock {
    physical: PhysicalBlock,
    slots: Vec<Option<usize>>,
    write_pointer: usize,
}

impl LogBlock {
    /// Empty log block backed by a freshly erased physical block
    #[must_use]
    pub fn new(physical: PhysicalBlock, block_size: usize) -> Self {
        Self {
            physical,
            slots: vec![None; block_size],
            write_pointer: 0,
        }
    }

    pub const fn physical_block(&self) -> PhysicalBlock {
        self.physical
    }

    /// Physical offset holding the latest copy of `page_offset`
    pub fn slot(&self, page_offset: usize) -> Option<usize> {
        self.slots.get(page_offset).copied().flatten()
    }

    /// Physical address of the latest copy of `page_offset`
    pub fn lookup(&self, page_offset: usize) -> Option<PhysicalAddress> {
        self.slot(page_offset).map(|offset| self.physical.page(offset))
    }

    /// Number of occupied slots
    pub fn valid_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// No physical page left to append to
    pub fn is_full(&self) -> bool {
        self.write_pointer >= self.slots.len()
    }

    /// Claim the next physical page for `page_offset`
    ///
    /// Returns the new address together with the superseded one, if the
    /// offset already had a copy in this block. `None` when the block is full.
    pub fn append(
        &mut self,
        page_offset: usize,
    ) -> Option<(PhysicalAddress, Option<PhysicalAddress>)> {
        if self.is_full() || page_offset >= self.slots.len() {
            return None;
        }
        let offset = self.write_pointer;
        self.write_pointer += 1;

        let previous = self.slots[page_offset].replace(offset);
        Some((
            self.physical.page(offset),
            previous.map(|p| self.physical.page(p)),
        ))
    }

    /// Forget the mapping for `page_offset`, returning the address it had
    pub fn clear(&mut self, page_offset: usize) -> Option<PhysicalAddress> {
        self.slots
            .get_mut(page_offset)
            .and_then(Option::take)
            .map(|offset| self.physical.page(offset))
    }

    /// True if every slot maps to its own offset
    ///
    /// Such a block was filled in logical order with no overwrites or gaps and
    /// already has the data-block layout, so it can be switched in place.
    pub fn is_sequential(&self) -> bool {
        self.slots
            .iter()
            .enumerate()
            .all(|(i, slot)| *slot == Some(i))
    }
}
