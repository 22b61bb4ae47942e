//! Flash controller abstraction
//!
//! The translation layer never touches flash directly. Everything it needs
//! from the array (free blocks, page state, programming, erasing, mapping
//! cost charges and statistics) goes through [`FlashController`].
//!
//! Issuing is synchronous: the call returns once the operation has been
//! performed, with the simulated latency added to the event.

use crate::error::Result;
use crate::event::Event;
use crate::stats::Stats;
use crate::types::{BlockKind, PageState, PhysicalAddress, PhysicalBlock, Status};

/// Services a translation layer consumes from the flash array
pub trait FlashController {
    /// Pages per erase block
    fn block_size(&self) -> usize;

    /// Largest payload a single page can hold, in bytes
    fn page_size(&self) -> usize;

    /// Take an erased block from the free pool
    ///
    /// Fails with [`crate::Error::OutOfBlocks`] when the pool is exhausted;
    /// callers propagate the error rather than retrying.
    fn allocate_block(&mut self, kind: BlockKind) -> Result<PhysicalBlock>;

    /// Tracked state of a physical page
    fn page_state(&self, address: PhysicalAddress) -> PageState;

    /// Number of valid pages in a block
    fn valid_pages(&self, block: PhysicalBlock) -> usize;

    /// Mark a single page as superseded
    fn invalidate_page(&mut self, address: PhysicalAddress);

    /// Retire a whole block and queue it for reclamation
    fn invalidate_block(&mut self, block: PhysicalBlock, kind: BlockKind);

    /// Erase a block right away and return it to the free pool
    ///
    /// The erase latency is charged to `event`.
    fn erase_block(
        &mut self,
        event: &mut Event,
        block: PhysicalBlock,
        kind: BlockKind,
    ) -> Result<()>;

    /// Record that a block changed role to `kind`
    fn promote_block(&mut self, kind: BlockKind);

    /// Perform the physical operation described by `event`
    fn issue(&mut self, event: &mut Event) -> Result<Status>;

    /// Charge the cost of consulting the mapping table
    fn charge_metadata_read(&mut self, event: &mut Event);

    /// Charge the cost of persisting a mapping update
    fn charge_metadata_write(&mut self, event: &mut Event);

    /// Statistics counters
    fn stats(&self) -> &Stats;

    /// True if the block has no valid pages left
    fn is_block_empty(&self, block: PhysicalBlock) -> bool {
        self.valid_pages(block) == 0
    }
}
