//! Simulated flash array
//!
//! [`SimulatedFlash`] keeps per-page state and payloads for every physical
//! block, hands out erased blocks from a [`FreeBlockPool`], and holds a
//! reclamation queue of retired blocks. Queued blocks are erased lazily when
//! the pool runs dry or when [`SimulatedFlash::collect_garbage`] is called.

use crate::block::FlashBlock;
use crate::pool::FreeBlockPool;
use flashsim_common::config::{Config, GeometryConfig, TimingConfig};
use flashsim_common::stats::incr;
use flashsim_common::{
    BlockKind, Error, Event, FlashController, IoKind, PageState, PhysicalAddress, PhysicalBlock,
    Result, Stats, Status,
};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// In-memory NAND array implementing [`FlashController`]
#[derive(Debug)]
pub struct SimulatedFlash {
    block_size: usize,
    page_size: usize,
    blocks: Vec<FlashBlock>,
    pool: FreeBlockPool,
    reclaim_queue: VecDeque<PhysicalBlock>,
    timing: TimingConfig,
    stats: Stats,
}

impl SimulatedFlash {
    /// Create an array with every block erased
    pub fn new(geometry: &GeometryConfig, timing: TimingConfig) -> Result<Self> {
        if geometry.block_size == 0 || !geometry.block_size.is_power_of_two() {
            return Err(Error::configuration(format!(
                "block size {} is not a power of two",
                geometry.block_size
            )));
        }
        if geometry.physical_blocks == 0 {
            return Err(Error::configuration("flash array needs at least one block"));
        }

        let blocks = (0..geometry.physical_blocks)
            .map(|_| FlashBlock::new(geometry.block_size))
            .collect();

        debug!(
            "Simulated flash: {} blocks x {} pages",
            geometry.physical_blocks, geometry.block_size
        );

        Ok(Self {
            block_size: geometry.block_size,
            page_size: geometry.page_size_bytes,
            blocks,
            pool: FreeBlockPool::new(geometry.physical_blocks),
            reclaim_queue: VecDeque::new(),
            timing,
            stats: Stats::new(),
        })
    }

    /// Build from a full simulation config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.geometry, config.timing.clone())
    }

    fn block(&self, block: PhysicalBlock) -> Option<&FlashBlock> {
        self.blocks.get(block.index() as usize)
    }

    fn block_mut(&mut self, block: PhysicalBlock) -> Result<&mut FlashBlock> {
        let total = self.blocks.len();
        self.blocks.get_mut(block.index() as usize).ok_or_else(|| {
            Error::invalid_address(format!("block {block} out of range (max {total})"))
        })
    }

    /// Erase a block and put it back into the free pool
    fn reclaim(&mut self, block: PhysicalBlock) -> Result<()> {
        self.block_mut(block)?.erase();
        self.pool.release(block.index())?;
        incr(&self.stats.flash_erases);
        Ok(())
    }

    /// Erase every queued block, returning how many were reclaimed
    pub fn collect_garbage(&mut self) -> Result<usize> {
        let mut reclaimed = 0;
        while let Some(block) = self.reclaim_queue.pop_front() {
            self.reclaim(block)?;
            reclaimed += 1;
        }
        if reclaimed > 0 {
            debug!("Reclaimed {} queued blocks", reclaimed);
        }
        Ok(reclaimed)
    }

    /// Erased blocks ready for allocation
    pub const fn free_blocks(&self) -> u64 {
        self.pool.free_count()
    }

    /// Blocks waiting for reclamation
    pub fn queued_reclaims(&self) -> usize {
        self.reclaim_queue.len()
    }

    /// True if the block sits in the reclamation queue
    pub fn is_queued(&self, block: PhysicalBlock) -> bool {
        self.reclaim_queue.contains(&block)
    }

    /// True if the block is currently handed out (or queued, not yet erased)
    pub fn is_allocated(&self, block: PhysicalBlock) -> bool {
        self.pool.is_allocated(block.index())
    }

    pub fn erase_count(&self, block: PhysicalBlock) -> u64 {
        self.block(block).map_or(0, FlashBlock::erase_count)
    }

    pub fn block_kind(&self, block: PhysicalBlock) -> Option<BlockKind> {
        self.block(block).and_then(FlashBlock::kind)
    }

    fn issue_read(&mut self, event: &mut Event) -> Status {
        let Some(address) = event.address() else {
            // Never-written page: served as zeroes without touching flash
            event.set_payload(None);
            return Status::Success;
        };
        let Some(block) = self.block(address.block) else {
            warn!("Read of out-of-range address {}", address);
            return Status::Failure;
        };

        let payload = block.read(address.page).cloned();
        event.set_payload(payload);
        event.incr_time_taken(self.timing.page_read);
        incr(&self.stats.flash_reads);
        Status::Success
    }

    fn issue_write(&mut self, event: &mut Event) -> Result<Status> {
        let address = event
            .address()
            .ok_or_else(|| Error::internal("write issued without a physical address"))?;
        let payload = event.payload().cloned();
        let len = payload.as_ref().map_or(0, |data| data.len());
        if len > self.page_size {
            warn!(
                "Program of {} refused: {} bytes exceed the {}-byte page",
                address, len, self.page_size
            );
            return Ok(Status::Failure);
        }

        match self.block_mut(address.block)?.program(address.page, payload) {
            Ok(()) => {
                event.incr_time_taken(self.timing.page_write);
                incr(&self.stats.flash_writes);
                Ok(Status::Success)
            }
            Err(e) => {
                warn!("Program of {} refused: {}", address, e);
                Ok(Status::Failure)
            }
        }
    }
}

impl FlashController for SimulatedFlash {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn allocate_block(&mut self, kind: BlockKind) -> Result<PhysicalBlock> {
        let index = match self.pool.allocate() {
            Some(index) => index,
            None => {
                self.collect_garbage()?;
                self.pool.allocate().ok_or(Error::OutOfBlocks { kind })?
            }
        };

        let block = PhysicalBlock::new(index);
        self.block_mut(block)?.set_kind(Some(kind));
        trace!("Allocated {} block {}", kind, block);
        Ok(block)
    }

    fn page_state(&self, address: PhysicalAddress) -> PageState {
        self.block(address.block)
            .map_or(PageState::Invalid, |b| b.state(address.page))
    }

    fn valid_pages(&self, block: PhysicalBlock) -> usize {
        self.block(block).map_or(0, FlashBlock::valid_count)
    }

    fn invalidate_page(&mut self, address: PhysicalAddress) {
        if let Ok(block) = self.block_mut(address.block) {
            block.invalidate(address.page);
        }
    }

    fn invalidate_block(&mut self, block: PhysicalBlock, kind: BlockKind) {
        let Ok(b) = self.block_mut(block) else {
            warn!("Invalidate of out-of-range {} block {}", kind, block);
            return;
        };
        b.invalidate_all();
        if !self.reclaim_queue.contains(&block) {
            self.reclaim_queue.push_back(block);
        }
        trace!("Queued {} block {} for reclamation", kind, block);
    }

    fn erase_block(
        &mut self,
        event: &mut Event,
        block: PhysicalBlock,
        kind: BlockKind,
    ) -> Result<()> {
        let mut erase = Event::new(IoKind::Erase, event.logical_address(), event.end_time());
        erase.set_address(Some(block.page(0)));
        self.issue(&mut erase)?;
        event.consolidate(&erase);

        debug!("Erased {} block {} eagerly", kind, block);
        Ok(())
    }

    fn promote_block(&mut self, kind: BlockKind) {
        if kind == BlockKind::Data {
            incr(&self.stats.blocks_promoted);
        }
    }

    fn issue(&mut self, event: &mut Event) -> Result<Status> {
        if event.is_noop() {
            return Ok(Status::Success);
        }

        match event.kind() {
            IoKind::Read => Ok(self.issue_read(event)),
            IoKind::Write => self.issue_write(event),
            IoKind::Erase => {
                let address = event
                    .address()
                    .ok_or_else(|| Error::internal("erase issued without a physical address"))?;
                self.reclaim_queue.retain(|&queued| queued != address.block);
                self.reclaim(address.block)?;
                event.incr_time_taken(self.timing.block_erase);
                Ok(Status::Success)
            }
            // A trim that reaches flash carries no data transfer
            IoKind::Trim => Ok(Status::Success),
        }
    }

    fn charge_metadata_read(&mut self, event: &mut Event) {
        event.incr_time_taken(self.timing.map_read);
        incr(&self.stats.map_reads);
    }

    fn charge_metadata_write(&mut self, event: &mut Event) {
        event.incr_time_taken(self.timing.map_write);
        incr(&self.stats.map_writes);
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
