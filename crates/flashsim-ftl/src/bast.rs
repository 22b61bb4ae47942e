//! BAST translation engine
//!
//! Every logical block is backed by at most one data block (block-mapped) and
//! at most one log block (page-mapped). Writes always land in the log block;
//! when it fills up, or when its slot in the bounded log table is needed for
//! another logical block, the log block is merged back:
//!
//! - **switch merge**: the log block was filled strictly in order, so it
//!   becomes the data block as is.
//! - **random merge**: the live pages of the log block and the old data block
//!   are copied into a freshly allocated data block.
//!
//! Trims invalidate pages and erase a block immediately once it holds no
//! valid page.

use crate::address::AddressSplitter;
use crate::block_map::BlockMap;
use crate::layer::TranslationLayer;
use crate::log_block::LogBlock;
use crate::log_map::LogMap;
use flashsim_common::stats::incr;
use flashsim_common::{
    BlockKind, Config, Error, Event, FlashController, IoKind, PageState, PhysicalAddress,
    PhysicalBlock, Result, StatsSnapshot, Status,
};
use tracing::{debug, info, trace};

/// How a log block was folded back into its logical block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Switch,
    Full,
}

/// Block-associative sector translation layer
#[derive(Debug)]
pub struct BastFtl<C> {
    controller: C,
    splitter: AddressSplitter,
    logical_pages: u64,
    block_map: BlockMap,
    log_map: LogMap,
}

impl<C: FlashController> BastFtl<C> {
    /// Create an engine over `controller` exposing `logical_pages` pages
    ///
    /// `logical_pages` must be a whole number of blocks and `block_size` must
    /// match the controller's geometry.
    pub fn new(
        controller: C,
        logical_pages: u64,
        block_size: usize,
        log_limit: usize,
    ) -> Result<Self> {
        let splitter = AddressSplitter::new(block_size)?;
        if controller.block_size() != block_size {
            return Err(Error::configuration(format!(
                "block size {} does not match flash block size {}",
                block_size,
                controller.block_size()
            )));
        }
        if logical_pages == 0 || logical_pages % block_size as u64 != 0 {
            return Err(Error::configuration(format!(
                "logical space of {logical_pages} pages is not a whole number \
                 of {block_size}-page blocks"
            )));
        }
        if log_limit == 0 {
            return Err(Error::configuration("log limit must be at least 1"));
        }

        let logical_blocks = logical_pages >> splitter.shift();
        let address_bits = u64::BITS - (logical_pages - 1).leading_zeros();
        info!(
            "Address bits: {} (block index {}, page offset {})",
            address_bits,
            address_bits.saturating_sub(splitter.shift()),
            splitter.shift()
        );
        info!(
            "Mapping table size: {}KB ({} entries, log limit {})",
            logical_blocks * std::mem::size_of::<u64>() as u64 / 1024,
            logical_blocks,
            log_limit
        );
        info!("Using BAST FTL");

        Ok(Self {
            controller,
            splitter,
            logical_pages,
            block_map: BlockMap::new(logical_blocks as usize),
            log_map: LogMap::new(log_limit),
        })
    }

    /// Create an engine from a validated simulation config
    pub fn from_config(controller: C, config: &Config) -> Result<Self> {
        config.validate()?;
        Self::new(
            controller,
            config.logical_pages(),
            config.geometry.block_size,
            config.ftl.log_limit,
        )
    }

    pub const fn block_size(&self) -> usize {
        self.splitter.block_size()
    }

    pub const fn logical_pages(&self) -> u64 {
        self.logical_pages
    }

    /// Maximum number of live log blocks
    pub const fn log_limit(&self) -> usize {
        self.log_map.capacity()
    }

    pub const fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Number of live log blocks
    pub fn log_block_count(&self) -> usize {
        self.log_map.len()
    }

    /// Log block currently absorbing writes for a logical block
    pub fn log_block(&self, block_index: u64) -> Option<&LogBlock> {
        self.log_map.get(block_index)
    }

    /// Data block currently mapped to a logical block
    pub fn data_block(&self, block_index: u64) -> Option<PhysicalBlock> {
        self.block_map.get(block_index)
    }

    /// Physical page holding the current contents of a logical page
    ///
    /// The log block takes precedence over the data block. Pages that are
    /// not valid on flash resolve to `None`.
    pub fn resolve(&self, logical_address: u64) -> Option<PhysicalAddress> {
        if logical_address >= self.logical_pages {
            return None;
        }
        let (block_index, offset) = self.splitter.split(logical_address);
        self.locate(block_index, offset)
            .filter(|&address| self.controller.page_state(address) == PageState::Valid)
    }

    fn locate(&self, block_index: u64, offset: usize) -> Option<PhysicalAddress> {
        self.log_map
            .get(block_index)
            .and_then(|log| log.lookup(offset))
            .or_else(|| self.block_map.get(block_index).map(|data| data.page(offset)))
    }

    fn check_address(&self, logical_address: u64) -> Result<()> {
        if logical_address >= self.logical_pages {
            return Err(Error::AddressOutOfRange {
                address: logical_address,
                limit: self.logical_pages,
            });
        }
        Ok(())
    }

    /// Resolve a read to its current physical page and issue it
    pub fn read(&mut self, event: &mut Event) -> Result<Status> {
        let lpn = event.logical_address();
        self.check_address(lpn)?;

        incr(&self.controller.stats().memory_reads);
        let address = self.resolve(lpn);
        trace!("Read {} -> {:?}", lpn, address);
        event.set_address(address);

        self.controller.charge_metadata_read(event);
        incr(&self.controller.stats().ftl_reads);
        self.controller.issue(event)
    }

    /// Append a write to the logical block's log block and issue it
    ///
    /// A full log block is merged first and replaced by a fresh one.
    /// Payloads larger than a flash page are refused before any state changes.
    pub fn write(&mut self, event: &mut Event) -> Result<Status> {
        let lpn = event.logical_address();
        self.check_address(lpn)?;
        let limit = self.controller.page_size();
        let len = event.payload().map_or(0, |data| data.len());
        if len > limit {
            return Err(Error::PayloadTooLarge { len, limit });
        }
        let (block_index, offset) = self.splitter.split(lpn);

        if !self.log_map.contains(block_index) {
            self.allocate_log_block(block_index, event)?;
        }
        incr(&self.controller.stats().memory_reads);

        let address = match self.append(block_index, offset)? {
            Some(address) => address,
            None => {
                self.merge(block_index, event)?;
                self.allocate_log_block(block_index, event)?;
                self.append(block_index, offset)?.ok_or_else(|| {
                    Error::internal(format!("fresh log block for {block_index} is full"))
                })?
            }
        };
        trace!("Write {} -> {}", lpn, address);
        event.set_address(Some(address));

        self.controller.charge_metadata_read(event);
        incr(&self.controller.stats().ftl_writes);
        self.controller.issue(event)
    }

    /// Discard a logical page
    ///
    /// Both the log copy and the data copy are invalidated. A block left with
    /// no valid page is erased on the spot and its mapping dropped. Nothing
    /// is transferred, so the event is issued as a no-op.
    pub fn trim(&mut self, event: &mut Event) -> Result<Status> {
        let lpn = event.logical_address();
        self.check_address(lpn)?;
        let (block_index, offset) = self.splitter.split(lpn);
        incr(&self.controller.stats().memory_reads);

        let mut trimmed = None;

        if let Some(address) = self
            .log_map
            .get_mut(block_index)
            .and_then(|log| log.clear(offset))
        {
            self.controller.invalidate_page(address);
            trimmed = Some(address);

            if self.controller.is_block_empty(address.block) {
                self.log_map.remove(block_index);
                self.controller.erase_block(event, address.block, BlockKind::Log)?;
                incr(&self.controller.stats().eager_reclaims);
                debug!("Log block {} of {} emptied by trim", address.block, block_index);
            }
        }

        if let Some(data) = self.block_map.get(block_index) {
            let address = data.page(offset);
            self.controller.invalidate_page(address);
            trimmed.get_or_insert(address);

            if self.controller.is_block_empty(data) {
                self.block_map.unmap(block_index);
                self.controller.erase_block(event, data, BlockKind::Data)?;
                incr(&self.controller.stats().eager_reclaims);
                debug!("Data block {} of {} emptied by trim", data, block_index);
            }
        }

        trace!("Trim {} -> {:?}", lpn, trimmed);
        event.set_address(trimmed);
        event.set_noop(true);

        self.controller.charge_metadata_read(event);
        incr(&self.controller.stats().ftl_trims);
        self.controller.issue(event)
    }

    fn append(&mut self, block_index: u64, offset: usize) -> Result<Option<PhysicalAddress>> {
        let log = self
            .log_map
            .get_mut(block_index)
            .ok_or_else(|| Error::internal(format!("no log block for {block_index}")))?;

        let Some((address, superseded)) = log.append(offset) else {
            return Ok(None);
        };
        if let Some(old) = superseded {
            self.controller.invalidate_page(old);
        }
        Ok(Some(address))
    }

    /// Give `block_index` a fresh log block, evicting the oldest if needed
    fn allocate_log_block(&mut self, block_index: u64, event: &mut Event) -> Result<()> {
        if self.log_map.is_full() {
            let victim = self
                .log_map
                .oldest()
                .ok_or_else(|| Error::internal("full log map has no oldest entry"))?;
            incr(&self.controller.stats().log_evictions);
            let kind = self.merge(victim, event)?;
            debug!("Evicted log block of {} ({:?} merge)", victim, kind);
        }

        let physical = self.controller.allocate_block(BlockKind::Log)?;
        trace!("Log block {} assigned to {}", physical, block_index);
        let log = LogBlock::new(physical, self.block_size());
        self.log_map.insert(block_index, log)
    }

    /// Fold the log block of `block_index` back into a data block
    fn merge(&mut self, block_index: u64, event: &mut Event) -> Result<MergeKind> {
        let sequential = self
            .log_map
            .get(block_index)
            .ok_or_else(|| no_log_block(block_index))?
            .is_sequential();

        if sequential {
            self.switch_merge(block_index, event)?;
            Ok(MergeKind::Switch)
        } else {
            self.full_merge(block_index, event)?;
            Ok(MergeKind::Full)
        }
    }

    fn switch_merge(&mut self, block_index: u64, event: &mut Event) -> Result<()> {
        let log = self
            .log_map
            .remove(block_index)
            .ok_or_else(|| no_log_block(block_index))?;

        self.controller.promote_block(BlockKind::Data);
        if let Some(old) = self.block_map.set(block_index, log.physical_block()) {
            self.controller.invalidate_block(old, BlockKind::Data);
        }
        self.controller.charge_metadata_write(event);
        incr(&self.controller.stats().log_merge_switch);

        debug!(
            "Switched log block {} in as data block of {}",
            log.physical_block(),
            block_index
        );
        Ok(())
    }

    fn full_merge(&mut self, block_index: u64, event: &mut Event) -> Result<()> {
        let log = self
            .log_map
            .get(block_index)
            .ok_or_else(|| no_log_block(block_index))?;
        let log_physical = log.physical_block();
        let data = self.block_map.get(block_index);
        let sources: Vec<(usize, PhysicalAddress)> = (0..self.block_size())
            .filter_map(|offset| {
                log.lookup(offset)
                    .or_else(|| data.map(|block| block.page(offset)))
                    .map(|source| (offset, source))
            })
            .filter(|&(_, source)| self.controller.page_state(source) == PageState::Valid)
            .collect();

        // Mappings change only once every live page sits in the target
        let target = self.controller.allocate_block(BlockKind::Data)?;
        if let Err(e) = self.copy_pages(block_index, &sources, target, event) {
            self.controller.invalidate_block(target, BlockKind::Data);
            return Err(e);
        }

        self.log_map.remove(block_index);
        self.controller.invalidate_block(log_physical, BlockKind::Log);
        if let Some(old) = data {
            self.controller.invalidate_block(old, BlockKind::Data);
        }
        self.block_map.set(block_index, target);
        self.controller.charge_metadata_write(event);
        incr(&self.controller.stats().log_merge_full);

        debug!("Merged {} pages of {} into data block {}", sources.len(), block_index, target);
        Ok(())
    }

    fn copy_pages(
        &mut self,
        block_index: u64,
        sources: &[(usize, PhysicalAddress)],
        target: PhysicalBlock,
        event: &mut Event,
    ) -> Result<()> {
        for &(offset, source) in sources {
            let lpn = self.splitter.join(block_index, offset);
            let mut read = Event::new(IoKind::Read, lpn, event.start_time());
            read.set_address(Some(source));
            self.issue_internal(&mut read)?;

            let mut write = Event::new(IoKind::Write, lpn, read.end_time());
            write.set_address(Some(target.page(offset)));
            write.set_payload(read.take_payload());
            self.issue_internal(&mut write)?;

            event.consolidate(&read);
            event.consolidate(&write);
            incr(&self.controller.stats().ftl_reads);
            incr(&self.controller.stats().ftl_writes);
        }
        Ok(())
    }

    fn issue_internal(&mut self, event: &mut Event) -> Result<()> {
        if self.controller.issue(event)?.is_success() {
            return Ok(());
        }
        Err(Error::internal(format!(
            "merge {:?} of {:?} failed",
            event.kind(),
            event.address()
        )))
    }
}

fn no_log_block(block_index: u64) -> Error {
    Error::internal(format!("no log block to merge for {block_index}"))
}

impl<C: FlashController> TranslationLayer for BastFtl<C> {
    fn read(&mut self, event: &mut Event) -> Result<Status> {
        Self::read(self, event)
    }

    fn write(&mut self, event: &mut Event) -> Result<Status> {
        Self::write(self, event)
    }

    fn trim(&mut self, event: &mut Event) -> Result<Status> {
        Self::trim(self, event)
    }

    fn stats(&self) -> StatsSnapshot {
        self.controller.stats().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashsim_common::config::{GeometryConfig, TimingConfig};
    use flashsim_common::{Stats, StatsSnapshot};
    use flashsim_storage::SimulatedFlash;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    fn config(
        block_size: usize,
        logical_blocks: u64,
        physical_blocks: u64,
        log_limit: usize,
    ) -> Config {
        let mut config = Config::default();
        config.geometry.block_size = block_size;
        config.geometry.logical_blocks = logical_blocks;
        config.geometry.physical_blocks = physical_blocks;
        config.ftl.log_limit = log_limit;
        config
    }

    fn engine(block_size: usize, logical_blocks: u64, log_limit: usize) -> BastFtl<SimulatedFlash> {
        let config = config(
            block_size,
            logical_blocks,
            logical_blocks + log_limit as u64 + 1,
            log_limit,
        );
        let flash = SimulatedFlash::from_config(&config).unwrap();
        BastFtl::from_config(flash, &config).unwrap()
    }

    fn write(ftl: &mut BastFtl<SimulatedFlash>, lpn: u64, data: &str) -> Event {
        let mut event = Event::write(lpn, data.as_bytes().to_vec(), 0.0);
        assert_eq!(ftl.write(&mut event).unwrap(), Status::Success);
        event
    }

    fn read(ftl: &mut BastFtl<SimulatedFlash>, lpn: u64) -> Event {
        let mut event = Event::read(lpn, 0.0);
        assert_eq!(ftl.read(&mut event).unwrap(), Status::Success);
        event
    }

    fn trim(ftl: &mut BastFtl<SimulatedFlash>, lpn: u64) -> Event {
        let mut event = Event::trim(lpn, 0.0);
        assert_eq!(ftl.trim(&mut event).unwrap(), Status::Success);
        event
    }

    fn contents(ftl: &mut BastFtl<SimulatedFlash>, lpn: u64) -> Option<Vec<u8>> {
        read(ftl, lpn).payload().map(|p| p.to_vec())
    }

    fn stats(ftl: &BastFtl<SimulatedFlash>) -> StatsSnapshot {
        ftl.controller().stats().snapshot()
    }

    #[test]
    fn test_fresh_reads_are_unmapped() {
        let mut ftl = engine(4, 4, 2);
        for lpn in 0..16 {
            let event = read(&mut ftl, lpn);
            assert_eq!(event.address(), None);
            assert!(event.payload().is_none());
        }
        assert_eq!(stats(&ftl).flash_reads, 0);
        assert_eq!(stats(&ftl).ftl_reads, 16);
    }

    #[test]
    fn test_read_after_write() {
        let mut ftl = engine(4, 4, 2);
        let written = write(&mut ftl, 5, "hello");

        let event = read(&mut ftl, 5);
        assert_eq!(event.address(), written.address());
        assert_eq!(event.payload().unwrap().as_ref(), b"hello");
        assert_eq!(ftl.resolve(5), written.address());
        assert_eq!(ftl.resolve(4), None);
    }

    #[test]
    fn test_overwrite_in_log_invalidates_old_copy() {
        let mut ftl = engine(4, 4, 2);
        let first = write(&mut ftl, 1, "a").address().unwrap();
        let second = write(&mut ftl, 1, "b").address().unwrap();

        assert_eq!(second.block, first.block);
        assert_eq!(second.page, first.page + 1);
        assert_eq!(ftl.controller().page_state(first), PageState::Invalid);
        assert_eq!(contents(&mut ftl, 1).unwrap(), b"b");
        assert_eq!(ftl.log_block(0).unwrap().valid_count(), 1);
    }

    #[test]
    fn test_out_of_range_addresses_rejected() {
        let mut ftl = engine(4, 2, 1);
        let before = stats(&ftl);

        let mut event = Event::write(8, vec![1u8], 0.0);
        let err = ftl.write(&mut event).unwrap_err();
        assert!(matches!(err, Error::AddressOutOfRange { address: 8, limit: 8 }));
        assert!(ftl.read(&mut Event::read(100, 0.0)).is_err());
        assert!(ftl.trim(&mut Event::trim(8, 0.0)).is_err());

        assert_eq!(stats(&ftl), before);
        assert_eq!(ftl.resolve(8), None);
    }

    #[test]
    fn test_sequential_fill_switches() {
        let mut ftl = engine(4, 4, 1);
        for lpn in 0..4 {
            write(&mut ftl, lpn, &format!("v{lpn}"));
        }
        let log_physical = ftl.log_block(0).unwrap().physical_block();
        assert!(ftl.log_block(0).unwrap().is_sequential());
        assert_eq!(ftl.data_block(0), None);

        // Full log block: the next write merges it first
        let event = write(&mut ftl, 0, "new");
        assert_eq!(event.count_sub_ops(IoKind::Read), 0);
        assert_eq!(event.count_sub_ops(IoKind::Write), 0);

        let s = stats(&ftl);
        assert_eq!(s.log_merge_switch, 1);
        assert_eq!(s.log_merge_full, 0);
        assert_eq!(s.blocks_promoted, 1);
        assert_eq!(s.flash_reads, 0);
        assert_eq!(s.flash_writes, 5);
        assert_eq!(s.map_writes, 1);

        assert_eq!(ftl.data_block(0), Some(log_physical));
        assert_ne!(ftl.log_block(0).unwrap().physical_block(), log_physical);
        assert_eq!(contents(&mut ftl, 0).unwrap(), b"new");
        for lpn in 1..4 {
            assert_eq!(contents(&mut ftl, lpn).unwrap(), format!("v{lpn}").as_bytes());
        }
    }

    #[test]
    fn test_switch_and_full_merge_agree() {
        let mut switched = engine(4, 4, 1);
        let mut merged = engine(4, 4, 1);
        for lpn in 0..4 {
            write(&mut switched, lpn, &format!("p{lpn}"));
        }
        for lpn in (0..4).rev() {
            write(&mut merged, lpn, &format!("p{lpn}"));
        }

        // Writing another logical block evicts the only log block
        write(&mut switched, 4, "x");
        write(&mut merged, 4, "x");

        assert_eq!(stats(&switched).log_merge_switch, 1);
        assert_eq!(stats(&switched).flash_reads, 0);
        assert_eq!(stats(&merged).log_merge_full, 1);
        assert_eq!(stats(&merged).flash_reads, 4);
        assert_eq!(stats(&merged).log_evictions, 1);

        for lpn in 0..5 {
            assert_eq!(contents(&mut switched, lpn), contents(&mut merged, lpn));
        }
        assert_eq!(contents(&mut merged, 2).unwrap(), b"p2");
    }

    #[test]
    fn test_full_merge_copies_live_pages_only() {
        let mut ftl = engine(4, 4, 2);
        write(&mut ftl, 0, "a0");
        write(&mut ftl, 2, "a2");
        write(&mut ftl, 0, "b0");
        write(&mut ftl, 0, "c0");
        assert!(ftl.log_block(0).unwrap().is_full());
        let old_log = ftl.log_block(0).unwrap().physical_block();

        let before = stats(&ftl);
        let event = write(&mut ftl, 1, "d1");
        assert_eq!(event.count_sub_ops(IoKind::Read), 2);
        assert_eq!(event.count_sub_ops(IoKind::Write), 2);

        let s = stats(&ftl);
        assert_eq!(s.log_merge_full, 1);
        assert_eq!(s.flash_reads - before.flash_reads, 2);
        assert_eq!(s.ftl_writes - before.ftl_writes, 3);
        assert!(ftl.controller().is_queued(old_log));

        let data = ftl.data_block(0).unwrap();
        assert_eq!(ftl.controller().page_state(data.page(1)), PageState::Free);
        assert_eq!(ftl.controller().page_state(data.page(3)), PageState::Free);

        assert_eq!(contents(&mut ftl, 0).unwrap(), b"c0");
        assert_eq!(contents(&mut ftl, 1).unwrap(), b"d1");
        assert_eq!(contents(&mut ftl, 2).unwrap(), b"a2");
        assert_eq!(contents(&mut ftl, 3), None);
        assert_eq!(read(&mut ftl, 3).address(), None);
    }

    #[test]
    fn test_merge_after_switch_uses_per_offset_precedence() {
        let mut ftl = engine(4, 4, 1);
        for lpn in 0..4 {
            write(&mut ftl, lpn, &format!("a{lpn}"));
        }
        write(&mut ftl, 1, "b1");
        assert_eq!(stats(&ftl).log_merge_switch, 1);
        let first_data = ftl.data_block(0).unwrap();

        // Offset 3 loses its only copy; offset 1 keeps rewriting the log
        trim(&mut ftl, 3);
        write(&mut ftl, 1, "c1");
        write(&mut ftl, 1, "d1");
        write(&mut ftl, 1, "e1");
        assert!(ftl.log_block(0).unwrap().is_full());

        let event = write(&mut ftl, 0, "f0");
        assert_eq!(event.count_sub_ops(IoKind::Read), 3);
        assert_eq!(event.count_sub_ops(IoKind::Write), 3);
        assert_eq!(stats(&ftl).log_merge_full, 1);
        assert!(ftl.controller().is_queued(first_data));

        assert_eq!(contents(&mut ftl, 0).unwrap(), b"f0");
        assert_eq!(contents(&mut ftl, 1).unwrap(), b"e1");
        assert_eq!(contents(&mut ftl, 2).unwrap(), b"a2");
        assert_eq!(contents(&mut ftl, 3), None);
    }

    #[test]
    fn test_merge_takes_every_offset_from_a_complete_log() {
        let mut ftl = engine(4, 4, 1);
        for lpn in 0..4 {
            write(&mut ftl, lpn, "old");
        }
        write(&mut ftl, 1, "n1");
        let first_data = ftl.data_block(0).unwrap();
        write(&mut ftl, 0, "n0");
        write(&mut ftl, 2, "n2");
        write(&mut ftl, 3, "n3");

        // Evicted through a full merge: the log covers all four offsets
        let event = write(&mut ftl, 4, "x");
        let sources: Vec<_> = event
            .sub_ops()
            .iter()
            .filter(|op| op.kind == IoKind::Read)
            .filter_map(|op| op.address)
            .collect();
        assert_eq!(sources.len(), 4);
        assert!(sources.iter().all(|a| a.block != first_data));
        assert!(ftl.controller().is_queued(first_data));

        for lpn in 0..4 {
            assert_eq!(contents(&mut ftl, lpn).unwrap(), format!("n{lpn}").as_bytes());
        }
    }

    #[test]
    fn test_log_map_evicts_oldest() {
        let mut ftl = engine(4, 16, 3);
        for block in 0..10u64 {
            write(&mut ftl, block * 4, &format!("b{block}"));
            assert!(ftl.log_block_count() <= 3);
            if block == 3 {
                assert!(ftl.log_block(0).is_none());
                assert!(ftl.data_block(0).is_some());
                assert!((1..4).all(|b| ftl.log_block(b).is_some()));
            }
        }
        assert_eq!(stats(&ftl).log_evictions, 7);
        assert_eq!(ftl.log_block_count(), 3);
        for block in 0..10u64 {
            assert_eq!(contents(&mut ftl, block * 4).unwrap(), format!("b{block}").as_bytes());
        }
    }

    #[test]
    fn test_trim_reclaims_empty_log_block() {
        let mut ftl = engine(4, 4, 2);
        write(&mut ftl, 0, "a");
        write(&mut ftl, 1, "b");
        let log = ftl.log_block(0).unwrap().physical_block();

        trim(&mut ftl, 0);
        assert!(ftl.log_block(0).is_some());
        assert_eq!(stats(&ftl).eager_reclaims, 0);

        let event = trim(&mut ftl, 1);
        assert!(ftl.log_block(0).is_none());
        assert!(!ftl.controller().is_allocated(log));
        assert_eq!(event.count_sub_ops(IoKind::Erase), 1);
        assert_eq!(stats(&ftl).eager_reclaims, 1);
        assert_eq!(stats(&ftl).flash_erases, 1);
        assert_eq!(contents(&mut ftl, 0), None);
        assert_eq!(contents(&mut ftl, 1), None);
    }

    #[test]
    fn test_trim_reclaims_empty_data_block() {
        let mut ftl = engine(4, 4, 2);
        for lpn in 0..4 {
            write(&mut ftl, lpn, "d");
        }
        write(&mut ftl, 0, "e");
        let data = ftl.data_block(0).unwrap();

        // Log copy of 0 goes first, taking its block with it
        trim(&mut ftl, 0);
        assert!(ftl.log_block(0).is_none());
        assert_eq!(ftl.data_block(0), Some(data));

        trim(&mut ftl, 1);
        trim(&mut ftl, 2);
        assert_eq!(ftl.data_block(0), Some(data));
        trim(&mut ftl, 3);

        assert_eq!(ftl.data_block(0), None);
        assert!(!ftl.controller().is_allocated(data));
        assert_eq!(stats(&ftl).eager_reclaims, 2);
        for lpn in 0..4 {
            assert_eq!(read(&mut ftl, lpn).address(), None);
        }

        // The block is reusable afterwards
        write(&mut ftl, 2, "again");
        assert_eq!(contents(&mut ftl, 2).unwrap(), b"again");
    }

    #[test]
    fn test_trim_of_unmapped_page_is_noop() {
        let mut ftl = engine(4, 4, 2);
        let event = trim(&mut ftl, 6);
        assert!(event.is_noop());
        assert_eq!(event.address(), None);
        assert_eq!(event.time_taken(), TimingConfig::default().map_read);

        let s = stats(&ftl);
        assert_eq!(s.ftl_trims, 1);
        assert_eq!(s.flash_erases, 0);
    }

    #[test]
    fn test_latency_accounting() {
        let timing = TimingConfig::default();
        let mut ftl = engine(4, 4, 1);

        let event = write(&mut ftl, 0, "x");
        assert_eq!(event.time_taken(), timing.map_read + timing.page_write);

        let event = read(&mut ftl, 0);
        assert_eq!(event.time_taken(), timing.map_read + timing.page_read);
        assert_eq!(event.end_time(), event.start_time() + event.time_taken());

        // Eviction merge of one live page: copy + mapping update + the write
        let event = write(&mut ftl, 4, "y");
        let expected = timing.page_read
            + timing.page_write
            + timing.map_write
            + timing.map_read
            + timing.page_write;
        assert_eq!(event.time_taken(), expected);
    }

    #[test]
    fn test_exhausted_pool_is_reported() {
        let geometry = GeometryConfig {
            block_size: 4,
            physical_blocks: 1,
            logical_blocks: 2,
            page_size_bytes: 512,
        };
        let flash = SimulatedFlash::new(&geometry, TimingConfig::default()).unwrap();
        let mut ftl = BastFtl::new(flash, 8, 4, 1).unwrap();

        write(&mut ftl, 0, "kept");
        let err = ftl.write(&mut Event::write(4, vec![1u8], 0.0)).unwrap_err();
        assert!(err.is_resource_exhaustion());

        // The failed merge left the existing mapping untouched
        assert!(ftl.log_block(0).is_some());
        assert_eq!(contents(&mut ftl, 0).unwrap(), b"kept");
    }

    #[test]
    fn test_oversized_write_rejected() {
        let geometry = GeometryConfig {
            block_size: 4,
            physical_blocks: 4,
            logical_blocks: 2,
            page_size_bytes: 4,
        };
        let flash = SimulatedFlash::new(&geometry, TimingConfig::default()).unwrap();
        let mut ftl = BastFtl::new(flash, 8, 4, 1).unwrap();

        let err = ftl.write(&mut Event::write(1, b"12345".to_vec(), 0.0)).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { len: 5, limit: 4 }));
        assert!(ftl.log_block(0).is_none());
        assert_eq!(stats(&ftl).ftl_writes, 0);
        assert_eq!(stats(&ftl).memory_reads, 0);

        write(&mut ftl, 1, "1234");
        assert_eq!(contents(&mut ftl, 1).unwrap(), b"1234");
    }

    /// Flash whose mapped reads report failure while `fail_reads` is set
    #[derive(Debug)]
    struct FlakyFlash {
        inner: SimulatedFlash,
        fail_reads: bool,
    }

    impl FlashController for FlakyFlash {
        fn block_size(&self) -> usize {
            self.inner.block_size()
        }

        fn page_size(&self) -> usize {
            self.inner.page_size()
        }

        fn allocate_block(&mut self, kind: BlockKind) -> Result<PhysicalBlock> {
            self.inner.allocate_block(kind)
        }

        fn page_state(&self, address: PhysicalAddress) -> PageState {
            self.inner.page_state(address)
        }

        fn valid_pages(&self, block: PhysicalBlock) -> usize {
            self.inner.valid_pages(block)
        }

        fn invalidate_page(&mut self, address: PhysicalAddress) {
            self.inner.invalidate_page(address);
        }

        fn invalidate_block(&mut self, block: PhysicalBlock, kind: BlockKind) {
            self.inner.invalidate_block(block, kind);
        }

        fn erase_block(
            &mut self,
            event: &mut Event,
            block: PhysicalBlock,
            kind: BlockKind,
        ) -> Result<()> {
            self.inner.erase_block(event, block, kind)
        }

        fn promote_block(&mut self, kind: BlockKind) {
            self.inner.promote_block(kind);
        }

        fn issue(&mut self, event: &mut Event) -> Result<Status> {
            if self.fail_reads && event.kind() == IoKind::Read && event.address().is_some() {
                return Ok(Status::Failure);
            }
            self.inner.issue(event)
        }

        fn charge_metadata_read(&mut self, event: &mut Event) {
            self.inner.charge_metadata_read(event);
        }

        fn charge_metadata_write(&mut self, event: &mut Event) {
            self.inner.charge_metadata_write(event);
        }

        fn stats(&self) -> &Stats {
            self.inner.stats()
        }
    }

    #[test]
    fn test_failed_merge_copy_keeps_log_block() {
        let config = config(4, 2, 4, 1);
        let inner = SimulatedFlash::from_config(&config).unwrap();
        let flash = FlakyFlash {
            inner,
            fail_reads: false,
        };
        let mut ftl = BastFtl::from_config(flash, &config).unwrap();

        for (lpn, data) in [(0, "a0"), (0, "b0"), (1, "a1"), (2, "a2")] {
            let mut event = Event::write(lpn, data.as_bytes().to_vec(), 0.0);
            assert_eq!(ftl.write(&mut event).unwrap(), Status::Success);
        }
        let log = ftl.log_block(0).unwrap().clone();
        assert!(log.is_full());
        assert!(!log.is_sequential());

        ftl.controller_mut().fail_reads = true;
        let mut event = Event::write(3, b"x".to_vec(), 0.0);
        assert!(matches!(ftl.write(&mut event), Err(Error::Internal(_))));

        // The log block still owns the pages and the half-written target is retired
        assert_eq!(ftl.log_block(0), Some(&log));
        assert_eq!(ftl.data_block(0), None);
        assert_eq!(ftl.controller().inner.queued_reclaims(), 1);
        assert_eq!(ftl.controller().stats().snapshot().log_merge_full, 0);

        ftl.controller_mut().fail_reads = false;
        let mut event = Event::write(3, b"x".to_vec(), 0.0);
        assert_eq!(ftl.write(&mut event).unwrap(), Status::Success);
        assert_eq!(ftl.controller().stats().snapshot().log_merge_full, 1);

        for (lpn, expected) in [(0, "b0"), (1, "a1"), (2, "a2"), (3, "x")] {
            let mut event = Event::read(lpn, 0.0);
            assert_eq!(ftl.read(&mut event).unwrap(), Status::Success);
            assert_eq!(event.payload().unwrap().as_ref(), expected.as_bytes());
        }
    }

    #[test]
    fn test_construction_validation() {
        let config = config(4, 4, 8, 2);
        let flash = || SimulatedFlash::from_config(&config).unwrap();

        assert!(BastFtl::new(flash(), 16, 8, 2).unwrap_err().is_configuration());
        assert!(BastFtl::new(flash(), 16, 3, 2).is_err());
        assert!(BastFtl::new(flash(), 14, 4, 2).is_err());
        assert!(BastFtl::new(flash(), 0, 4, 2).is_err());
        assert!(BastFtl::new(flash(), 16, 4, 0).is_err());

        let ftl = BastFtl::new(flash(), 16, 4, 2).unwrap();
        assert_eq!(ftl.block_size(), 4);
        assert_eq!(ftl.logical_pages(), 16);
        assert_eq!(ftl.log_limit(), 2);
        assert_eq!(ftl.log_block_count(), 0);
    }

    #[test]
    fn test_trait_dispatch() {
        let mut ftl = engine(4, 2, 1);
        let layer: &mut dyn TranslationLayer = &mut ftl;
        layer.write(&mut Event::write(3, vec![9u8], 0.0)).unwrap();

        let mut event = Event::read(3, 0.0);
        layer.read(&mut event).unwrap();
        assert_eq!(event.payload().unwrap().as_ref(), &[9u8]);
        assert_eq!(layer.stats().ftl_writes, 1);
        assert_eq!(layer.stats().ftl_reads, 1);
    }

    #[test]
    fn test_random_workload_matches_model() {
        let block_size = 8;
        let logical_blocks = 8;
        let log_limit = 3;
        let mut ftl = engine(block_size, logical_blocks, log_limit);
        let pages = logical_blocks * block_size as u64;
        let mut model: HashMap<u64, Vec<u8>> = HashMap::new();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut host_writes = 0;

        for step in 0..5000u32 {
            let lpn = rng.gen_range(0..pages);
            match rng.gen_range(0..10) {
                0..=5 => {
                    let data = format!("{lpn}:{step}");
                    write(&mut ftl, lpn, &data);
                    model.insert(lpn, data.into_bytes());
                    host_writes += 1;
                }
                6..=7 => {
                    trim(&mut ftl, lpn);
                    model.remove(&lpn);
                }
                _ => {
                    assert_eq!(contents(&mut ftl, lpn).as_ref(), model.get(&lpn), "lpn {lpn}");
                }
            }
            assert!(ftl.log_block_count() <= log_limit);
        }

        for lpn in 0..pages {
            assert_eq!(contents(&mut ftl, lpn).as_ref(), model.get(&lpn), "lpn {lpn}");
        }
        let s = stats(&ftl);
        assert!(s.merges() > 0);
        assert!(s.write_amplification(host_writes) > 1.0);
    }
}
