//! Physical erase block model
//!
//! A block is a fixed array of pages. Pages are programmed once and can only
//! return to the free state through an erase of the whole block.

use bytes::Bytes;
use flashsim_common::{BlockKind, PageState};
use thiserror::Error;

/// Errors raised by page-level operations on a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page {page} out of range (block holds {pages} pages)")]
    OutOfRange { page: usize, pages: usize },

    #[error("page {page} cannot be programmed in state {state:?}")]
    NotFree { page: usize, state: PageState },
}

#[derive(Debug, Clone, Default)]
struct Page {
    state: PageState,
    data: Option<Bytes>,
}

/// One physical erase block
#[derive(Debug, Clone)]
pub struct FlashBlock {
    pages: Vec<Page>,
    kind: Option<BlockKind>,
    erase_count: u64,
    valid: usize,
    invalid: usize,
}

impl FlashBlock {
    #[must_use]
    pub fn new(pages: usize) -> Self {
        Self {
            pages: vec![Page::default(); pages],
            kind: None,
            erase_count: 0,
            valid: 0,
            invalid: 0,
        }
    }

    fn check(&self, page: usize) -> Result<(), PageError> {
        if page >= self.pages.len() {
            return Err(PageError::OutOfRange {
                page,
                pages: self.pages.len(),
            });
        }
        Ok(())
    }

    /// State of a page; out-of-range pages read as invalid
    pub fn state(&self, page: usize) -> PageState {
        self.pages
            .get(page)
            .map_or(PageState::Invalid, |p| p.state)
    }

    /// Payload of a valid page
    pub fn read(&self, page: usize) -> Option<&Bytes> {
        self.pages
            .get(page)
            .filter(|p| p.state == PageState::Valid)
            .and_then(|p| p.data.as_ref())
    }

    /// Program a free page
    pub fn program(&mut self, page: usize, data: Option<Bytes>) -> Result<(), PageError> {
        self.check(page)?;
        let slot = &mut self.pages[page];
        if slot.state != PageState::Free {
            return Err(PageError::NotFree {
                page,
                state: slot.state,
            });
        }
        slot.state = PageState::Valid;
        slot.data = data;
        self.valid += 1;
        Ok(())
    }

    /// Mark a valid page as superseded; returns true if the state changed
    pub fn invalidate(&mut self, page: usize) -> bool {
        match self.pages.get_mut(page) {
            Some(slot) if slot.state == PageState::Valid => {
                slot.state = PageState::Invalid;
                slot.data = None;
                self.valid -= 1;
                self.invalid += 1;
                true
            }
            _ => false,
        }
    }

    /// Invalidate every valid page
    pub fn invalidate_all(&mut self) {
        for page in 0..self.pages.len() {
            self.invalidate(page);
        }
    }

    /// Reset every page to free
    pub fn erase(&mut self) {
        for slot in &mut self.pages {
            *slot = Page::default();
        }
        self.valid = 0;
        self.invalid = 0;
        self.kind = None;
        self.erase_count += 1;
    }

    pub const fn valid_count(&self) -> usize {
        self.valid
    }

    pub const fn invalid_count(&self) -> usize {
        self.invalid
    }

    pub fn free_count(&self) -> usize {
        self.pages.len() - self.valid - self.invalid
    }

    pub const fn erase_count(&self) -> u64 {
        self.erase_count
    }

    pub const fn kind(&self) -> Option<BlockKind> {
        self.kind
    }

    pub const fn set_kind(&mut self, kind: Option<BlockKind>) {
        self.kind = kind;
    }
}
