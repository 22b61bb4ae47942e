//! Core type definitions for FlashSim
//!
//! Physical flash is addressed as (block, page-within-block). Logical pages
//! are plain `u64` page numbers; splitting them into block and offset is the
//! translation layer's job.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Handle to a physical erase block
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into,
)]
#[display("{_0}")]
pub struct PhysicalBlock(u64);

impl PhysicalBlock {
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Index of the block within the array
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }

    /// Address of a page inside this block
    #[must_use]
    pub const fn page(self, page: usize) -> PhysicalAddress {
        PhysicalAddress { block: self, page }
    }
}

/// Address of a single physical flash page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{block}:{page}")]
pub struct PhysicalAddress {
    /// Erase block holding the page
    pub block: PhysicalBlock,
    /// Page offset within the block
    pub page: usize,
}

/// Role a physical block currently plays for the translation layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Accepts out-of-place page writes for one logical block
    #[display("log")]
    Log,
    /// Holds a consolidated, offset-identity copy of one logical block
    #[display("data")]
    Data,
}

/// Tracked state of a physical page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageState {
    /// Erased, may be programmed
    #[default]
    Free,
    /// Holds live data
    Valid,
    /// Holds superseded or trimmed data; unusable until erased
    Invalid,
}

/// Kind of an I/O event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum IoKind {
    #[display("read")]
    Read,
    #[display("write")]
    Write,
    #[display("erase")]
    Erase,
    #[display("trim")]
    Trim,
}

/// Completion status of an issued event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
