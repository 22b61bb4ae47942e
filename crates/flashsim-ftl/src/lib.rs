//! FlashSim FTL - Block-associative sector translation
//!
//! This crate implements a hybrid log-block flash translation layer (BAST).
//! Host pages are grouped into logical blocks. Each logical block maps to a
//! physical data block through a block-level table, and may additionally own
//! one page-mapped log block that absorbs overwrites until it is merged back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Host requests   │  read / write / trim
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │     BastFtl      │
//! │  - BlockMap      │  logical block -> data block
//! │  - LogMap        │  logical block -> log block (bounded, FIFO)
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │ FlashController  │  allocation, page state, I/O, costs
//! └──────────────────┘
//! ```

pub mod address;
pub mod bast;
pub mod block_map;
pub mod layer;
pub mod log_block;
pub mod log_map;
pub mod shared;

pub use address::AddressSplitter;
pub use bast::{BastFtl, MergeKind};
pub use block_map::BlockMap;
pub use layer::TranslationLayer;
pub use log_block::LogBlock;
pub use log_map::LogMap;
pub use shared::SharedFtl;
