//! FlashSim Storage - Simulated NAND flash array
//!
//! This crate provides the flash array the translation layer runs against:
//! - Per-page state tracking (free / valid / invalid) with stored payloads
//! - Bitmap-based free block pool
//! - Reclamation queue for retired blocks
//! - Simulated latencies for reads, programs, erases and mapping lookups

pub mod array;
pub mod block;
pub mod pool;

pub use array::SimulatedFlash;
pub use block::{FlashBlock, PageError};
pub use pool::FreeBlockPool;
