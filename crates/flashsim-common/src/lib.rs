//! FlashSim Common - Shared types and the flash controller contract
//!
//! This crate provides the vocabulary shared by the translation layer, the
//! simulated flash array and the simulation driver: physical addressing,
//! I/O events, statistics counters, configuration and the error type.

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod stats;
pub mod types;

pub use config::Config;
pub use controller::FlashController;
pub use error::{Error, Result};
pub use event::{Event, SubOp};
pub use stats::{Stats, StatsSnapshot};
pub use types::*;
