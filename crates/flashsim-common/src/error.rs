//! Error types for FlashSim
//!
//! This module defines the common error type used by every library crate.

use crate::types::BlockKind;
use thiserror::Error;

/// Common result type for FlashSim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for FlashSim
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no free {kind} block available")]
    OutOfBlocks { kind: BlockKind },

    #[error("logical address {address} out of range (limit {limit})")]
    AddressOutOfRange { address: u64, limit: u64 },

    #[error("payload of {len} bytes exceeds the {limit}-byte page")]
    PayloadTooLarge { len: usize, limit: usize },

    #[error("invalid physical address: {0}")]
    InvalidAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid physical address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Check if the free block pool ran dry
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::OutOfBlocks { .. })
    }

    /// Check if this error was raised while validating configuration
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
