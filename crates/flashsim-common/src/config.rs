//! Configuration types for FlashSim
//!
//! This module defines the simulation configuration: array geometry, FTL
//! parameters, timing model and logging.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for a simulation run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Flash array geometry
    #[serde(default)]
    pub geometry: GeometryConfig,
    /// Translation layer configuration
    #[serde(default)]
    pub ftl: FtlConfig,
    /// Simulated latency model
    #[serde(default)]
    pub timing: TimingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| Error::configuration(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check geometry and FTL parameters for consistency
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        if g.block_size == 0 || !g.block_size.is_power_of_two() {
            return Err(Error::configuration(format!(
                "block size {} is not a power of two",
                g.block_size
            )));
        }
        if g.page_size_bytes == 0 {
            return Err(Error::configuration("page size must be at least one byte"));
        }
        if g.logical_blocks == 0 {
            return Err(Error::configuration("logical space must hold at least one block"));
        }
        if self.ftl.log_limit == 0 {
            return Err(Error::configuration("log limit must be at least 1"));
        }

        // Every logical block may hold a data block, every log slot a log
        // block, and a merge needs one spare target.
        let required = g.logical_blocks + self.ftl.log_limit as u64 + 1;
        if g.physical_blocks < required {
            return Err(Error::configuration(format!(
                "{} physical blocks cannot back {} logical blocks with {} log blocks (need {})",
                g.physical_blocks, g.logical_blocks, self.ftl.log_limit, required
            )));
        }
        Ok(())
    }

    /// Total host-addressable pages
    #[must_use]
    pub const fn logical_pages(&self) -> u64 {
        self.geometry.logical_blocks * self.geometry.block_size as u64
    }

    /// Total physical pages in the array
    #[must_use]
    pub const fn physical_pages(&self) -> u64 {
        self.geometry.physical_blocks * self.geometry.block_size as u64
    }
}

/// Flash array geometry
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Pages per erase block (must be a power of two)
    pub block_size: usize,
    /// Erase blocks in the physical array
    pub physical_blocks: u64,
    /// Erase blocks exposed to the host
    pub logical_blocks: u64,
    /// Bytes per page
    pub page_size_bytes: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            physical_blocks: 1024,
            logical_blocks: 896,
            page_size_bytes: 4096,
        }
    }
}

/// Translation layer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FtlConfig {
    /// Maximum number of live log blocks
    pub log_limit: usize,
}

impl Default for FtlConfig {
    fn default() -> Self {
        Self { log_limit: 32 }
    }
}

/// Simulated operation latencies (microseconds)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub page_read: f64,
    pub page_write: f64,
    pub block_erase: f64,
    /// Cost of consulting the mapping table
    pub map_read: f64,
    /// Cost of persisting a mapping update
    pub map_write: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_read: 25.0,
            page_write: 200.0,
            block_erase: 1500.0,
            map_read: 25.0,
            map_write: 200.0,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
