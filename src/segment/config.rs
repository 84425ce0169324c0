//! Configuration for attaching to a shared segment

use serde::{Deserialize, Serialize};

use crate::error::{FragbusError, Result};

/// Default stale-owner timeout: 5 seconds
pub const DEFAULT_STALE_TIMEOUT_US: u64 = 5_000_000;

/// Configuration for creating or attaching to a segment
///
/// The geometry fields (`buffer_count`, `max_buffer_size`) only matter when
/// this process ends up creating the segment; an attacher adopts the
/// creator's geometry from the segment header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Host-wide segment key
    pub key: u32,
    /// Number of buffers in the segment
    pub buffer_count: usize,
    /// Payload capacity of each buffer in bytes
    pub max_buffer_size: usize,
    /// Microseconds without a touch before another manager may reclaim an
    /// owned buffer
    pub stale_timeout_us: u64,
    /// Writer-process identifier recorded in the header, for diagnostics
    pub rank: i32,
    /// Whether to create the segment if it does not exist
    pub create: bool,
}

impl SegmentConfig {
    /// Create a configuration with the default timeout
    pub fn new(key: u32, buffer_count: usize, max_buffer_size: usize) -> Self {
        Self {
            key,
            buffer_count,
            max_buffer_size,
            stale_timeout_us: DEFAULT_STALE_TIMEOUT_US,
            rank: -1,
            create: true,
        }
    }

    /// Set the stale-owner timeout in microseconds
    pub fn with_stale_timeout_us(mut self, timeout_us: u64) -> Self {
        self.stale_timeout_us = timeout_us;
        self
    }

    /// Set the diagnostic rank recorded by the creator
    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    /// Set whether to create the segment if it does not exist
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.buffer_count == 0 {
            return Err(FragbusError::invalid_parameter(
                "buffer_count",
                "Segment must have at least one buffer",
            ));
        }

        if self.max_buffer_size == 0 {
            return Err(FragbusError::invalid_parameter(
                "max_buffer_size",
                "Buffer size must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Total segment size implied by this geometry
    pub fn segment_size(&self) -> usize {
        crate::layout::segment_size(self.buffer_count, self.max_buffer_size)
    }
}
