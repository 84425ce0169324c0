//! Error types and handling for Fragbus

use crate::layout::BufferState;

/// Result type alias for Fragbus operations
pub type Result<T> = std::result::Result<T, FragbusError>;

/// Error types for the shared-memory segment core
///
/// Transient unavailability (no ready buffer) is not an error: the acquire
/// operations on [`SegmentManager`](crate::manager::SegmentManager) return
/// `None` and the caller retries. Everything here indicates either a caller
/// bug, a setup failure, or a peer interfering mid-operation.
#[derive(Debug, thiserror::Error)]
pub enum FragbusError {
    /// I/O related errors (shm open, ftruncate, mmap)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Platform-specific failures surfaced by the OS
    #[error("Platform error: {message}")]
    Platform { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Segment construction never completed or the ready sentinel is gone
    #[error("Segment is not valid (key {key:#x})")]
    SegmentInvalid { key: u32 },

    /// Attached segment is too small for the geometry its header declares
    #[error("Segment geometry mismatch: mapped {mapped} bytes, header requires {required}")]
    GeometryMismatch { mapped: usize, required: usize },

    /// Request for a buffer index outside the segment
    #[error("Buffer {buffer} does not exist (segment has {count} buffers)")]
    BufferOutOfRange { buffer: usize, count: usize },

    /// Operation invoked against a buffer not in the required state
    #[error("Buffer {buffer} is in state {actual}, expected {expected}")]
    StateViolation {
        buffer: usize,
        expected: BufferState,
        actual: BufferState,
    },

    /// Operation invoked against a buffer owned by a different manager
    #[error("Buffer {buffer} is owned by manager {owner}, not manager {manager}")]
    OwnershipViolation {
        buffer: usize,
        owner: i32,
        manager: i32,
    },

    /// Read or write past the end of a buffer's payload slot
    #[error("Buffer {buffer} overflow: pos {pos} + {requested} exceeds capacity {capacity}")]
    Overflow {
        buffer: usize,
        pos: u64,
        requested: usize,
        capacity: u64,
    },

    /// Position increment of zero bytes
    #[error("Cannot increment position of buffer {buffer} by zero")]
    ZeroIncrement { buffer: usize },

    /// No buffer could be acquired for a fragment operation
    #[error("No buffer available")]
    NoBufferAvailable,

    /// Buffer ownership was lost to a stale reclaim during a read
    #[error("Ownership of buffer {buffer} was lost during read")]
    OwnershipLost { buffer: usize },
}

impl FragbusError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an out-of-range buffer error
    pub fn buffer_out_of_range(buffer: usize, count: usize) -> Self {
        Self::BufferOutOfRange { buffer, count }
    }

    /// Create a state violation error
    pub fn state_violation(buffer: usize, expected: BufferState, actual: BufferState) -> Self {
        Self::StateViolation {
            buffer,
            expected,
            actual,
        }
    }

    /// Create an ownership violation error
    pub fn ownership_violation(buffer: usize, owner: i32, manager: i32) -> Self {
        Self::OwnershipViolation {
            buffer,
            owner,
            manager,
        }
    }

    /// Create an overflow error
    pub fn overflow(buffer: usize, pos: u64, requested: usize, capacity: u64) -> Self {
        Self::Overflow {
            buffer,
            pos,
            requested,
            capacity,
        }
    }
}

impl From<nix::Error> for FragbusError {
    fn from(err: nix::Error) -> Self {
        Self::Platform {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FragbusError::platform("shm_open failed");
        assert!(matches!(err, FragbusError::Platform { .. }));

        let err = FragbusError::buffer_out_of_range(9, 4);
        assert!(matches!(err, FragbusError::BufferOutOfRange { .. }));

        let err = FragbusError::overflow(2, 1000, 64, 1024);
        assert!(matches!(err, FragbusError::Overflow { .. }));

        let err = FragbusError::ownership_violation(1, 3, 0);
        assert!(matches!(err, FragbusError::OwnershipViolation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = FragbusError::overflow(2, 1000, 64, 1024);
        let display = format!("{}", err);
        assert!(display.contains("Buffer 2 overflow"));
        assert!(display.contains("exceeds capacity 1024"));

        let err =
            FragbusError::state_violation(1, BufferState::Writing, BufferState::Full);
        let display = format!("{}", err);
        assert!(display.contains("in state Full"));
        assert!(display.contains("expected Writing"));
    }
}
