//! Shared-memory segment plumbing: configuration and the OS-level handle

mod config;
mod shm;

pub use config::SegmentConfig;
pub use shm::{force_unlink, shm_name, RawSegment};
