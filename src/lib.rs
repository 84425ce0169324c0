//! # Fragbus - Shared-Memory Fragment Exchange
//!
//! Fragbus hands off opaque binary records ("fragments") between
//! cooperating processes on a single host through a POSIX shared-memory
//! segment organized as a fixed-size array of buffers.
//!
//! ## Features
//!
//! - **Lock-free cross-process coordination**: atomic claim-then-verify
//!   ownership, no kernel mutexes between processes
//! - **Per-buffer state machine**: Empty → Writing → Full → Reading with
//!   crash recovery via stale-owner reclaim
//! - **Targeted delivery**: producers can address a buffer to one
//!   specific consumer
//! - **Record layer**: self-describing fragments with header-driven
//!   auto-sizing on read
//! - **Introspection**: readiness queries, ownership enumeration and a
//!   textual segment dump
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                Shared Segment                    │
//! ├──────────────────────────────────────────────────┤
//! │ SegmentHeader │ BufferDescriptor[N] │ payload[N] │
//! └──────────────────────────────────────────────────┘
//!      ▲                    ▲                  ▲
//!      │ attach             │ claim            │ copy
//! ┌────┴─────┐        ┌─────┴─────┐      ┌─────┴──────┐
//! │ producer │  ───▶  │  broker   │ ───▶ │  consumer  │
//! │ process  │        │ (states)  │      │  process   │
//! └──────────┘        └───────────┘      └────────────┘
//! ```
//!
//! A producer acquires a buffer by transitioning Empty→Writing, copies its
//! fragment in, and marks it Full; a consumer claims it Full→Reading,
//! copies the fragment out, and marks it Empty. A peer that crashes while
//! holding a buffer is reclaimed once its last touch is older than the
//! stale timeout.

// Core modules
pub mod error;
pub mod fragment;
pub mod layout;
pub mod manager;
pub mod segment;

// Main API re-exports
pub use error::{FragbusError, Result};
pub use fragment::{Fragment, FragmentHeader, FragmentManager, FragmentRecord, RawWord};
pub use layout::{BufferDescriptor, BufferState, SegmentHeader, READY_MAGIC, UNOWNED};
pub use manager::SegmentManager;
pub use segment::{force_unlink, shm_name, SegmentConfig};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
