//! Constants for the shared segment layout

use std::time::Duration;

/// Sentinel written by the segment creator exactly once, after the
/// descriptor array is fully initialized. Attachers spin on this value
/// before touching any other field.
pub const READY_MAGIC: u32 = 0xCAFE1111;

/// Owner id meaning "unowned / available to any manager"
pub const UNOWNED: i32 = -1;

/// Sleep interval while an attacher waits for the creator to finish
/// initializing the segment
pub const ATTACH_POLL_INTERVAL: Duration = Duration::from_millis(1);
