//! Header structures shared between attached processes

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicU8, Ordering};

use super::constants::{READY_MAGIC, UNOWNED};
use super::wall_clock_us;

/// Per-buffer ownership state
///
/// Legal transitions are Empty→Writing, Writing→Full, Full→Reading and
/// Reading→Empty, plus the stale-reclaim edges Writing→Empty (discard an
/// abandoned write) and Reading→Full (put the data back into the ready
/// pool).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Available for a writer to claim
    Empty = 0,
    /// Claimed by a writer, payload incomplete
    Writing = 1,
    /// Payload complete, available for a reader to claim
    Full = 2,
    /// Claimed by a reader
    Reading = 3,
}

impl BufferState {
    /// Decode a raw on-segment state byte
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Empty),
            1 => Some(Self::Writing),
            2 => Some(Self::Full),
            3 => Some(Self::Reading),
            _ => None,
        }
    }

    /// Human-readable state name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Writing => "Writing",
            Self::Full => "Full",
            Self::Reading => "Reading",
        }
    }
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Segment header at offset 0 of the shared mapping
///
/// `buffer_size`, `buffer_count` and `rank` are written by the creator
/// before `ready_magic` and never change afterwards; all other fields are
/// mutated concurrently by attached managers.
#[repr(C)]
pub struct SegmentHeader {
    /// Monotonic manager-id dispenser
    pub next_id: AtomicU32,
    /// Round-robin search hint for readers (advisory, not authoritative)
    pub reader_pos: AtomicU32,
    /// Round-robin search hint for writers (advisory, not authoritative)
    pub writer_pos: AtomicU32,
    /// Fixed payload capacity of each buffer in bytes
    pub buffer_size: u64,
    /// Number of buffers in the segment
    pub buffer_count: u64,
    /// Writer-process identifier, for diagnostics only
    pub rank: i32,
    /// Initialization sentinel, written last by the creator
    pub ready_magic: AtomicU32,
}

impl SegmentHeader {
    /// Initial header value for a creator; `ready_magic` starts at zero and
    /// is stored separately once the descriptor array is initialized
    pub fn new(buffer_size: u64, buffer_count: u64, rank: i32) -> Self {
        Self {
            next_id: AtomicU32::new(1),
            reader_pos: AtomicU32::new(0),
            writer_pos: AtomicU32::new(0),
            buffer_size,
            buffer_count,
            rank,
            ready_magic: AtomicU32::new(0),
        }
    }

    /// Publish the segment to attachers. Must be the last initialization
    /// step; pairs with the `Acquire` load in [`is_ready`](Self::is_ready).
    pub fn mark_ready(&self) {
        self.ready_magic.store(READY_MAGIC, Ordering::Release);
    }

    /// Whether the creator has finished initializing the segment
    pub fn is_ready(&self) -> bool {
        self.ready_magic.load(Ordering::Acquire) == READY_MAGIC
    }

    /// Dispense a fresh manager id
    pub fn assign_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::AcqRel) as i32
    }
}

/// Per-buffer descriptor in the packed array after the segment header
///
/// `write_pos` and `read_pos` are logically owned by the manager named in
/// `sem_id` while the buffer is Writing or Reading; they are stored as
/// relaxed atomics so that introspection from other managers stays
/// well-defined.
#[repr(C)]
pub struct BufferDescriptor {
    write_pos: AtomicU64,
    read_pos: AtomicU64,
    sem: AtomicU8,
    sem_id: AtomicI32,
    touch_time_us: AtomicU64,
}

impl BufferDescriptor {
    /// Descriptor for a freshly initialized, unowned buffer
    pub fn new() -> Self {
        Self {
            write_pos: AtomicU64::new(0),
            read_pos: AtomicU64::new(0),
            sem: AtomicU8::new(BufferState::Empty as u8),
            sem_id: AtomicI32::new(UNOWNED),
            touch_time_us: AtomicU64::new(0),
        }
    }

    /// Current state; a byte outside the known range reads as Empty
    pub fn state(&self) -> BufferState {
        BufferState::from_raw(self.sem.load(Ordering::Acquire)).unwrap_or(BufferState::Empty)
    }

    /// Transition to `state`. The release store makes all payload bytes
    /// written before the transition visible to the manager that observes
    /// it with an acquire load.
    pub fn set_state(&self, state: BufferState) {
        self.sem.store(state as u8, Ordering::Release);
    }

    /// Current owner id, or [`UNOWNED`]
    pub fn owner(&self) -> i32 {
        self.sem_id.load(Ordering::SeqCst)
    }

    /// Claim or release ownership. Tie-breaking between competing managers
    /// is claim-then-verify: store your id, then re-read it with
    /// [`owner`](Self::owner) to detect a lost race.
    pub fn set_owner(&self, id: i32) {
        self.sem_id.store(id, Ordering::SeqCst);
    }

    /// Byte offset one past the last written payload byte
    pub fn write_pos(&self) -> u64 {
        self.write_pos.load(Ordering::Relaxed)
    }

    pub fn set_write_pos(&self, pos: u64) {
        self.write_pos.store(pos, Ordering::Relaxed);
    }

    /// Byte offset of the next unread payload byte
    pub fn read_pos(&self) -> u64 {
        self.read_pos.load(Ordering::Relaxed)
    }

    pub fn set_read_pos(&self, pos: u64) {
        self.read_pos.store(pos, Ordering::Relaxed);
    }

    /// Record a liveness signal from the current owner. Stale reclaim keys
    /// off this timestamp, so every operation by the owner must touch.
    pub fn touch(&self) {
        self.touch_time_us.store(wall_clock_us(), Ordering::Relaxed);
    }

    /// Wall-clock microseconds of the owner's most recent operation
    pub fn touch_time_us(&self) -> u64 {
        self.touch_time_us.load(Ordering::Relaxed)
    }
}

impl Default for BufferDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
