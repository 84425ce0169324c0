//! Segment manager: cross-process buffer coordination
//!
//! A [`SegmentManager`] is one process's handle on the shared segment. The
//! first attacher creates and initializes the segment (manager id 0);
//! later attachers wait for the ready sentinel and draw a fresh id from the
//! shared dispenser. Coordination between managers uses only atomic fields
//! in the segment, never kernel locks, with claim-then-verify on the owner
//! field as the sole arbitration mechanism. Within a process, a search
//! mutex serializes buffer claims and a per-buffer mutex serializes
//! content operations.

mod acquire;
mod introspect;
mod ops;

use std::ptr;
use std::sync::{Mutex, MutexGuard};
use std::thread;

use log::debug;

use crate::error::{FragbusError, Result};
use crate::layout::{
    self, BufferDescriptor, SegmentHeader, ATTACH_POLL_INTERVAL,
};
use crate::segment::{RawSegment, SegmentConfig};

/// One process's handle on a shared segment of buffers
pub struct SegmentManager {
    segment: RawSegment,
    manager_id: i32,
    stale_timeout_us: u64,
    buffer_count: usize,
    buffer_size: usize,
    search_lock: Mutex<()>,
    buffer_locks: Vec<Mutex<()>>,
}

// The raw pointers into the mapping are guarded by the atomics in the
// shared structs plus the intra-process mutexes.
unsafe impl Send for SegmentManager {}
unsafe impl Sync for SegmentManager {}

impl SegmentManager {
    /// Create or attach to the segment described by `config`
    ///
    /// The creator zeroes every descriptor and publishes the ready sentinel
    /// last; an attacher spins on the sentinel and then adopts the
    /// creator's geometry from the header, which is authoritative.
    pub fn attach(config: SegmentConfig) -> Result<Self> {
        config.validate()?;

        let segment = RawSegment::open(config.key, config.segment_size(), config.create)?;

        let (manager_id, buffer_count, buffer_size) = if segment.is_creator() {
            unsafe {
                let header = segment.as_ptr() as *mut SegmentHeader;
                ptr::write(
                    header,
                    SegmentHeader::new(
                        config.max_buffer_size as u64,
                        config.buffer_count as u64,
                        config.rank,
                    ),
                );
                for i in 0..config.buffer_count {
                    let desc =
                        segment.as_ptr().add(layout::descriptor_offset(i)) as *mut BufferDescriptor;
                    ptr::write(desc, BufferDescriptor::new());
                }
                // Publish only after every descriptor is initialized.
                (*header).mark_ready();
            }
            (0, config.buffer_count, config.max_buffer_size)
        } else {
            let header = unsafe { &*(segment.as_ptr() as *const SegmentHeader) };
            while !header.is_ready() {
                thread::sleep(ATTACH_POLL_INTERVAL);
            }

            let buffer_count = header.buffer_count as usize;
            let buffer_size = header.buffer_size as usize;
            let required = layout::segment_size(buffer_count, buffer_size);
            if segment.len() < required {
                return Err(FragbusError::GeometryMismatch {
                    mapped: segment.len(),
                    required,
                });
            }

            (header.assign_id(), buffer_count, buffer_size)
        };

        debug!(
            "manager {} attached to segment {:#x} ({} buffers x {} bytes{})",
            manager_id,
            config.key,
            buffer_count,
            buffer_size,
            if segment.is_creator() { ", creator" } else { "" }
        );

        Ok(Self {
            segment,
            manager_id,
            stale_timeout_us: config.stale_timeout_us,
            buffer_count,
            buffer_size,
            search_lock: Mutex::new(()),
            buffer_locks: (0..buffer_count).map(|_| Mutex::new(())).collect(),
        })
    }

    /// This manager's segment-unique id
    pub fn manager_id(&self) -> i32 {
        self.manager_id
    }

    /// Whether this manager created the segment
    pub fn is_creator(&self) -> bool {
        self.segment.is_creator()
    }

    /// The segment key
    pub fn key(&self) -> u32 {
        self.segment.key()
    }

    /// The creator's diagnostic rank
    pub fn rank(&self) -> i32 {
        self.header().rank
    }

    /// Number of buffers in the segment
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Payload capacity of each buffer in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The stale-owner timeout this manager applies during reclaim
    pub fn stale_timeout_us(&self) -> u64 {
        self.stale_timeout_us
    }

    /// Whether the segment completed initialization and is still published
    pub fn is_valid(&self) -> bool {
        self.header().is_ready()
    }

    pub(crate) fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.segment.as_ptr() as *const SegmentHeader) }
    }

    /// Descriptor for `buffer`, bounds-checked
    pub(crate) fn descriptor(&self, buffer: usize) -> Result<&BufferDescriptor> {
        if buffer >= self.buffer_count {
            return Err(FragbusError::buffer_out_of_range(buffer, self.buffer_count));
        }
        Ok(self.desc(buffer))
    }

    /// Descriptor for an index already known to be in range
    pub(crate) fn desc(&self, buffer: usize) -> &BufferDescriptor {
        debug_assert!(buffer < self.buffer_count);
        unsafe {
            &*(self.segment.as_ptr().add(layout::descriptor_offset(buffer))
                as *const BufferDescriptor)
        }
    }

    /// Start of `buffer`'s payload slot; the index must be in range
    pub(crate) fn buffer_ptr(&self, buffer: usize) -> *mut u8 {
        debug_assert!(buffer < self.buffer_count);
        unsafe {
            self.segment
                .as_ptr()
                .add(layout::buffer_offset(buffer, self.buffer_count, self.buffer_size))
        }
    }

    /// Per-buffer content lock, bounds-checked
    pub(crate) fn lock_buffer(&self, buffer: usize) -> Result<MutexGuard<'_, ()>> {
        if buffer >= self.buffer_count {
            return Err(FragbusError::buffer_out_of_range(buffer, self.buffer_count));
        }
        Ok(self.buffer_locks[buffer].lock().unwrap())
    }
}

impl Drop for SegmentManager {
    fn drop(&mut self) {
        debug!(
            "manager {} detaching from segment {:#x}",
            self.manager_id,
            self.segment.key()
        );
        // RawSegment unmaps; the creator's handle also unlinks the name.
    }
}
