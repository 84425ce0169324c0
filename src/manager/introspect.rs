//! Non-mutating queries over the segment
//!
//! The readiness predicates and counts claim nothing and never advance the
//! shared search hints, so callers can poll them freely.

use std::fmt;
use std::sync::atomic::Ordering;

use crate::error::Result;
use crate::layout::{BufferState, UNOWNED};

use super::SegmentManager;

impl SegmentManager {
    /// Whether a buffer is ready for this manager to read
    pub fn ready_for_read(&self) -> bool {
        let _search = self.search_lock.lock().unwrap();
        let rp = self.header().reader_pos.load(Ordering::Relaxed) as usize;

        (0..self.buffer_count).any(|ii| {
            let desc = self.desc((ii + rp) % self.buffer_count);
            let owner = desc.owner();
            desc.state() == BufferState::Full && (owner == UNOWNED || owner == self.manager_id)
        })
    }

    /// Number of buffers ready for this manager to read
    pub fn read_ready_count(&self) -> usize {
        let _search = self.search_lock.lock().unwrap();
        (0..self.buffer_count)
            .filter(|&buffer| {
                let desc = self.desc(buffer);
                let owner = desc.owner();
                desc.state() == BufferState::Full && (owner == UNOWNED || owner == self.manager_id)
            })
            .count()
    }

    /// Whether a buffer could be claimed for writing
    pub fn ready_for_write(&self, overwrite: bool) -> bool {
        let _search = self.search_lock.lock().unwrap();
        let wp = self.header().writer_pos.load(Ordering::Relaxed) as usize;

        (0..self.buffer_count).any(|ii| {
            let desc = self.desc((ii + wp) % self.buffer_count);
            let state = desc.state();
            (state == BufferState::Empty && desc.owner() == UNOWNED)
                || (overwrite && state != BufferState::Writing)
        })
    }

    /// Number of buffers that could be claimed for writing
    pub fn write_ready_count(&self, overwrite: bool) -> usize {
        let _search = self.search_lock.lock().unwrap();
        (0..self.buffer_count)
            .filter(|&buffer| {
                let desc = self.desc(buffer);
                let state = desc.state();
                (state == BufferState::Empty && desc.owner() == UNOWNED)
                    || (overwrite && state != BufferState::Writing)
            })
            .count()
    }

    /// Buffers currently owned by this manager, in index order
    ///
    /// Each returned buffer is touched, so a manager enumerating its
    /// holdings does not see them reclaimed out from under it.
    pub fn buffers_owned(&self) -> Vec<usize> {
        let _search = self.search_lock.lock().unwrap();
        (0..self.buffer_count)
            .filter(|&buffer| {
                let desc = self.desc(buffer);
                if desc.owner() == self.manager_id {
                    desc.touch();
                    true
                } else {
                    false
                }
            })
            .collect()
    }

    /// Bytes written to the buffer so far
    pub fn buffer_data_size(&self, buffer: usize) -> Result<usize> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.descriptor(buffer)?;
        desc.touch();
        Ok(desc.write_pos() as usize)
    }
}

impl fmt::Display for SegmentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        writeln!(f, "Segment {:#x}:", self.key())?;
        writeln!(f, "  Buffer Count: {}", header.buffer_count)?;
        writeln!(f, "  Buffer Size: {} bytes", header.buffer_size)?;
        writeln!(f, "  Rank of Writer: {}", header.rank)?;
        writeln!(f, "  Next Manager ID: {}", header.next_id.load(Ordering::Relaxed))?;
        writeln!(
            f,
            "  Reader / Writer Hints: {} / {}",
            header.reader_pos.load(Ordering::Relaxed),
            header.writer_pos.load(Ordering::Relaxed)
        )?;
        writeln!(f, "  Ready Magic: {:#x}", header.ready_magic.load(Ordering::Relaxed))?;

        for buffer in 0..self.buffer_count {
            let desc = self.desc(buffer);
            writeln!(f)?;
            writeln!(f, "  Buffer {}:", buffer)?;
            writeln!(f, "    writePos: {}", desc.write_pos())?;
            writeln!(f, "    readPos: {}", desc.read_pos())?;
            writeln!(f, "    state: {}", desc.state())?;
            writeln!(f, "    owner: {}", desc.owner())?;
            writeln!(f, "    last touch: {} us", desc.touch_time_us())?;
        }
        Ok(())
    }
}
