//! Buffer search, claiming and stale-owner reclaim

use std::sync::atomic::Ordering;

use log::{debug, trace};

use crate::layout::{wall_clock_us, BufferState, UNOWNED};

use super::SegmentManager;

impl SegmentManager {
    /// Claim a buffer for writing, or `None` if no candidate is available
    ///
    /// Searches round-robin from the shared writer hint. Each candidate is
    /// first run through stale reclaim, then claimed if Empty, or with
    /// `overwrite` in any state except Writing, discarding whatever the
    /// buffer held. The claim is claim-then-verify: after storing our id
    /// and the Writing state, the owner field is re-read to detect a
    /// concurrent claim by another manager.
    pub fn acquire_for_writing(&self, overwrite: bool) -> Option<usize> {
        let _search = self.search_lock.lock().unwrap();
        let wp = self.header().writer_pos.load(Ordering::Relaxed) as usize;

        for ii in 0..self.buffer_count {
            let buffer = (ii + wp) % self.buffer_count;
            self.reset_buffer(buffer);

            let _guard = self.buffer_locks[buffer].lock().unwrap();
            let desc = self.desc(buffer);
            let state = desc.state();
            if state == BufferState::Empty || (overwrite && state != BufferState::Writing) {
                desc.set_owner(self.manager_id);
                desc.set_state(BufferState::Writing);
                if desc.owner() != self.manager_id {
                    continue;
                }
                desc.set_write_pos(0);
                desc.touch();
                self.header()
                    .writer_pos
                    .store(((buffer + 1) % self.buffer_count) as u32, Ordering::Relaxed);
                trace!("manager {} claimed buffer {} for writing", self.manager_id, buffer);
                return Some(buffer);
            }
        }

        trace!("manager {} found no buffer ready for writing", self.manager_id);
        None
    }

    /// Claim a buffer for reading, or `None` if nothing is ready
    ///
    /// Accepts Full buffers that are either unrestricted or addressed to
    /// this manager by the producer's destination filter.
    pub fn acquire_for_reading(&self) -> Option<usize> {
        let _search = self.search_lock.lock().unwrap();
        let rp = self.header().reader_pos.load(Ordering::Relaxed) as usize;

        for ii in 0..self.buffer_count {
            let buffer = (ii + rp) % self.buffer_count;
            self.reset_buffer(buffer);

            let _guard = self.buffer_locks[buffer].lock().unwrap();
            let desc = self.desc(buffer);
            let owner = desc.owner();
            if desc.state() == BufferState::Full && (owner == UNOWNED || owner == self.manager_id) {
                desc.set_owner(self.manager_id);
                desc.set_state(BufferState::Reading);
                if desc.owner() != self.manager_id {
                    continue;
                }
                desc.set_read_pos(0);
                desc.touch();
                self.header()
                    .reader_pos
                    .store(((buffer + 1) % self.buffer_count) as u32, Ordering::Relaxed);
                trace!("manager {} claimed buffer {} for reading", self.manager_id, buffer);
                return Some(buffer);
            }
        }

        None
    }

    /// Return an abandoned buffer to an available state
    ///
    /// A buffer owned by a different manager is left alone as long as its
    /// owner touched it within the stale timeout. Past that, a Reading
    /// buffer goes back to Full (the data re-enters the ready pool) and a
    /// Writing buffer goes back to Empty (the in-progress write is
    /// discarded). This is the only mechanism that tolerates a crashed
    /// peer.
    pub fn reset_buffer(&self, buffer: usize) {
        let _guard = self.buffer_locks[buffer].lock().unwrap();
        let desc = self.desc(buffer);

        if desc.owner() != self.manager_id
            && desc.touch_time_us() + self.stale_timeout_us > wall_clock_us()
        {
            return;
        }

        match desc.state() {
            BufferState::Reading => {
                debug!(
                    "manager {} reclaiming buffer {} from stale reader {}",
                    self.manager_id,
                    buffer,
                    desc.owner()
                );
                desc.set_read_pos(0);
                desc.set_state(BufferState::Full);
                desc.set_owner(UNOWNED);
            }
            BufferState::Writing => {
                debug!(
                    "manager {} reclaiming buffer {} from stale writer {}",
                    self.manager_id,
                    buffer,
                    desc.owner()
                );
                desc.set_write_pos(0);
                desc.set_state(BufferState::Empty);
                desc.set_owner(UNOWNED);
            }
            BufferState::Empty | BufferState::Full => {}
        }
    }
}
