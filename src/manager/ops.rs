//! Content-bearing buffer operations
//!
//! All operations here require the caller to have claimed the buffer via
//! one of the acquire calls; state and ownership are re-checked on entry
//! and every operation by the owner refreshes the touch timestamp.

use std::ptr;

use log::trace;

use crate::error::{FragbusError, Result};
use crate::layout::{BufferDescriptor, BufferState, UNOWNED};

use super::SegmentManager;

impl SegmentManager {
    fn checked_descriptor(&self, buffer: usize, expected: BufferState) -> Result<&BufferDescriptor> {
        let desc = self.descriptor(buffer)?;
        let actual = desc.state();
        if actual != expected {
            return Err(FragbusError::state_violation(buffer, expected, actual));
        }
        let owner = desc.owner();
        if owner != self.manager_id {
            return Err(FragbusError::ownership_violation(
                buffer,
                owner,
                self.manager_id,
            ));
        }
        Ok(desc)
    }

    /// Copy `data` into the buffer at its current write position
    ///
    /// The buffer must be Writing and owned by this manager. Writing past
    /// the buffer's payload capacity is an error; the write position is
    /// not advanced in that case.
    pub fn write(&self, buffer: usize, data: &[u8]) -> Result<usize> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.checked_descriptor(buffer, BufferState::Writing)?;
        desc.touch();

        let pos = desc.write_pos();
        if pos + data.len() as u64 > self.buffer_size as u64 {
            return Err(FragbusError::overflow(
                buffer,
                pos,
                data.len(),
                self.buffer_size as u64,
            ));
        }

        unsafe {
            ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.buffer_ptr(buffer).add(pos as usize),
                data.len(),
            );
        }
        desc.set_write_pos(pos + data.len() as u64);
        trace!(
            "manager {} wrote {} bytes to buffer {} (write_pos now {})",
            self.manager_id,
            data.len(),
            buffer,
            pos + data.len() as u64
        );
        Ok(data.len())
    }

    /// Copy bytes out of the buffer at its current read position
    ///
    /// The buffer must be Reading and owned by this manager. Returns
    /// whether ownership and state still held after the copy; a `false`
    /// means a peer's stale reclaim raced the read and the bytes must not
    /// be trusted.
    pub fn read(&self, buffer: usize, data: &mut [u8]) -> Result<bool> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.checked_descriptor(buffer, BufferState::Reading)?;
        desc.touch();

        let pos = desc.read_pos();
        if pos + data.len() as u64 > self.buffer_size as u64 {
            return Err(FragbusError::overflow(
                buffer,
                pos,
                data.len(),
                self.buffer_size as u64,
            ));
        }

        unsafe {
            ptr::copy_nonoverlapping(
                self.buffer_ptr(buffer).add(pos as usize),
                data.as_mut_ptr(),
                data.len(),
            );
        }
        desc.set_read_pos(pos + data.len() as u64);

        Ok(desc.owner() == self.manager_id && desc.state() == BufferState::Reading)
    }

    /// Publish a written buffer to readers
    ///
    /// `destination` restricts the next reader to one manager id; `None`
    /// makes the buffer readable by any manager.
    pub fn mark_full(&self, buffer: usize, destination: Option<i32>) -> Result<()> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.checked_descriptor(buffer, BufferState::Writing)?;
        desc.touch();

        desc.set_owner(destination.unwrap_or(UNOWNED));
        desc.set_state(BufferState::Full);
        trace!("manager {} marked buffer {} full", self.manager_id, buffer);
        Ok(())
    }

    /// Return a fully read buffer to the empty pool
    pub fn mark_empty(&self, buffer: usize) -> Result<()> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.checked_descriptor(buffer, BufferState::Reading)?;
        desc.touch();

        desc.set_read_pos(0);
        desc.set_write_pos(0);
        desc.set_owner(UNOWNED);
        desc.set_state(BufferState::Empty);
        trace!("manager {} marked buffer {} empty", self.manager_id, buffer);
        Ok(())
    }

    /// Advance the read position without copying, e.g. to skip bytes
    pub fn increment_read_pos(&self, buffer: usize, read: usize) -> Result<()> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.descriptor(buffer)?;
        desc.touch();
        if read == 0 {
            return Err(FragbusError::ZeroIncrement { buffer });
        }
        desc.set_read_pos(desc.read_pos() + read as u64);
        Ok(())
    }

    /// Advance the write position without copying, e.g. after an in-place
    /// payload construction
    pub fn increment_write_pos(&self, buffer: usize, written: usize) -> Result<()> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.descriptor(buffer)?;
        desc.touch();
        if written == 0 {
            return Err(FragbusError::ZeroIncrement { buffer });
        }
        desc.set_write_pos(desc.write_pos() + written as u64);
        Ok(())
    }

    /// Rewind the read position to the start of the buffer
    pub fn reset_read_pos(&self, buffer: usize) -> Result<()> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.descriptor(buffer)?;
        desc.touch();
        desc.set_read_pos(0);
        Ok(())
    }

    /// Whether unread bytes remain in the buffer
    pub fn more_data_in_buffer(&self, buffer: usize) -> Result<bool> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.descriptor(buffer)?;
        desc.touch();
        Ok(desc.read_pos() < desc.write_pos())
    }

    /// Non-panicking state query: whether the buffer is in `state` and
    /// owned by this manager
    pub fn check_buffer(&self, buffer: usize, state: BufferState) -> Result<bool> {
        let _guard = self.lock_buffer(buffer)?;
        let desc = self.descriptor(buffer)?;
        Ok(desc.owner() == self.manager_id && desc.state() == state)
    }
}
