//! Record-oriented façade over the segment manager

use std::mem::size_of;
use std::slice;

use log::trace;

use crate::error::{FragbusError, Result};
use crate::layout::BufferState;
use crate::manager::SegmentManager;
use crate::segment::SegmentConfig;

use super::record::{FragmentHeader, FragmentRecord, RawWord};

/// Writes and reads whole fragments through segment buffers
///
/// Each buffer carries exactly one fragment. Writes are a single
/// contiguous copy; reads pull the header first, size the destination from
/// it, then pull the rest.
pub struct FragmentManager {
    segment: SegmentManager,
}

impl FragmentManager {
    /// Create or attach to the segment described by `config`
    pub fn attach(config: SegmentConfig) -> Result<Self> {
        Ok(Self {
            segment: SegmentManager::attach(config)?,
        })
    }

    /// Wrap an already attached segment manager
    pub fn from_segment(segment: SegmentManager) -> Self {
        Self { segment }
    }

    /// The underlying segment manager
    pub fn segment(&self) -> &SegmentManager {
        &self.segment
    }

    /// Whether the segment completed initialization
    pub fn is_valid(&self) -> bool {
        self.segment.is_valid()
    }

    fn ensure_valid(&self) -> Result<()> {
        if !self.segment.is_valid() {
            return Err(FragbusError::SegmentInvalid {
                key: self.segment.key(),
            });
        }
        Ok(())
    }

    /// Write a whole fragment into one buffer and publish it to any reader
    pub fn write_fragment(&self, fragment: &impl FragmentRecord, overwrite: bool) -> Result<()> {
        self.write_fragment_to(fragment, None, overwrite)
    }

    /// Write a whole fragment and address it to one consuming manager
    ///
    /// With a destination set, only the manager with that id can acquire
    /// the buffer for reading. If the write errors after the buffer was
    /// claimed, the buffer is left Writing and returns to the pool via
    /// stale reclaim.
    pub fn write_fragment_to(
        &self,
        fragment: &impl FragmentRecord,
        destination: Option<i32>,
        overwrite: bool,
    ) -> Result<()> {
        self.ensure_valid()?;

        let bytes = fragment.as_bytes();
        trace!(
            "sending fragment of {} words",
            fragment.size_words()
        );

        let buffer = self
            .segment
            .acquire_for_writing(overwrite)
            .ok_or(FragbusError::NoBufferAvailable)?;

        self.segment.write(buffer, bytes)?;
        self.segment.mark_full(buffer, destination)
    }

    /// Read one whole fragment into `fragment`, sizing it from the header
    pub fn read_fragment(&self, fragment: &mut impl FragmentRecord) -> Result<()> {
        self.ensure_valid()?;

        fragment.resize_body_bytes(0);
        let buffer = self
            .segment
            .acquire_for_reading()
            .ok_or(FragbusError::NoBufferAvailable)?;

        let intact = self
            .segment
            .read(buffer, &mut fragment.as_bytes_mut()[..FragmentHeader::BYTES])?;
        if !intact {
            return Err(FragbusError::OwnershipLost { buffer });
        }

        fragment.auto_resize();
        let total = fragment.size_words() * size_of::<RawWord>();
        if total > FragmentHeader::BYTES {
            let intact = self
                .segment
                .read(buffer, &mut fragment.as_bytes_mut()[FragmentHeader::BYTES..total])?;
            if !intact {
                return Err(FragbusError::OwnershipLost { buffer });
            }
        }

        self.segment.mark_empty(buffer)
    }

    /// Read just a fragment header, leaving the buffer claimed
    ///
    /// The buffer stays in Reading owned by this manager so the body can
    /// be routed and pulled separately with
    /// [`read_fragment_data`](Self::read_fragment_data).
    pub fn read_fragment_header(&self, header: &mut FragmentHeader) -> Result<()> {
        self.ensure_valid()?;

        let buffer = self
            .segment
            .acquire_for_reading()
            .ok_or(FragbusError::NoBufferAvailable)?;

        let intact = self.segment.read(buffer, header.as_bytes_mut())?;
        if !intact {
            return Err(FragbusError::OwnershipLost { buffer });
        }
        Ok(())
    }

    /// Read raw words from the buffer this manager is already reading,
    /// then release it
    pub fn read_fragment_data(&self, destination: &mut [RawWord]) -> Result<()> {
        self.ensure_valid()?;

        let buffer = self
            .segment
            .buffers_owned()
            .into_iter()
            .find(|&buffer| {
                self.segment
                    .check_buffer(buffer, BufferState::Reading)
                    .unwrap_or(false)
            })
            .ok_or(FragbusError::NoBufferAvailable)?;

        let bytes = unsafe {
            slice::from_raw_parts_mut(
                destination.as_mut_ptr() as *mut u8,
                destination.len() * size_of::<RawWord>(),
            )
        };
        let intact = self.segment.read(buffer, bytes)?;
        if !intact {
            return Err(FragbusError::OwnershipLost { buffer });
        }

        self.segment.mark_empty(buffer)
    }
}
