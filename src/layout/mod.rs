//! On-segment memory layout
//!
//! The segment is a single contiguous mapping shared by every attached
//! process:
//!
//! ```text
//! offset 0                      : SegmentHeader
//! offset size_of::<SegmentHeader>() : BufferDescriptor[buffer_count]
//! offset data_start             : u8[buffer_count * buffer_size]
//! ```
//!
//! Every field that more than one process may read or write is an atomic;
//! the creator's layout is authoritative and `#[repr(C)]` keeps field
//! widths and alignment identical across attachers.

mod constants;
mod headers;

pub use constants::{ATTACH_POLL_INTERVAL, READY_MAGIC, UNOWNED};
pub use headers::{BufferDescriptor, BufferState, SegmentHeader};

use std::mem::size_of;
use std::time::{SystemTime, UNIX_EPOCH};

/// Total segment size for a given geometry
pub fn segment_size(buffer_count: usize, buffer_size: usize) -> usize {
    size_of::<SegmentHeader>() + buffer_count * (size_of::<BufferDescriptor>() + buffer_size)
}

/// Byte offset of buffer descriptor `index`
pub fn descriptor_offset(index: usize) -> usize {
    size_of::<SegmentHeader>() + index * size_of::<BufferDescriptor>()
}

/// Byte offset of the payload region
pub fn data_start(buffer_count: usize) -> usize {
    size_of::<SegmentHeader>() + buffer_count * size_of::<BufferDescriptor>()
}

/// Byte offset of buffer `index`'s payload slot
pub fn buffer_offset(index: usize, buffer_count: usize, buffer_size: usize) -> usize {
    data_start(buffer_count) + index * buffer_size
}

/// Current wall-clock time in microseconds since the Unix epoch
pub(crate) fn wall_clock_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_size_accounts_for_all_regions() {
        let count = 4;
        let size = 1024;
        let expected =
            size_of::<SegmentHeader>() + count * size_of::<BufferDescriptor>() + count * size;
        assert_eq!(segment_size(count, size), expected);
    }

    #[test]
    fn test_buffer_offsets_are_contiguous() {
        let count = 8;
        let size = 512;
        for i in 0..count - 1 {
            assert_eq!(
                buffer_offset(i, count, size) + size,
                buffer_offset(i + 1, count, size)
            );
        }
        assert_eq!(buffer_offset(0, count, size), data_start(count));
    }

    #[test]
    fn test_descriptors_directly_follow_header() {
        assert_eq!(descriptor_offset(0), size_of::<SegmentHeader>());
        assert_eq!(
            descriptor_offset(1),
            size_of::<SegmentHeader>() + size_of::<BufferDescriptor>()
        );
    }
}
