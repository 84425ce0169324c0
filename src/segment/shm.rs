//! POSIX shared-memory handle
//!
//! A [`RawSegment`] is a scoped handle over a named shm object: it opens or
//! creates the object, maps it, and on drop unmaps it. The creator
//! additionally unlinks the name so the OS reclaims the memory once the
//! last attacher detaches.

use std::fs::File;
use std::mem::size_of;
use std::thread;

use log::{debug, warn};
use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;

use crate::error::{FragbusError, Result};
use crate::layout::{SegmentHeader, ATTACH_POLL_INTERVAL};

/// shm object name for a segment key
pub fn shm_name(key: u32) -> String {
    format!("/fragbus-{:08x}", key)
}

/// Remove a leaked segment by key, e.g. after an unclean creator shutdown.
/// Missing segments are not an error.
pub fn force_unlink(key: u32) -> Result<()> {
    match shm_unlink(shm_name(key).as_str()) {
        Ok(()) | Err(Errno::ENOENT) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A mapped shared-memory segment
pub struct RawSegment {
    mmap: MmapMut,
    _file: File,
    name: String,
    key: u32,
    is_creator: bool,
}

impl RawSegment {
    /// Open the segment for `key`, creating it with `size` bytes if it does
    /// not exist and `create` is set.
    ///
    /// Creator detection uses an exclusive create: the process whose
    /// `O_CREAT | O_EXCL` open succeeds is the creator, everyone else falls
    /// back to a plain attach. An attacher maps whatever size the creator
    /// established, polling until the object has grown past the header.
    pub fn open(key: u32, size: usize, create: bool) -> Result<Self> {
        let name = shm_name(key);
        let mode = Mode::from_bits_truncate(0o666);

        if create {
            match shm_open(
                name.as_str(),
                OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
                mode,
            ) {
                Ok(fd) => {
                    debug!("creating segment {} ({} bytes)", name, size);
                    ftruncate(&fd, size as i64)?;
                    let file = File::from(fd);
                    let mmap = Self::map(&file, size)?;
                    return Ok(Self {
                        mmap,
                        _file: file,
                        name,
                        key,
                        is_creator: true,
                    });
                }
                Err(Errno::EEXIST) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let fd = shm_open(name.as_str(), OFlag::O_RDWR, mode)?;
        let file = File::from(fd);

        // The creator may not have sized the object yet; wait for the
        // header to exist before mapping.
        let mut len = Self::object_len(&file)?;
        while len < size_of::<SegmentHeader>() {
            thread::sleep(ATTACH_POLL_INTERVAL);
            len = Self::object_len(&file)?;
        }

        debug!("attaching to segment {} ({} bytes)", name, len);
        let mmap = Self::map(&file, len)?;
        Ok(Self {
            mmap,
            _file: file,
            name,
            key,
            is_creator: false,
        })
    }

    fn object_len(file: &File) -> Result<usize> {
        let meta = file
            .metadata()
            .map_err(|e| FragbusError::from_io(e, "Failed to stat shm object"))?;
        Ok(meta.len() as usize)
    }

    fn map(file: &File, size: usize) -> Result<MmapMut> {
        unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(file)
                .map_err(|e| FragbusError::from_io(e, "Failed to map shm object"))
        }
    }

    /// Raw pointer to the start of the mapping
    pub fn as_ptr(&self) -> *mut u8 {
        self.mmap.as_ptr() as *mut u8
    }

    /// Mapped size in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }

    /// Whether this process created the segment
    pub fn is_creator(&self) -> bool {
        self.is_creator
    }

    /// The segment key
    pub fn key(&self) -> u32 {
        self.key
    }

    /// The shm object name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RawSegment {
    fn drop(&mut self) {
        if self.is_creator {
            if let Err(e) = shm_unlink(self.name.as_str()) {
                warn!("failed to unlink segment {}: {}", self.name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shm_name_is_key_scoped() {
        assert_eq!(shm_name(0x1001), "/fragbus-00001001");
        assert_ne!(shm_name(1), shm_name(2));
    }

    #[test]
    fn test_exclusive_create_then_attach() {
        let key = 0xF5E0_0001;
        let _ = force_unlink(key);

        let creator = RawSegment::open(key, 4096, true).unwrap();
        assert!(creator.is_creator());
        assert_eq!(creator.len(), 4096);

        let attacher = RawSegment::open(key, 4096, true).unwrap();
        assert!(!attacher.is_creator());
        assert_eq!(attacher.len(), 4096);
    }

    #[test]
    fn test_attach_only_fails_when_absent() {
        let key = 0xF5E0_0002;
        let _ = force_unlink(key);
        assert!(RawSegment::open(key, 4096, false).is_err());
    }

    #[test]
    fn test_creator_unlinks_on_drop() {
        let key = 0xF5E0_0003;
        let _ = force_unlink(key);

        {
            let _creator = RawSegment::open(key, 4096, true).unwrap();
        }
        assert!(RawSegment::open(key, 4096, false).is_err());
    }

    #[test]
    fn test_non_creator_drop_keeps_segment() {
        let key = 0xF5E0_0004;
        let _ = force_unlink(key);

        let _creator = RawSegment::open(key, 4096, true).unwrap();
        {
            let _attacher = RawSegment::open(key, 4096, true).unwrap();
        }
        assert!(RawSegment::open(key, 4096, false).is_ok());
    }
}
