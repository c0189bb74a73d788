// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Read-only views of co-processor physical memory.

use crate::error::{Error, Result};
use std::{
    ffi::c_void,
    fs::OpenOptions,
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
    path::Path,
    ptr::null_mut,
    slice::from_raw_parts,
};
use tracing::{debug, warn};

/// Private read-only mapping of a physical address range.
///
/// The mapping is page aligned internally; [`PhysicalView::as_slice`] starts
/// exactly at the requested address. It is unmapped when dropped.
pub struct PhysicalView {
    map: *mut c_void,
    map_len: usize,
    offset: usize,
    len: usize,
    address: u64,
}

// The mapping is read-only and never remapped.
unsafe impl Send for PhysicalView {}
unsafe impl Sync for PhysicalView {}

impl PhysicalView {
    /// Maps `size` bytes at physical `address` through the raw memory file
    /// at `mem_path`.
    pub fn map(mem_path: &Path, address: u64, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid("physical view of zero bytes"));
        }

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_SYNC)
            .open(mem_path)
            .map_err(Error::io("open physical memory"))?;

        let page = page_size();
        let offset = (address % page as u64) as usize;
        let base = address - offset as u64;
        let map_len = offset + size;
        let map_offset = libc::off_t::try_from(base)
            .map_err(|_| Error::invalid(format!("physical address {address:#x} out of range")))?;

        let map = unsafe {
            libc::mmap(
                null_mut(),
                map_len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                map_offset,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(Error::last_os_error("map physical memory"));
        }
        debug!("mapped {size} bytes at physical {address:#x}");

        Ok(Self {
            map,
            map_len,
            offset,
            len: size,
            address,
        })
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { from_raw_parts(self.map.cast::<u8>().add(self.offset), self.len) }
    }

    /// Reads the little-endian word at word index `index`.
    pub fn read_u32(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(4)?;
        let bytes = self.as_slice().get(start..start + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl Drop for PhysicalView {
    fn drop(&mut self) {
        if unsafe { libc::munmap(self.map, self.map_len) } != 0 {
            warn!("unmap of physical {:#x} failed!", self.address);
        }
    }
}

pub(crate) fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as usize,
        _ => 4096,
    }
}
