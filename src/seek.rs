// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Thermal camera adapter.
//!
//! Seek thermal sensors are not exposed as character files. The thermal
//! service publishes each frame into a named shared memory segment, posts a
//! named semaphore and writes an acknowledgement byte on a per-sensor local
//! socket. [`SeekOps`] presents this through the same [`DeviceOps`] contract
//! as the character-file devices.
//!
//! A handler slot of the [`SeekPool`] is bound to a camera once, when the
//! registry is built, and keeps that binding for its whole lifetime. Opening
//! the camera acquires the semaphore, mapping and socket; closing releases
//! them again without touching the binding. The named objects themselves are
//! owned by the thermal service and are never created or unlinked here.

use crate::{
    attributes::{Attributes, DeviceKind},
    config::SeekConfig,
    device::{select_display, DeviceOps, Session},
    error::{Error, Result},
    transport::Transport,
};
use parking_lot::Mutex;
use std::{
    ffi::{c_void, CString},
    fs::File,
    io::{self, Read, Write},
    os::{
        fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
        unix::net::UnixStream,
    },
    path::Path,
    ptr::null_mut,
    slice::from_raw_parts,
    sync::Arc,
    time::Duration,
};
use tracing::{debug, warn};

/// Request code selecting the thermal sensor shown on the display.
pub const SEEK_DISPLAY_REQUEST: u8 = 0x01;

const SEEK_CONFIG_TIMEOUT: Duration = Duration::from_secs(1);

/// Fixed pool of thermal handler slots.
#[derive(Debug)]
pub struct SeekPool {
    slots: Mutex<Vec<Option<usize>>>,
}

impl SeekPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; capacity]),
        }
    }

    /// Binds `camera` to the first unused slot and returns the slot index.
    ///
    /// A camera already bound gets its existing slot back.
    pub fn register(&self, camera: usize) -> Result<usize> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter().position(|s| *s == Some(camera)) {
            return Ok(slot);
        }
        match slots.iter().position(Option::is_none) {
            Some(slot) => {
                slots[slot] = Some(camera);
                debug!("seek slot {} bound to camera {}", slot, camera);
                Ok(slot)
            }
            None => Err(Error::fail(format!(
                "no free seek handler for camera {} ({} in use)",
                camera,
                slots.len()
            ))),
        }
    }

    /// Slot bound to `camera`, if any.
    pub fn slot_of(&self, camera: usize) -> Option<usize> {
        self.slots.lock().iter().position(|s| *s == Some(camera))
    }

    /// Camera bound to `slot`, if any.
    pub fn camera_of(&self, slot: usize) -> Option<usize> {
        self.slots.lock().get(slot).copied().flatten()
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn used(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }
}

/// Operation set of a thermal camera bound to a pool slot.
#[derive(Debug, Clone)]
pub struct SeekOps {
    slot: usize,
    config: SeekConfig,
    display_id: usize,
}

impl SeekOps {
    /// `display_id` is the global id of the streamer carrying the thermal
    /// service's composited output.
    pub fn new(slot: usize, config: SeekConfig, display_id: usize) -> Self {
        Self {
            slot,
            config,
            display_id,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Selects this slot's sensor as the thermal display source.
    fn select_source(&self) -> Result<()> {
        let mut stream = UnixStream::connect(&self.config.config_socket)
            .map_err(Error::io("connect seek config socket"))?;
        stream
            .set_read_timeout(Some(SEEK_CONFIG_TIMEOUT))
            .map_err(Error::io("configure seek config socket"))?;
        stream
            .set_write_timeout(Some(SEEK_CONFIG_TIMEOUT))
            .map_err(Error::io("configure seek config socket"))?;

        let request = [SEEK_DISPLAY_REQUEST, self.slot as u8];
        stream
            .write_all(&request)
            .map_err(Error::io("send seek display request"))?;

        let mut response = [0u8; 2];
        stream
            .read_exact(&mut response)
            .map_err(Error::io("receive seek display response"))?;
        if response != request {
            return Err(Error::fail(format!(
                "seek display response {:?} does not match request {:?}",
                response, request
            )));
        }
        Ok(())
    }
}

impl DeviceOps for SeekOps {
    fn kind(&self) -> DeviceKind {
        DeviceKind::SeekCamera
    }

    fn open(&self, id: usize) -> Result<Arc<dyn Session>> {
        let sem = NamedSemaphore::open(&self.config.sem_name(self.slot))?;
        let shm = SharedSegment::open(&self.config.shm_name(self.slot))?;
        let socket = connect(&self.config.socket_path(self.slot), self.config.ack_timeout)?;
        debug!(
            "seek camera {} opened on slot {} ({} bytes)",
            id,
            self.slot,
            shm.len()
        );
        Ok(Arc::new(SeekSession {
            id,
            sem,
            shm,
            socket,
            io: Mutex::new(()),
        }))
    }

    fn readable(&self) -> bool {
        true
    }

    fn display(&self, transport: &Transport, _id: usize) -> Result<()> {
        self.select_source()?;
        select_display(transport, self.display_id)
    }

    fn attributes(&self) -> Option<Attributes> {
        Some(Attributes::seek())
    }
}

fn connect(path: &Path, ack_timeout: Duration) -> Result<UnixStream> {
    let socket = UnixStream::connect(path).map_err(Error::io("connect seek socket"))?;
    let timeout = (!ack_timeout.is_zero()).then_some(ack_timeout);
    socket
        .set_read_timeout(timeout)
        .map_err(Error::io("configure seek socket"))?;
    Ok(socket)
}

/// Open thermal camera.
pub struct SeekSession {
    id: usize,
    sem: NamedSemaphore,
    shm: SharedSegment,
    socket: UnixStream,
    io: Mutex<()>,
}

impl Session for SeekSession {
    /// Waits for the next frame, copies it out of shared memory and consumes
    /// the service's acknowledgement byte.
    ///
    /// When the acknowledgement cannot be read the copy has already
    /// happened; the error reports how many bytes were transferred.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let _guard = self.io.lock();
        self.sem.wait()?;

        let frame = self.shm.as_slice();
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(frame.len());
        let count = (frame.len() - start).min(buf.len());
        buf[..count].copy_from_slice(&frame[start..start + count]);

        let mut ack = [0u8; 1];
        match (&self.socket).read(&mut ack) {
            Ok(1) => Ok(count),
            Ok(_) => Err(Error::Handshake {
                transferred: count,
                source: io::Error::from(io::ErrorKind::UnexpectedEof),
            }),
            Err(source) => Err(Error::Handshake {
                transferred: count,
                source,
            }),
        }
    }

    fn write_at(&self, _buf: &[u8], _offset: u64) -> Result<usize> {
        Err(Error::Unsupported {
            operation: "write",
            id: self.id,
        })
    }

    fn poll_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

/// Handle on an existing POSIX named semaphore.
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
}

// sem_t handles may be shared between threads.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Opens `name`; the semaphore must already exist.
    pub fn open(name: &str) -> Result<Self> {
        let cname = CString::new(name).map_err(|_| Error::invalid(format!("name {name:?}")))?;
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(Error::last_os_error("sem_open"));
        }
        Ok(Self { sem })
    }

    /// Blocks until the semaphore can be decremented.
    pub fn wait(&self) -> Result<()> {
        loop {
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(Error::Io {
                    context: "sem_wait",
                    source: err,
                });
            }
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if unsafe { libc::sem_close(self.sem) } != 0 {
            warn!("sem_close failed!");
        }
    }
}

/// Read-only mapping of an existing POSIX shared memory segment.
pub struct SharedSegment {
    map: *mut c_void,
    len: usize,
}

// The mapping is read-only on this side.
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

impl SharedSegment {
    pub fn open(name: &str) -> Result<Self> {
        let cname = CString::new(name).map_err(|_| Error::invalid(format!("name {name:?}")))?;
        let fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_RDONLY, 0) };
        if fd < 0 {
            return Err(Error::last_os_error("shm_open"));
        }
        let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
        let len = file.metadata().map_err(Error::io("stat shm"))?.len() as usize;
        if len == 0 {
            return Err(Error::fail(format!("shared memory {name} is empty")));
        }

        let map = unsafe {
            libc::mmap(
                null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(Error::last_os_error("map shm"));
        }
        Ok(Self { map, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { from_raw_parts(self.map.cast::<u8>(), self.len) }
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if unsafe { libc::munmap(self.map, self.len) } != 0 {
            warn!("shm unmap failed!");
        }
    }
}
