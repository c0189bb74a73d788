// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Operation sets bound to registry slots.
//!
//! Each [`DeviceKind`] is served by one [`DeviceOps`] implementation. Plain
//! character-file devices (cameras, streamers, blenders) share
//! [`GenericOps`]; the thermal camera uses [`crate::seek::SeekOps`]; unused
//! slots get [`NoneOps`], which still supports `display`.

use crate::{
    attributes::{Attributes, DeviceKind},
    error::{Error, Result},
    rpc::Function,
    transport::Transport,
};
use parking_lot::Mutex;
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    os::fd::{AsRawFd, RawFd},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

/// Direction in which a device transfers frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
}

/// An open device, created by [`DeviceOps::open`] and closed on drop.
pub trait Session: Send + Sync {
    /// Reads into `buf` starting at `offset` within the device buffer.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Writes `buf` starting at `offset` within the device buffer.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize>;

    /// Descriptor used to wait for readiness.
    fn poll_fd(&self) -> RawFd;

    /// Events waited for on [`Session::poll_fd`].
    fn poll_events(&self) -> libc::c_short {
        libc::POLLIN
    }
}

/// Kind-specific operations of a registry slot.
pub trait DeviceOps: Send + Sync {
    fn kind(&self) -> DeviceKind;

    /// Opens a new session on the device occupying global slot `id`.
    fn open(&self, id: usize) -> Result<Arc<dyn Session>>;

    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        false
    }

    /// Routes the device to the display pipeline.
    fn display(&self, transport: &Transport, id: usize) -> Result<()> {
        select_display(transport, id)
    }

    /// Synthesized attributes replacing the co-processor supplied ones.
    fn attributes(&self) -> Option<Attributes> {
        None
    }
}

/// Asks the co-processor to show global slot `id` on the display.
pub fn select_display(transport: &Transport, id: usize) -> Result<()> {
    let id = u32::try_from(id).map_err(|_| Error::invalid(format!("device id {id}")))?;
    transport.call(Function::SelectDisplay, &[id])?;
    Ok(())
}

/// Character-file backed device.
#[derive(Debug, Clone)]
pub struct GenericOps {
    kind: DeviceKind,
    path: PathBuf,
    access: Access,
}

impl GenericOps {
    /// Physical camera, opened read-only.
    pub fn camera(path: impl AsRef<Path>) -> Self {
        Self {
            kind: DeviceKind::Camera,
            path: path.as_ref().to_path_buf(),
            access: Access::ReadOnly,
        }
    }

    /// Streamer or blender, opened write-only.
    pub fn writer(kind: DeviceKind, path: impl AsRef<Path>) -> Self {
        Self {
            kind,
            path: path.as_ref().to_path_buf(),
            access: Access::WriteOnly,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn access(&self) -> Access {
        self.access
    }
}

impl DeviceOps for GenericOps {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn open(&self, id: usize) -> Result<Arc<dyn Session>> {
        let file = match self.access {
            Access::ReadOnly => OpenOptions::new().read(true).open(&self.path),
            Access::WriteOnly => OpenOptions::new().write(true).open(&self.path),
        }
        .map_err(Error::io("open device"))?;
        debug!("device {} opened {}", id, self.path.display());
        Ok(Arc::new(FileSession::new(file, self.access)))
    }

    fn readable(&self) -> bool {
        self.access == Access::ReadOnly
    }

    fn writable(&self) -> bool {
        self.access == Access::WriteOnly
    }
}

/// Operation set of an unused or unsupported slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneOps;

impl DeviceOps for NoneOps {
    fn kind(&self) -> DeviceKind {
        DeviceKind::None
    }

    fn open(&self, id: usize) -> Result<Arc<dyn Session>> {
        Err(Error::Unsupported {
            operation: "open",
            id,
        })
    }
}

/// Open character file.
///
/// The seek and the transfer are performed under one lock so concurrent
/// callers on the same session never observe each other's position.
pub struct FileSession {
    file: Mutex<File>,
    fd: RawFd,
    access: Access,
}

impl FileSession {
    pub fn new(file: File, access: Access) -> Self {
        let fd = file.as_raw_fd();
        Self {
            file: Mutex::new(file),
            fd,
            access,
        }
    }
}

impl Session for FileSession {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut file = self.file.lock();
        position(&mut file, offset)?;
        file.read(buf).map_err(Error::io("read device"))
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        let mut file = self.file.lock();
        position(&mut file, offset)?;
        file.write(buf).map_err(Error::io("write device"))
    }

    fn poll_fd(&self) -> RawFd {
        self.fd
    }

    fn poll_events(&self) -> libc::c_short {
        match self.access {
            Access::ReadOnly => libc::POLLIN,
            Access::WriteOnly => libc::POLLOUT,
        }
    }
}

fn position(file: &mut File, offset: u64) -> Result<()> {
    match file.seek(SeekFrom::Start(offset)) {
        Ok(_) => Ok(()),
        // Stream devices have no position; only offset 0 is meaningful.
        Err(e) if e.raw_os_error() == Some(libc::ESPIPE) && offset == 0 => Ok(()),
        Err(e) => Err(Error::io("seek device")(e)),
    }
}
