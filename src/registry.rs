// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Fixed table of device slots and id-checked operations on them.
//!
//! The flat global id-space is partitioned into cameras `[0, N_CAMERA)`,
//! streamers `[N_CAMERA, N_CAMERA + N_STREAMER)` and blenders in the final
//! `N_BLENDER` slots. Callers normally address devices with [`DeviceId`],
//! which carries the small per-kind id and adds the kind's offset.
//!
//! The table is immutable after [`Registry::build`] except for each entry's
//! session, which only `open`/`close` on that entry mutate. Each entry has
//! its own lock so operations on different slots never contend.

use crate::{
    attributes::{Attributes, DeviceKind},
    config::Config,
    device::{DeviceOps, GenericOps, NoneOps, Session},
    error::{Error, Result},
    seek::{SeekOps, SeekPool},
    transport::Transport,
};
use parking_lot::Mutex;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, warn};

pub use mfis_sys::{
    MFIS_MAX_BLENDER as N_BLENDER, MFIS_MAX_CAMERA as N_CAMERA, MFIS_MAX_STREAMER as N_STREAMER,
};

/// Number of slots in the registry.
pub const TOTAL_SLOTS: usize = N_CAMERA + N_STREAMER + N_BLENDER;

/// First global id of the streamer range.
pub const STREAMER_OFFSET: usize = N_CAMERA;

/// First global id of the blender range.
pub const BLENDER_OFFSET: usize = N_CAMERA + N_STREAMER;

/// Most ids accepted by a single [`Registry::poll`].
pub const MAX_POLL_IDS: usize = u32::BITS as usize;

/// Conditions reported by `poll` regardless of the requested events. A slot
/// in one of them is flagged ready so the next transfer reports it.
const HANGUP_EVENTS: libc::c_short = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;

/// Per-kind device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Camera(usize),
    Streamer(usize),
    Blender(usize),
}

impl DeviceId {
    /// Global slot id, or `InvalidParam` when the per-kind id is out of range.
    pub fn global(self) -> Result<usize> {
        let (id, count, offset) = match self {
            DeviceId::Camera(id) => (id, N_CAMERA, 0),
            DeviceId::Streamer(id) => (id, N_STREAMER, STREAMER_OFFSET),
            DeviceId::Blender(id) => (id, N_BLENDER, BLENDER_OFFSET),
        };
        if id >= count {
            return Err(Error::invalid(format!("{self} out of range")));
        }
        Ok(offset + id)
    }

    /// Inverse of [`DeviceId::global`].
    pub fn from_global(id: usize) -> Option<Self> {
        match id {
            id if id < STREAMER_OFFSET => Some(DeviceId::Camera(id)),
            id if id < BLENDER_OFFSET => Some(DeviceId::Streamer(id - STREAMER_OFFSET)),
            id if id < TOTAL_SLOTS => Some(DeviceId::Blender(id - BLENDER_OFFSET)),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Camera(id) => write!(f, "camera {id}"),
            DeviceId::Streamer(id) => write!(f, "streamer {id}"),
            DeviceId::Blender(id) => write!(f, "blender {id}"),
        }
    }
}

/// One registry slot.
pub struct Entry {
    id: usize,
    attributes: Attributes,
    ops: Box<dyn DeviceOps>,
    session: Mutex<Option<Arc<dyn Session>>>,
}

impl Entry {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Kind of the bound operation set. A Seek camera that could not get a
    /// handler slot reports [`DeviceKind::None`].
    pub fn kind(&self) -> DeviceKind {
        self.ops.kind()
    }

    /// Attributes, with kind-specific overrides applied.
    pub fn attributes(&self) -> Attributes {
        self.ops.attributes().unwrap_or(self.attributes)
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    fn session(&self) -> Result<Arc<dyn Session>> {
        self.session.lock().clone().ok_or(Error::NotOpened(self.id))
    }

    fn check_transfer(&self, len: usize, offset: u64) -> Result<()> {
        let buffer_size = u64::from(self.attributes().buffer_size);
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= buffer_size => Ok(()),
            _ => Err(Error::invalid(format!(
                "transfer of {} bytes at {} exceeds device {} buffer of {} bytes",
                len, offset, self.id, buffer_size
            ))),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("attributes", &self.attributes)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Table of every device slot.
pub struct Registry {
    entries: Vec<Entry>,
    seek: SeekPool,
}

impl Registry {
    /// Builds the table from the fetched attribute arrays.
    ///
    /// `cameras` covers the camera and streamer slots, `blenders` the blender
    /// slots. A Seek camera that finds the handler pool exhausted is bound to
    /// [`NoneOps`] and does not fail the build.
    pub fn build(config: &Config, cameras: &[Attributes], blenders: &[Attributes]) -> Result<Self> {
        if cameras.len() != N_CAMERA + N_STREAMER {
            return Err(Error::invalid(format!(
                "expected {} camera attributes, got {}",
                N_CAMERA + N_STREAMER,
                cameras.len()
            )));
        }
        if blenders.len() != N_BLENDER {
            return Err(Error::invalid(format!(
                "expected {} blender attributes, got {}",
                N_BLENDER,
                blenders.len()
            )));
        }
        let display_id = DeviceId::Streamer(config.seek.display_streamer).global()?;

        let seek = SeekPool::new(config.seek.max_handlers);
        let entries = cameras
            .iter()
            .chain(blenders)
            .enumerate()
            .map(|(id, attributes)| {
                let ops = bind_ops(config, &seek, id, attributes.kind, display_id);
                debug!("slot {} bound as {}: {}", id, ops.kind(), attributes);
                Entry {
                    id,
                    attributes: *attributes,
                    ops,
                    session: Mutex::new(None),
                }
            })
            .collect();

        Ok(Self { entries, seek })
    }

    /// Entry of global slot `id`, `None` when out of range.
    pub fn resolve(&self, id: usize) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Like [`Registry::resolve`] but reports `InvalidParam`.
    pub fn entry(&self, id: usize) -> Result<&Entry> {
        self.resolve(id)
            .ok_or_else(|| Error::invalid(format!("device id {id} out of range")))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn seek_pool(&self) -> &SeekPool {
        &self.seek
    }

    /// Opens slot `id`. Fails if the slot already has a session.
    pub fn open(&self, id: usize) -> Result<()> {
        let entry = self.entry(id)?;
        let mut session = entry.session.lock();
        if session.is_some() {
            return Err(Error::fail(format!("device {id} already opened")));
        }
        *session = Some(entry.ops.open(id)?);
        Ok(())
    }

    /// Closes slot `id`, releasing its session.
    pub fn close(&self, id: usize) -> Result<()> {
        let entry = self.entry(id)?;
        match entry.session.lock().take() {
            Some(_) => {
                debug!("device {} closed", id);
                Ok(())
            }
            None => Err(Error::NotOpened(id)),
        }
    }

    /// Closes every open slot; used on teardown.
    pub fn close_all(&self) {
        for entry in &self.entries {
            if entry.session.lock().take().is_some() {
                debug!("device {} closed", entry.id);
            }
        }
    }

    /// Reads up to `buf.len()` bytes starting at `offset` of the device
    /// buffer. On failure the file position is undefined.
    pub fn read(&self, id: usize, buf: &mut [u8], offset: u64) -> Result<usize> {
        let entry = self.entry(id)?;
        if buf.is_empty() {
            return Err(Error::invalid("empty read buffer"));
        }
        let session = entry.session()?;
        if !entry.ops.readable() {
            return Err(Error::Unsupported {
                operation: "read",
                id,
            });
        }
        entry.check_transfer(buf.len(), offset)?;
        session.read_at(buf, offset)
    }

    /// Writes `buf` starting at `offset` of the device buffer. On failure the
    /// file position is undefined.
    pub fn write(&self, id: usize, buf: &[u8], offset: u64) -> Result<usize> {
        let entry = self.entry(id)?;
        if buf.is_empty() {
            return Err(Error::invalid("empty write buffer"));
        }
        let session = entry.session()?;
        if !entry.ops.writable() {
            return Err(Error::Unsupported {
                operation: "write",
                id,
            });
        }
        entry.check_transfer(buf.len(), offset)?;
        session.write_at(buf, offset)
    }

    /// Waits until at least one of `ids` is ready or `timeout` expires.
    ///
    /// `None` blocks indefinitely, a zero timeout returns immediately and
    /// other timeouts are rounded up to whole milliseconds. Bit `i` of the
    /// result is set when `ids[i]` is ready, hung up or in error.
    pub fn poll(&self, ids: &[usize], timeout: Option<Duration>) -> Result<u32> {
        if ids.is_empty() || ids.len() > MAX_POLL_IDS {
            return Err(Error::invalid(format!(
                "poll takes 1 to {} ids, got {}",
                MAX_POLL_IDS,
                ids.len()
            )));
        }
        let entries = ids
            .iter()
            .map(|&id| self.entry(id))
            .collect::<Result<Vec<_>>>()?;
        let sessions = entries
            .iter()
            .map(|entry| entry.session())
            .collect::<Result<Vec<_>>>()?;

        let mut fds: Vec<libc::pollfd> = sessions
            .iter()
            .map(|session| libc::pollfd {
                fd: session.poll_fd(),
                events: session.poll_events(),
                revents: 0,
            })
            .collect();

        let timeout_ms = match timeout {
            None => -1,
            // Round up so sub-millisecond waits still wait.
            Some(t) => t.as_micros().div_ceil(1000).min(i32::MAX as u128) as libc::c_int,
        };

        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if ret < 0 {
            return Err(Error::last_os_error("poll"));
        }

        Ok(fds
            .iter()
            .enumerate()
            .filter(|(_, fd)| fd.revents & (fd.events | HANGUP_EVENTS) != 0)
            .fold(0u32, |mask, (i, _)| mask | (1u32 << i)))
    }

    /// Attributes of slot `id`.
    pub fn attributes(&self, id: usize) -> Result<Attributes> {
        Ok(self.entry(id)?.attributes())
    }

    /// Routes slot `id` to the display pipeline.
    pub fn display(&self, id: usize, transport: &Transport) -> Result<()> {
        self.entry(id)?.ops.display(transport, id)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries)
            .field("seek", &self.seek)
            .finish()
    }
}

fn bind_ops(
    config: &Config,
    seek: &SeekPool,
    id: usize,
    kind: DeviceKind,
    display_id: usize,
) -> Box<dyn DeviceOps> {
    let path = match DeviceId::from_global(id) {
        Some(DeviceId::Camera(n)) => config.camera_path(n),
        Some(DeviceId::Streamer(n)) => config.streamer_path(n),
        Some(DeviceId::Blender(n)) => config.blender_path(n),
        None => return Box::new(NoneOps),
    };

    match kind {
        DeviceKind::Camera => Box::new(GenericOps::camera(path)),
        DeviceKind::Streamer | DeviceKind::Blender => Box::new(GenericOps::writer(kind, path)),
        DeviceKind::SeekCamera => match seek.register(id) {
            Ok(slot) => Box::new(SeekOps::new(slot, config.seek.clone(), display_id)),
            Err(e) => {
                warn!("seek camera {} unusable: {}", id, e);
                Box::new(NoneOps)
            }
        },
        DeviceKind::None => Box::new(NoneOps),
    }
}
