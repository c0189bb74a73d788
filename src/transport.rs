// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Serialized request/response exchanges with the co-processor.
//!
//! [`Transport`] is the single serialization point for every co-processor
//! bound command: a lock is held across the whole write-then-read cycle so
//! that no two requests ever interleave on the shared mailbox. The kernel
//! side is abstracted behind [`ControlChannel`]; [`IoctlChannel`] is the
//! production implementation.

use crate::{
    attributes::{Attributes, RawAttributes},
    error::{Error, Result},
    rpc::{Function, Message},
};
use mfis_sys::{
    check, mfis_blender_table, mfis_camera_table, mfis_get_blenders_attributes,
    mfis_get_cameras_attributes, mfis_read_reply, mfis_write_request,
};
use parking_lot::Mutex;
use std::{
    fs::{File, OpenOptions},
    os::fd::AsRawFd,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, trace};

/// Kernel side of the control channel.
///
/// Implementations perform one complete exchange per call and must not keep
/// any state between calls; serialization is provided by [`Transport`].
pub trait ControlChannel: Send + Sync {
    /// Writes `request` to the co-processor mailbox and reads back its reply.
    fn exchange(&self, request: &Message) -> Result<Message>;

    /// Attribute records of every camera and streamer slot.
    fn camera_attributes(&self) -> Result<mfis_camera_table>;

    /// Attribute records of every blender slot.
    fn blender_attributes(&self) -> Result<mfis_blender_table>;
}

impl<T: ControlChannel + ?Sized> ControlChannel for Arc<T> {
    fn exchange(&self, request: &Message) -> Result<Message> {
        (**self).exchange(request)
    }

    fn camera_attributes(&self) -> Result<mfis_camera_table> {
        (**self).camera_attributes()
    }

    fn blender_attributes(&self) -> Result<mfis_blender_table> {
        (**self).blender_attributes()
    }
}

/// [`ControlChannel`] backed by the MFIS driver's character file.
///
/// The file is opened and closed on every call. An exclusive `flock` is held
/// on it for the duration of the exchange, so that other processes using the
/// same driver are serialized as well.
#[derive(Debug, Clone)]
pub struct IoctlChannel {
    path: PathBuf,
}

impl IoctlChannel {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(Error::io("open control channel"))?;
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } != 0 {
            return Err(Error::last_os_error("lock control channel"));
        }
        Ok(file)
    }
}

impl ControlChannel for IoctlChannel {
    fn exchange(&self, request: &Message) -> Result<Message> {
        let file = self.open()?;
        let fd = file.as_raw_fd();

        check(unsafe { mfis_write_request(fd, request.words()) })
            .map_err(Error::io("write request"))?;

        let mut reply = Message::default();
        check(unsafe { mfis_read_reply(fd, reply.words_mut()) })
            .map_err(Error::io("read reply"))?;
        Ok(reply)
    }

    fn camera_attributes(&self) -> Result<mfis_camera_table> {
        let file = self.open()?;
        let mut table: mfis_camera_table = Default::default();
        check(unsafe { mfis_get_cameras_attributes(file.as_raw_fd(), &mut table) })
            .map_err(Error::io("get cameras attributes"))?;
        Ok(table)
    }

    fn blender_attributes(&self) -> Result<mfis_blender_table> {
        let file = self.open()?;
        let mut table: mfis_blender_table = Default::default();
        check(unsafe { mfis_get_blenders_attributes(file.as_raw_fd(), &mut table) })
            .map_err(Error::io("get blenders attributes"))?;
        Ok(table)
    }
}

/// Serializing front-end over a [`ControlChannel`].
pub struct Transport {
    channel: Box<dyn ControlChannel>,
    lock: Mutex<()>,
}

impl Transport {
    pub fn new(channel: impl ControlChannel + 'static) -> Self {
        Self {
            channel: Box::new(channel),
            lock: Mutex::new(()),
        }
    }

    /// Sends `request` and returns the matching reply.
    ///
    /// Only transport failures are reported as errors; a reply carrying a
    /// `Blocked`/`InvalidParam`/`Error` status is returned as-is. A reply
    /// whose word 0 does not echo the request's function is a failure.
    pub fn send_request(&self, request: &Message) -> Result<Message> {
        let reply = {
            let _guard = self.lock.lock();
            trace!(function = request.function(), "exchange");
            self.channel.exchange(request)?
        };

        if reply.function() != request.function() {
            return Err(Error::ReplyMismatch {
                sent: request.function(),
                received: reply.function(),
            });
        }
        Ok(reply)
    }

    /// Sends `function(args)` and converts a non-`Ok` status into an error.
    pub fn call(&self, function: Function, args: &[u32]) -> Result<Message> {
        let request = Message::request(function, args)?;
        let reply = self.send_request(&request)?.check();
        if let Err(e) = &reply {
            debug!(%function, "request failed: {}", e);
        }
        reply
    }

    /// Fetches the attributes of every camera and streamer slot.
    pub fn fetch_camera_attributes(&self) -> Result<Vec<Attributes>> {
        let table = {
            let _guard = self.lock.lock();
            self.channel.camera_attributes()?
        };
        Ok(table.iter().map(|raw: &RawAttributes| raw.into()).collect())
    }

    /// Fetches the attributes of every blender slot.
    pub fn fetch_blender_attributes(&self) -> Result<Vec<Attributes>> {
        let table = {
            let _guard = self.lock.lock();
            self.channel.blender_attributes()?
        };
        Ok(table.iter().map(|raw: &RawAttributes| raw.into()).collect())
    }
}
