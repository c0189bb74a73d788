// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! In-process model of the co-processor and scratch device files.

#![allow(dead_code)]

use parking_lot::Mutex;
use r7_video::{
    attributes::{Attributes, DeviceKind, RawAttributes, DT_RAW8},
    rpc::{pack_ascii, Function, Message, Status, REPLY_PAYLOAD_WORDS},
    Config, ControlChannel, Error, Result, N_BLENDER, N_CAMERA, N_STREAMER,
};
use std::{
    ffi::CString,
    fs::File,
    path::Path,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};
use tempfile::TempDir;

pub const VERSION: &str = "R7 test 1.0";
pub const BUFFER_SIZE: u32 = 4096;

type Responder = Box<dyn Fn(&Message) -> Message + Send + Sync>;

/// Co-processor model sharing one mailbox between all callers, like the
/// MFIS driver does. Callers that are not serialized observe each other's
/// replies.
pub struct MockCoprocessor {
    mailbox: Mutex<Message>,
    responder: Responder,
    delay: Duration,
    cameras: Vec<Attributes>,
    blenders: Vec<Attributes>,
    fail_attributes: AtomicBool,
    exchanges: AtomicUsize,
    log: Mutex<Vec<Message>>,
}

impl MockCoprocessor {
    pub fn new(cameras: Vec<Attributes>, blenders: Vec<Attributes>) -> Self {
        Self {
            mailbox: Mutex::new(Message::default()),
            responder: Box::new(default_reply),
            delay: Duration::ZERO,
            cameras,
            blenders,
            fail_attributes: AtomicBool::new(false),
            exchanges: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Default layout: cameras 0-3, streamers 0-1 and both blenders present.
    pub fn standard() -> Self {
        Self::new(standard_cameras(), standard_blenders())
    }

    pub fn with_responder(
        mut self,
        responder: impl Fn(&Message) -> Message + Send + Sync + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_attributes(&self, fail: bool) {
        self.fail_attributes.store(fail, Ordering::SeqCst);
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Message> {
        self.log.lock().clone()
    }

    pub fn last_request(&self) -> Option<Message> {
        self.log.lock().last().copied()
    }
}

impl ControlChannel for MockCoprocessor {
    fn exchange(&self, request: &Message) -> Result<Message> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(*request);

        *self.mailbox.lock() = *request;
        thread::sleep(self.delay);
        let pending = *self.mailbox.lock();
        let reply = (self.responder)(&pending);
        *self.mailbox.lock() = reply;
        thread::sleep(self.delay);
        let reply = *self.mailbox.lock();
        Ok(reply)
    }

    fn camera_attributes(&self) -> Result<[RawAttributes; N_CAMERA + N_STREAMER]> {
        if self.fail_attributes.load(Ordering::SeqCst) {
            return Err(Error::fail("attribute query refused"));
        }
        let mut table = [RawAttributes::default(); N_CAMERA + N_STREAMER];
        for (raw, attr) in table.iter_mut().zip(&self.cameras) {
            *raw = attr.into();
        }
        Ok(table)
    }

    fn blender_attributes(&self) -> Result<[RawAttributes; N_BLENDER]> {
        if self.fail_attributes.load(Ordering::SeqCst) {
            return Err(Error::fail("attribute query refused"));
        }
        let mut table = [RawAttributes::default(); N_BLENDER];
        for (raw, attr) in table.iter_mut().zip(&self.blenders) {
            *raw = attr.into();
        }
        Ok(table)
    }
}

/// Echoes the function with `Ok`, answering queries with fixed values.
pub fn default_reply(request: &Message) -> Message {
    let function = request.function();
    let payload: Vec<u32> = if function == Function::GetVersion.id() {
        pack_ascii(VERSION, REPLY_PAYLOAD_WORDS)
    } else if function == Function::GetRegister.id() {
        vec![0x42]
    } else if function == Function::DeviceControl.id() {
        // Echo the parameter words so tests can check the encoding.
        request.args()[3..].to_vec()
    } else {
        Vec::new()
    };
    Message::reply(function, Status::Ok, &payload)
}

pub fn attributes(kind: DeviceKind) -> Attributes {
    Attributes {
        kind,
        buffer_size: BUFFER_SIZE,
        width: 64,
        height: 64,
        data_type: DT_RAW8,
    }
}

pub fn standard_cameras() -> Vec<Attributes> {
    let mut table = vec![Attributes::default(); N_CAMERA + N_STREAMER];
    for attr in table.iter_mut().take(4) {
        *attr = attributes(DeviceKind::Camera);
    }
    table[N_CAMERA] = attributes(DeviceKind::Streamer);
    table[N_CAMERA + 1] = attributes(DeviceKind::Streamer);
    table
}

pub fn standard_blenders() -> Vec<Attributes> {
    vec![attributes(DeviceKind::Blender); N_BLENDER]
}

/// Configuration rooted in `dir`, with unique Seek IPC names.
pub fn config(dir: &Path) -> Config {
    let mut config = Config {
        ctl_path: dir.join("mfis_ioctl"),
        mem_path: dir.join("mem"),
        camera_prefix: dir.join("cam").display().to_string(),
        streamer_prefix: dir.join("streamer").display().to_string(),
        blender_prefix: dir.join("blender").display().to_string(),
        ..Config::default()
    };
    let tag = format!("r7test_{}", std::process::id());
    config.seek.sem_prefix = format!("/{tag}_sem");
    config.seek.shm_prefix = format!("/{tag}_shm");
    config.seek.socket_prefix = dir.join("seek_socket").display().to_string();
    config.seek.config_socket = dir.join("seek_config_socket");
    config
}

/// Creates every character file of the standard layout as a regular file
/// of `BUFFER_SIZE` bytes, filled with the device's id.
pub fn create_device_files(config: &Config) {
    for id in 0..N_CAMERA {
        create_file(&config.camera_path(id), id as u8);
    }
    for id in 0..N_STREAMER {
        create_file(&config.streamer_path(id), 0);
    }
    for id in 0..N_BLENDER {
        create_file(&config.blender_path(id), 0);
    }
}

pub fn create_file(path: &Path, fill: u8) {
    std::fs::write(path, vec![fill; BUFFER_SIZE as usize]).unwrap();
}

pub fn mkfifo(path: &Path) {
    let cpath = CString::new(path.as_os_str().as_encoded_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(cpath.as_ptr(), 0o600) }, 0);
}

pub fn scratch() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    (dir, config)
}

pub fn open_rw(path: &Path) -> File {
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap()
}
