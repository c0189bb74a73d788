// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Filesystem and IPC names used to reach the co-processor.
//!
//! [`Config::default`] matches the names created by the MFIS driver and the
//! thermal service on the target. Tests and the command-line tool override
//! individual fields.

use std::{path::PathBuf, time::Duration};

/// Control channel of the MFIS driver.
pub const DEFAULT_CTL_PATH: &str = "/dev/mfis_ioctl";

/// Raw physical memory file.
pub const DEFAULT_MEM_PATH: &str = "/dev/mem";

pub const DEFAULT_CAMERA_PREFIX: &str = "/dev/mfis_cam";
pub const DEFAULT_STREAMER_PREFIX: &str = "/dev/mfis_streamer";
pub const DEFAULT_BLENDER_PREFIX: &str = "/dev/mfis_blender";

pub const DEFAULT_SEEK_SEM_PREFIX: &str = "/seek_sem";
pub const DEFAULT_SEEK_SHM_PREFIX: &str = "/seek_shm";
pub const DEFAULT_SEEK_SOCKET_PREFIX: &str = "/tmp/seek_socket";
pub const DEFAULT_SEEK_CONFIG_SOCKET: &str = "/tmp/seek_config_socket";

/// Thermal sensors the Seek service can drive at the same time.
pub const DEFAULT_SEEK_MAX_HANDLERS: usize = 2;

/// Streamer slot onto which the thermal service composites its display output.
pub const DEFAULT_SEEK_DISPLAY_STREAMER: usize = 7;

const DEFAULT_SEEK_ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Paths of every resource opened by the library.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Control channel used for every RPC exchange.
    pub ctl_path: PathBuf,
    /// Raw memory file used to map co-processor physical addresses.
    pub mem_path: PathBuf,
    /// Camera character files are `<prefix><camera id>`.
    pub camera_prefix: String,
    /// Streamer character files are `<prefix><streamer id>`.
    pub streamer_prefix: String,
    /// Blender character files are `<prefix><blender id>`.
    pub blender_prefix: String,
    pub seek: SeekConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ctl_path: PathBuf::from(DEFAULT_CTL_PATH),
            mem_path: PathBuf::from(DEFAULT_MEM_PATH),
            camera_prefix: DEFAULT_CAMERA_PREFIX.to_string(),
            streamer_prefix: DEFAULT_STREAMER_PREFIX.to_string(),
            blender_prefix: DEFAULT_BLENDER_PREFIX.to_string(),
            seek: SeekConfig::default(),
        }
    }
}

impl Config {
    pub fn camera_path(&self, id: usize) -> PathBuf {
        PathBuf::from(format!("{}{}", self.camera_prefix, id))
    }

    pub fn streamer_path(&self, id: usize) -> PathBuf {
        PathBuf::from(format!("{}{}", self.streamer_prefix, id))
    }

    pub fn blender_path(&self, id: usize) -> PathBuf {
        PathBuf::from(format!("{}{}", self.blender_prefix, id))
    }
}

/// Names of the thermal service's IPC objects.
///
/// Every handler slot `n` uses the semaphore `<sem_prefix>n`, the shared
/// memory segment `<shm_prefix>n` and the socket `<socket_prefix>n`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekConfig {
    pub sem_prefix: String,
    pub shm_prefix: String,
    pub socket_prefix: String,
    /// Endpoint selecting which thermal sensor feeds the display.
    pub config_socket: PathBuf,
    /// Size of the handler pool.
    pub max_handlers: usize,
    /// Upper bound on the per-frame acknowledgement read.
    pub ack_timeout: Duration,
    /// Streamer id (not global id) used to display thermal frames.
    pub display_streamer: usize,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            sem_prefix: DEFAULT_SEEK_SEM_PREFIX.to_string(),
            shm_prefix: DEFAULT_SEEK_SHM_PREFIX.to_string(),
            socket_prefix: DEFAULT_SEEK_SOCKET_PREFIX.to_string(),
            config_socket: PathBuf::from(DEFAULT_SEEK_CONFIG_SOCKET),
            max_handlers: DEFAULT_SEEK_MAX_HANDLERS,
            ack_timeout: DEFAULT_SEEK_ACK_TIMEOUT,
            display_streamer: DEFAULT_SEEK_DISPLAY_STREAMER,
        }
    }
}

impl SeekConfig {
    pub fn sem_name(&self, slot: usize) -> String {
        format!("{}{}", self.sem_prefix, slot)
    }

    pub fn shm_name(&self, slot: usize) -> String {
        format!("{}{}", self.shm_prefix, slot)
    }

    pub fn socket_path(&self, slot: usize) -> PathBuf {
        PathBuf::from(format!("{}{}", self.socket_prefix, slot))
    }
}
