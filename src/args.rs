// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use r7_video::{config, Config, SeekConfig};
use std::{path::PathBuf, time::Duration};

/// Source routed to the display pipeline.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum DisplayKind {
    /// Physical or Seek camera
    Camera,
    /// Virtual streamer
    Streamer,
}

/// Command-line arguments for the R7 video tool.
///
/// Every device and IPC name can be overridden on the command line or
/// through environment variables.
///
/// # Example
///
/// ```bash
/// # Print the device table
/// r7-video --info
///
/// # Read 10 frames from camera 2
/// r7-video --camera 2 --frames 10
///
/// # Via environment variables
/// export R7_CTL_PATH=/dev/mfis_ioctl
/// r7-video --version-r7
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Print the attributes of every device slot as JSON
    #[arg(long)]
    pub info: bool,

    /// Print the co-processor firmware version
    #[arg(long)]
    pub version_r7: bool,

    /// Camera to read frames from
    #[arg(short, long)]
    pub camera: Option<usize>,

    /// Number of frames to read from the camera
    #[arg(short, long, default_value = "1")]
    pub frames: u32,

    /// Poll timeout in milliseconds before giving up on a frame
    #[arg(long, env = "R7_POLL_TIMEOUT", default_value = "1000")]
    pub timeout_ms: u64,

    /// Kind of device to route to the display
    #[arg(long, value_enum, requires = "display_id")]
    pub display: Option<DisplayKind>,

    /// Per-kind id of the device to route to the display
    #[arg(long)]
    pub display_id: Option<usize>,

    /// Reboot the co-processor
    #[arg(long)]
    pub reboot: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// MFIS control channel
    #[arg(long, env = "R7_CTL_PATH", default_value = config::DEFAULT_CTL_PATH)]
    pub ctl_path: PathBuf,

    /// Physical memory device
    #[arg(long, env = "R7_MEM_PATH", default_value = config::DEFAULT_MEM_PATH)]
    pub mem_path: PathBuf,

    /// Camera character file prefix
    #[arg(long, env = "R7_CAMERA_PREFIX", default_value = config::DEFAULT_CAMERA_PREFIX)]
    pub camera_prefix: String,

    /// Streamer character file prefix
    #[arg(long, env = "R7_STREAMER_PREFIX", default_value = config::DEFAULT_STREAMER_PREFIX)]
    pub streamer_prefix: String,

    /// Blender character file prefix
    #[arg(long, env = "R7_BLENDER_PREFIX", default_value = config::DEFAULT_BLENDER_PREFIX)]
    pub blender_prefix: String,

    /// Seek semaphore name prefix
    #[arg(long, env = "SEEK_SEM_PREFIX", default_value = config::DEFAULT_SEEK_SEM_PREFIX)]
    pub seek_sem_prefix: String,

    /// Seek shared memory name prefix
    #[arg(long, env = "SEEK_SHM_PREFIX", default_value = config::DEFAULT_SEEK_SHM_PREFIX)]
    pub seek_shm_prefix: String,

    /// Seek frame socket prefix
    #[arg(long, env = "SEEK_SOCKET_PREFIX", default_value = config::DEFAULT_SEEK_SOCKET_PREFIX)]
    pub seek_socket_prefix: String,

    /// Seek display configuration socket
    #[arg(long, env = "SEEK_CONFIG_SOCKET", default_value = config::DEFAULT_SEEK_CONFIG_SOCKET)]
    pub seek_config_socket: PathBuf,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Config {
            ctl_path: args.ctl_path.clone(),
            mem_path: args.mem_path.clone(),
            camera_prefix: args.camera_prefix.clone(),
            streamer_prefix: args.streamer_prefix.clone(),
            blender_prefix: args.blender_prefix.clone(),
            seek: SeekConfig {
                sem_prefix: args.seek_sem_prefix.clone(),
                shm_prefix: args.seek_shm_prefix.clone(),
                socket_prefix: args.seek_socket_prefix.clone(),
                config_socket: args.seek_config_socket.clone(),
                ..SeekConfig::default()
            },
        }
    }
}

impl Args {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
