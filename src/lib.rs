// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # R7 Video Device Library
//!
//! This library lets the host CPU read frames from, and send commands to,
//! the video sources owned by the R7 co-processor. Physical cameras, virtual
//! streamers, overlay blenders and Seek thermal cameras are all presented
//! through one open/close/read/write/poll/attributes contract.
//!
//! ## Features
//!
//! - **Device Registry**: A fixed table of camera, streamer and blender
//!   slots, each bound at initialization to the operation set of its kind.
//! - **Co-processor RPC**: Fixed-size request/response messages exchanged
//!   over the MFIS control driver, serialized across threads and processes.
//! - **Thermal Cameras**: Seek sensors reached through a named semaphore,
//!   shared memory and local sockets instead of a character file.
//! - **Frame Trailers**: Validation and decoding of the metadata appended
//!   to every frame buffer.
//!
//! ## Example
//!
//! ```no_run
//! use r7_video::{extract_metadata, Api, Config, DeviceId};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Api::new(Config::default());
//! api.init()?;
//!
//! let cam = DeviceId::Camera(0);
//! let mut frame = vec![0u8; api.attributes(cam)?.buffer_size as usize];
//! api.open(cam)?;
//! if api.poll(&[cam], Some(Duration::from_millis(500)))? & 1 != 0 {
//!     let len = api.read(cam, &mut frame)?;
//!     let meta = extract_metadata(&frame[..len])?;
//!     println!("{}x{} at {}", meta.width, meta.height, meta.timestamp);
//! }
//! api.close(cam)?;
//! api.deinit()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux**: MFIS control driver (`/dev/mfis_ioctl`) and the per-device
//!   character files it creates.
//! - **Thermal Cameras**: the Seek service running on the host.
//!
//! ## Safety
//!
//! This library uses `unsafe` code for ioctl calls, POSIX semaphores and
//! memory mappings. All unsafe operations are isolated to the transport,
//! physical memory and Seek modules and wrapped with safe APIs.

pub mod api;
pub mod attributes;
pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod metadata;
pub mod physmem;
pub mod registry;
pub mod rpc;
pub mod seek;
pub mod transport;

pub use api::Api;
pub use attributes::{Attributes, DeviceKind};
pub use config::{Config, SeekConfig};
pub use error::{Error, ErrorKind, Result};
pub use metadata::{extract_metadata, FrameMetadata, METADATA_SIZE};
pub use registry::{DeviceId, Registry, N_BLENDER, N_CAMERA, N_STREAMER, TOTAL_SLOTS};
pub use transport::{ControlChannel, IoctlChannel, Transport};
