// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Raw kernel ABI of the MFIS control driver.
//!
//! The driver exposes a single character file through which the host
//! exchanges fixed-size messages with the R7 co-processor and retrieves the
//! attribute tables describing every camera, streamer and blender slot. This
//! crate only mirrors the driver's request numbers and structure layouts; the
//! safe API lives in the `r7-video` crate.

#![allow(non_camel_case_types)]

use libc::c_int;

/// Number of 32-bit words in every request and reply message.
pub const MFIS_MSG_SIZE: usize = 8;

/// Physical camera slots managed by the co-processor.
pub const MFIS_MAX_CAMERA: usize = 8;

/// Virtual streamer slots, following the camera slots in the id-space.
pub const MFIS_MAX_STREAMER: usize = 8;

/// Overlay blender slots, the last slots of the id-space.
pub const MFIS_MAX_BLENDER: usize = 2;

/// Entries returned by [`mfis_get_cameras_attributes`].
pub const MFIS_CAMERA_TABLE_SIZE: usize = MFIS_MAX_CAMERA + MFIS_MAX_STREAMER;

/// ioctl type byte of the MFIS driver.
pub const MFIS_IOC_MAGIC: u8 = b'm';

const MFIS_IOC_WRITE_NR: u8 = 1;
const MFIS_IOC_READ_NR: u8 = 2;
const MFIS_IOC_CAMERAS_NR: u8 = 3;
const MFIS_IOC_BLENDERS_NR: u8 = 4;

/// One message as laid out in the driver's mailbox.
pub type mfis_message = [u32; MFIS_MSG_SIZE];

/// Attribute record of one device slot as filled in by the driver.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct mfis_device_attributes {
    pub device_type: u32,
    pub buffer_size: u32,
    pub width: u32,
    pub height: u32,
    pub dt: u16,
    pub _reserved: u16,
}

pub type mfis_camera_table = [mfis_device_attributes; MFIS_CAMERA_TABLE_SIZE];
pub type mfis_blender_table = [mfis_device_attributes; MFIS_MAX_BLENDER];

nix::ioctl_write_ptr!(
    mfis_write_request,
    MFIS_IOC_MAGIC,
    MFIS_IOC_WRITE_NR,
    mfis_message
);
nix::ioctl_read!(mfis_read_reply, MFIS_IOC_MAGIC, MFIS_IOC_READ_NR, mfis_message);
nix::ioctl_read!(
    mfis_get_cameras_attributes,
    MFIS_IOC_MAGIC,
    MFIS_IOC_CAMERAS_NR,
    mfis_camera_table
);
nix::ioctl_read!(
    mfis_get_blenders_attributes,
    MFIS_IOC_MAGIC,
    MFIS_IOC_BLENDERS_NR,
    mfis_blender_table
);

/// Converts the driver's `-1`/errno convention into an [`std::io::Error`].
pub fn check(ret: nix::Result<c_int>) -> std::io::Result<c_int> {
    ret.map_err(std::io::Error::from)
}
