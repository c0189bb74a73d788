// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Device kinds and per-slot attributes.

use std::fmt;

pub use mfis_sys::mfis_device_attributes as RawAttributes;

/// MIPI CSI-2 data type of a YUV 4:2:2 8-bit frame.
pub const DT_YUV422_8: u16 = 0x1E;
/// MIPI CSI-2 data type of an RGB 8:8:8 frame.
pub const DT_RGB888: u16 = 0x24;
/// MIPI CSI-2 data type of a RAW8 frame.
pub const DT_RAW8: u16 = 0x2A;
/// MIPI CSI-2 data type of a RAW12 frame.
pub const DT_RAW12: u16 = 0x2C;
/// Thermal frame of 32-bit floats, produced by the Seek service.
pub const DT_FLOAT32: u16 = 0x100;

pub const SEEK_WIDTH: u32 = 200;
pub const SEEK_HEIGHT: u32 = 150;
pub const SEEK_BUFFER_SIZE: u32 = SEEK_WIDTH * SEEK_HEIGHT * 4;

/// What a registry slot is bound to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceKind {
    /// Unused slot.
    #[default]
    None = 0,
    /// Physical sensor, read-only character file.
    Camera = 1,
    /// Host-writable virtual camera.
    Streamer = 2,
    /// Host-writable overlay.
    Blender = 3,
    /// Thermal sensor reached through the Seek service.
    SeekCamera = 4,
}

impl DeviceKind {
    /// Unknown values map to [`DeviceKind::None`].
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => DeviceKind::Camera,
            2 => DeviceKind::Streamer,
            3 => DeviceKind::Blender,
            4 => DeviceKind::SeekCamera,
            _ => DeviceKind::None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceKind::None => "none",
            DeviceKind::Camera => "camera",
            DeviceKind::Streamer => "streamer",
            DeviceKind::Blender => "blender",
            DeviceKind::SeekCamera => "seek",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry and buffer size of one slot.
///
/// `buffer_size` is authoritative for every read and write size check.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub kind: DeviceKind,
    pub buffer_size: u32,
    pub width: u32,
    pub height: u32,
    pub data_type: u16,
}

impl Attributes {
    /// Fixed attributes of a Seek thermal camera.
    pub const fn seek() -> Self {
        Self {
            kind: DeviceKind::SeekCamera,
            buffer_size: SEEK_BUFFER_SIZE,
            width: SEEK_WIDTH,
            height: SEEK_HEIGHT,
            data_type: DT_FLOAT32,
        }
    }
}

impl From<&RawAttributes> for Attributes {
    fn from(raw: &RawAttributes) -> Self {
        Self {
            kind: DeviceKind::from_raw(raw.device_type),
            buffer_size: raw.buffer_size,
            width: raw.width,
            height: raw.height,
            data_type: raw.dt,
        }
    }
}

impl From<&Attributes> for RawAttributes {
    fn from(attr: &Attributes) -> Self {
        Self {
            device_type: attr.kind as u32,
            buffer_size: attr.buffer_size,
            width: attr.width,
            height: attr.height,
            dt: attr.data_type,
            _reserved: 0,
        }
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}x{} dt:{:#x} size:{}",
            self.kind, self.width, self.height, self.data_type, self.buffer_size
        )
    }
}
