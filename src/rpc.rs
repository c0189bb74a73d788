// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Wire format of the co-processor request/response protocol.
//!
//! A message is a fixed array of [`MSG_SIZE`] 32-bit words. Word 0 carries
//! the [`Function`] identifier, the remaining words are function-specific
//! arguments. A reply reuses the layout: word 0 echoes the function and word 1
//! carries a [`Status`], leaving `MSG_SIZE - 2` payload words.

use crate::error::{Error, Result};
use std::fmt;

pub use mfis_sys::MFIS_MSG_SIZE as MSG_SIZE;

/// Argument words available in a request.
pub const MAX_REQUEST_ARGS: usize = MSG_SIZE - 1;

/// Payload words available in a reply.
pub const REPLY_PAYLOAD_WORDS: usize = MSG_SIZE - 2;

/// Functions understood by the co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Function {
    Init = 0,
    Deinit = 1,
    /// `[camera, address]` -> `[value]`
    GetRegister = 2,
    /// `[camera, address, value]`
    SetRegister = 3,
    /// `[camera, fps]`
    SetFps = 4,
    /// Reboots the co-processor.
    Reset = 5,
    /// `[enabled]`
    HeartbeatMode = 6,
    /// `[mode]`
    BootMode = 7,
    /// `[global id]`
    SelectDisplay = 8,
    /// `[blender global id]`
    BlendingOn = 9,
    BlendingOff = 10,
    /// `[x1, y1, x2, y2]`
    SetCropping = 11,
    /// `[]` -> ASCII bytes, 4 per word
    GetVersion = 12,
    /// `[]` -> monitoring words
    GetMonitoringInfo = 13,
    /// `[]` -> `[address low, address high]`
    GetBufferPointers = 14,
    /// `[device type, device id, command, p0..p3]` -> `[r0..r5]`
    DeviceControl = 15,
}

impl Function {
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Status word of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 1,
    Blocked = 2,
    InvalidParam = 3,
    Error = 4,
}

impl Status {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Status::Ok),
            2 => Some(Status::Blocked),
            3 => Some(Status::InvalidParam),
            4 => Some(Status::Error),
            _ => None,
        }
    }
}

/// One request or reply.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Message([u32; MSG_SIZE]);

impl Message {
    /// Builds a request for `function` with up to [`MAX_REQUEST_ARGS`] words.
    pub fn request(function: Function, args: &[u32]) -> Result<Self> {
        if args.len() > MAX_REQUEST_ARGS {
            return Err(Error::invalid(format!(
                "{} takes at most {} argument words, got {}",
                function,
                MAX_REQUEST_ARGS,
                args.len()
            )));
        }
        let mut words = [0; MSG_SIZE];
        words[0] = function.id();
        words[1..=args.len()].copy_from_slice(args);
        Ok(Self(words))
    }

    /// Builds a reply echoing `function` with `status` and `payload`.
    pub fn reply(function: u32, status: Status, payload: &[u32]) -> Self {
        let mut words = [0; MSG_SIZE];
        words[0] = function;
        words[1] = status as u32;
        let len = payload.len().min(REPLY_PAYLOAD_WORDS);
        words[2..2 + len].copy_from_slice(&payload[..len]);
        Self(words)
    }

    pub fn from_words(words: [u32; MSG_SIZE]) -> Self {
        Self(words)
    }

    pub fn words(&self) -> &[u32; MSG_SIZE] {
        &self.0
    }

    pub fn words_mut(&mut self) -> &mut [u32; MSG_SIZE] {
        &mut self.0
    }

    /// Raw function identifier in word 0.
    pub fn function(&self) -> u32 {
        self.0[0]
    }

    /// Request arguments, words 1 onward.
    pub fn args(&self) -> &[u32] {
        &self.0[1..]
    }

    /// Reply status in word 1, `None` when the value is unknown.
    pub fn status(&self) -> Option<Status> {
        Status::from_raw(self.0[1])
    }

    /// Reply payload, words 2 onward.
    pub fn payload(&self) -> &[u32] {
        &self.0[2..]
    }

    /// Converts the status of this reply into a `Result`.
    pub fn check(self) -> Result<Self> {
        let function = self.function();
        match self.status() {
            Some(Status::Ok) => Ok(self),
            Some(Status::Blocked) => Err(Error::Blocked { function }),
            Some(Status::InvalidParam) => Err(Error::Rejected { function }),
            Some(Status::Error) | None => Err(Error::Remote {
                function,
                status: self.0[1],
            }),
        }
    }
}

/// Decodes ASCII text packed four bytes per word, least significant byte
/// first, stopping at the first NUL.
pub fn unpack_ascii(words: &[u32]) -> String {
    words
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .take_while(|&b| b != 0)
        .map(char::from)
        .collect()
}

/// Inverse of [`unpack_ascii`]; text beyond `words * 4` bytes is truncated.
pub fn pack_ascii(text: &str, words: usize) -> Vec<u32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(words * 4, 0);
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
