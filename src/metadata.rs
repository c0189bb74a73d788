// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Frame metadata trailer.
//!
//! The co-processor appends a fixed trailer of little-endian 32-bit words to
//! every frame buffer:
//!
//! ```text
//! word  0      width
//! word  1      height
//! word  2      bytes per pixel
//! word  3      timestamp, low half
//! word  4      timestamp, high half
//! word  5      synchronization flag
//! words 6..14  4 x (segment offset, segment type)
//! word  14     frame size in bytes
//! word  15     magic marker
//! ```
//!
//! Pixel data can contain the marker by coincidence, so a trailer is only
//! trusted when the marker matches and the declared geometry agrees with the
//! declared frame size.

use crate::error::{Error, Result};

/// Magic marker closing a valid trailer.
pub const METADATA_MAGIC: u32 = 0xCAFE_BEEF;

/// Segment descriptors carried by a trailer.
pub const MAX_SEGMENTS: usize = 4;

const WIDTH: usize = 0;
const HEIGHT: usize = 1;
const BPP: usize = 2;
const TIMESTAMP_LO: usize = 3;
const TIMESTAMP_HI: usize = 4;
const SYNC: usize = 5;
const SEGMENTS: usize = 6;
const FRAME_SIZE: usize = SEGMENTS + 2 * MAX_SEGMENTS;
const MAGIC: usize = FRAME_SIZE + 1;
const WORDS: usize = MAGIC + 1;

/// Size of the trailer in bytes.
pub const METADATA_SIZE: usize = WORDS * 4;

/// Location and type of one segment inside the frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub offset: u32,
    pub kind: u32,
}

/// Decoded trailer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    pub bpp: u32,
    pub timestamp: u64,
    pub sync: u32,
    pub segments: [Segment; MAX_SEGMENTS],
    pub frame_size: u32,
    pub magic: u32,
}

impl FrameMetadata {
    /// Serializes the trailer into `out`, which must hold
    /// [`METADATA_SIZE`] bytes.
    pub fn encode(&self, out: &mut [u8]) -> Result<()> {
        if out.len() != METADATA_SIZE {
            return Err(Error::invalid(format!(
                "trailer needs {} bytes, got {}",
                METADATA_SIZE,
                out.len()
            )));
        }
        let mut words = [0u32; WORDS];
        words[WIDTH] = self.width;
        words[HEIGHT] = self.height;
        words[BPP] = self.bpp;
        words[TIMESTAMP_LO] = self.timestamp as u32;
        words[TIMESTAMP_HI] = (self.timestamp >> 32) as u32;
        words[SYNC] = self.sync;
        for (i, segment) in self.segments.iter().enumerate() {
            words[SEGMENTS + 2 * i] = segment.offset;
            words[SEGMENTS + 2 * i + 1] = segment.kind;
        }
        words[FRAME_SIZE] = self.frame_size;
        words[MAGIC] = self.magic;

        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut words = [0u32; WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let mut segments = [Segment::default(); MAX_SEGMENTS];
        for (i, segment) in segments.iter_mut().enumerate() {
            segment.offset = words[SEGMENTS + 2 * i];
            segment.kind = words[SEGMENTS + 2 * i + 1];
        }
        Self {
            width: words[WIDTH],
            height: words[HEIGHT],
            bpp: words[BPP],
            timestamp: u64::from(words[TIMESTAMP_HI]) << 32 | u64::from(words[TIMESTAMP_LO]),
            sync: words[SYNC],
            segments,
            frame_size: words[FRAME_SIZE],
            magic: words[MAGIC],
        }
    }

    /// Whether the declared geometry matches the declared frame size.
    fn is_consistent(&self) -> bool {
        u64::from(self.width) * u64::from(self.height) * u64::from(self.bpp)
            == u64::from(self.frame_size)
    }
}

/// Extracts the trailer from the last [`METADATA_SIZE`] bytes of `buf`.
///
/// The trailer is accepted only when its marker equals [`METADATA_MAGIC`],
/// its frame size does not exceed `buf.len()` and
/// `width * height * bpp == frame_size`. No partially valid trailer is ever
/// returned.
pub fn extract_metadata(buf: &[u8]) -> Result<FrameMetadata> {
    if buf.len() < METADATA_SIZE {
        return Err(Error::invalid(format!(
            "buffer of {} bytes cannot hold a {} byte trailer",
            buf.len(),
            METADATA_SIZE
        )));
    }

    let candidate = FrameMetadata::decode(&buf[buf.len() - METADATA_SIZE..]);
    if candidate.magic != METADATA_MAGIC {
        return Err(Error::fail("no frame trailer"));
    }
    if candidate.frame_size as usize > buf.len() {
        return Err(Error::fail(format!(
            "trailer frame size {} exceeds buffer of {} bytes",
            candidate.frame_size,
            buf.len()
        )));
    }
    if !candidate.is_consistent() {
        return Err(Error::fail(format!(
            "trailer geometry {}x{}x{} does not match frame size {}",
            candidate.width, candidate.height, candidate.bpp, candidate.frame_size
        )));
    }
    Ok(candidate)
}

/// Variant of [`extract_metadata`] filling a caller-owned trailer, for frame
/// loops that reuse one value. On failure `out` is reset to all zeros.
pub fn extract_metadata_into(buf: &[u8], out: &mut FrameMetadata) -> Result<()> {
    match extract_metadata(buf) {
        Ok(metadata) => {
            *out = metadata;
            Ok(())
        }
        Err(e) => {
            *out = FrameMetadata::default();
            Err(e)
        }
    }
}
