// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Error types shared by every layer of the library.

use std::{fmt, io};
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the device and co-processor API.
///
/// Every variant collapses into one of the five caller-facing classes of
/// [`ErrorKind`]; the variants themselves keep the detail (failing step,
/// OS error) that is useful in logs.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad id, empty buffer or out-of-range argument, detected before any I/O.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The API has not been initialized, or has been deinitialized.
    #[error("api not initialized")]
    NotInitialized,

    /// The device has no open session.
    #[error("device {0} not opened")]
    NotOpened(usize),

    /// The co-processor refused the request, e.g. a write-protected register.
    #[error("request {function:#x} blocked by the co-processor")]
    Blocked { function: u32 },

    /// The co-processor rejected the request arguments.
    #[error("request {function:#x} rejected by the co-processor: invalid parameter")]
    Rejected { function: u32 },

    /// The co-processor processed the request and reported a failure.
    #[error("request {function:#x} failed on the co-processor (status {status})")]
    Remote { function: u32, status: u32 },

    /// A reply did not belong to the request that was sent.
    #[error("reply mismatch: sent function {sent:#x}, received {received:#x}")]
    ReplyMismatch { sent: u32, received: u32 },

    /// An operating system call failed.
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// A Seek frame was copied but the socket acknowledgement failed.
    #[error("frame handshake failed after {transferred} bytes: {source}")]
    Handshake {
        transferred: usize,
        #[source]
        source: io::Error,
    },

    /// The slot's kind does not provide this operation.
    #[error("{operation} not supported by device {id}")]
    Unsupported { operation: &'static str, id: usize },

    /// Generic failure.
    #[error("{0}")]
    Fail(String),
}

impl Error {
    /// Create an InvalidParam error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }

    /// Create a generic Fail error
    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Fail(msg.into())
    }

    /// Returns a closure wrapping an [`io::Error`] with the failing step,
    /// suitable for `map_err`.
    pub fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    /// Wraps the calling thread's last OS error.
    pub fn last_os_error(context: &'static str) -> Self {
        Self::Io {
            context,
            source: io::Error::last_os_error(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParam(_) | Error::Rejected { .. } => ErrorKind::InvalidParam,
            Error::NotInitialized => ErrorKind::NotInitialized,
            Error::NotOpened(_) => ErrorKind::NotOpened,
            Error::Blocked { .. } => ErrorKind::Blocked,
            Error::Remote { .. }
            | Error::ReplyMismatch { .. }
            | Error::Io { .. }
            | Error::Handshake { .. }
            | Error::Unsupported { .. }
            | Error::Fail(_) => ErrorKind::Fail,
        }
    }

    /// Signed status code of this error, see [`ErrorKind::code`].
    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}

/// Caller-facing error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport, I/O or consistency failure.
    Fail,
    InvalidParam,
    NotInitialized,
    NotOpened,
    /// Permission refusal by the co-processor, not worth retrying.
    Blocked,
}

impl ErrorKind {
    /// Stable negative status code; success is reported as zero or data.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Fail => -1,
            ErrorKind::InvalidParam => -2,
            ErrorKind::NotInitialized => -3,
            ErrorKind::NotOpened => -4,
            ErrorKind::Blocked => -5,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fail => "fail",
            ErrorKind::InvalidParam => "invalid parameter",
            ErrorKind::NotInitialized => "not initialized",
            ErrorKind::NotOpened => "not opened",
            ErrorKind::Blocked => "blocked",
        };
        f.write_str(name)
    }
}
