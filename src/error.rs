use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::capability;

/// Broad class of an [`Error`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Capture parameters rejected before touching the device
    InvalidParams,
    /// Device node missing, not a character device, or not openable
    Open,
    /// Not a V4L2 node, or a required capability bit is absent
    Capability,
    /// The driver granted a different resolution than requested
    FormatNegotiation,
    /// The buffer pool could not be set up completely
    BufferAllocation,
    /// Buffers could not be enqueued or streaming could not be switched on
    Stream,
    /// No frame became ready within the wait window
    Timeout,
    /// The driver had no frame despite signalling readiness
    NoDataYet,
    /// Any other device level failure
    FatalIo,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid capture parameters: {0}")]
    InvalidParams(&'static str),
    #[error("cannot identify video device {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is no char device")]
    NotCharDevice { path: PathBuf },
    #[error("cannot open video device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("capability query failed, not a V4L2 device: {0}")]
    QueryCaps(#[source] io::Error),
    #[error("missing device capabilities: {0}")]
    MissingCapability(capability::Flags),
    #[error("failed to set pixel format: {0}")]
    SetFormat(#[source] io::Error),
    #[error("requested resolution {requested:?} but the driver supports {granted:?}")]
    FormatMismatch {
        requested: (u32, u32),
        granted: (u32, u32),
    },
    #[error("failed to set capture parameters: {0}")]
    SetParams(#[source] io::Error),
    #[error("device does not support memory mapping")]
    MmapUnsupported,
    #[error("buffer request failed: {0}")]
    RequestBuffers(#[source] io::Error),
    #[error("insufficient buffer memory, driver granted {0} buffer(s)")]
    InsufficientBuffers(u32),
    #[error("failed to map buffer {index}: {source}")]
    MapBuffer {
        index: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to enqueue buffer {index}: {source}")]
    Queue {
        index: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to start streaming: {0}")]
    StreamOn(#[source] io::Error),
    #[error("timed out waiting for a frame")]
    Timeout,
    #[error("no frame available yet")]
    NoDataYet,
    #[error("waiting for a frame failed: {0}")]
    Wait(#[source] io::Error),
    #[error("failed to return buffer {index} to the driver: {source}")]
    Requeue {
        index: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to dequeue a buffer: {0}")]
    Dequeue(#[source] io::Error),
    #[error("driver returned unknown buffer index {0}")]
    UnknownBuffer(u32),
    #[error("device is closed")]
    Closed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParams(_) => ErrorKind::InvalidParams,
            Error::Stat { .. } | Error::NotCharDevice { .. } | Error::Open { .. } => {
                ErrorKind::Open
            }
            Error::QueryCaps(_) | Error::MissingCapability(_) => ErrorKind::Capability,
            Error::SetFormat(_) | Error::FormatMismatch { .. } | Error::SetParams(_) => {
                ErrorKind::FormatNegotiation
            }
            Error::MmapUnsupported
            | Error::RequestBuffers(_)
            | Error::InsufficientBuffers(_)
            | Error::MapBuffer { .. } => ErrorKind::BufferAllocation,
            Error::Queue { .. } | Error::StreamOn(_) => ErrorKind::Stream,
            Error::Timeout => ErrorKind::Timeout,
            Error::NoDataYet => ErrorKind::NoDataYet,
            Error::Wait(_)
            | Error::Requeue { .. }
            | Error::Dequeue(_)
            | Error::UnknownBuffer(_)
            | Error::Closed => ErrorKind::FatalIo,
        }
    }

    /// Whether calling the failed operation again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::NoDataYet)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of an optional step whose failure is never escalated
///
/// Dropping this value is fine: the failure has already been logged.
#[derive(Debug)]
pub enum BestEffort {
    Applied,
    Skipped(io::Error),
}

impl BestEffort {
    pub(crate) fn attempt(what: &str, res: io::Result<()>) -> Self {
        match res {
            Ok(()) => {
                log::debug!("{}: ok", what);
                BestEffort::Applied
            }
            Err(e) => {
                log::warn!("{} failed, ignoring: {}", what, e);
                BestEffort::Skipped(e)
            }
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, BestEffort::Applied)
    }
}
