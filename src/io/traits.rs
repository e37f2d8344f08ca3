use std::time::Duration;

use crate::error::{BestEffort, Result};
use crate::io::mmap::Frame;

/// How long [`CaptureStream::pull`] waits for a frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Streaming I/O
pub trait Stream {
    /// Hands every buffer to the driver, then starts streaming
    ///
    /// Nothing is switched on if a single buffer cannot be queued.
    fn start(&mut self) -> Result<()>;

    /// Stops streaming; the driver releases all buffers
    fn stop(&mut self) -> BestEffort;
}

/// Pull-based frame exchange with a single outstanding buffer
pub trait CaptureStream: Stream {
    /// Waits up to `timeout` for the next frame
    ///
    /// The frame handed out by the previous call is returned to the driver first, so a frame
    /// stays valid exactly until the next pull. [`Error::Timeout`](crate::Error::Timeout) leaves
    /// the stream untouched.
    fn pull_timeout(&mut self, timeout: Duration) -> Result<Frame<'_>>;

    /// Waits up to [`DEFAULT_TIMEOUT`] for the next frame
    fn pull(&mut self) -> Result<Frame<'_>> {
        self.pull_timeout(DEFAULT_TIMEOUT)
    }

    /// Number of frames delivered so far
    fn frame_count(&self) -> u64;

    /// Index of the buffer currently held by the caller
    fn checked_out(&self) -> Option<u32>;
}
