use std::fmt;

use crate::Timestamp;

/// Buffer type, `enum v4l2_buf_type`
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    VideoCapture = 1,
}

/// Buffer metadata as filled in by the driver on dequeue
#[derive(Debug, Copy, Clone, Default)]
pub struct Metadata {
    /// Number of bytes occupied by data in the buffer
    pub bytesused: u32,
    /// Time of capture (usually set by the driver)
    pub timestamp: Timestamp,
    /// Sequence number, counting the frames
    pub sequence: u32,
    /// Delivered frame number of this session, starting at 1
    pub frame: u64,
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frame     : {}", self.frame)?;
        writeln!(f, "sequence  : {}", self.sequence)?;
        writeln!(f, "timestamp : {}", self.timestamp)?;
        writeln!(f, "bytesused : {}", self.bytesused)?;
        Ok(())
    }
}
