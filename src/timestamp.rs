use std::{fmt, time};

use crate::v4l_sys::timeval;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Capture time as stamped by the driver, seconds and microseconds
pub struct Timestamp {
    pub sec: i64,
    pub usec: i64,
}

impl Timestamp {
    /// Returns a timestamp representation
    ///
    /// # Example
    ///
    /// ```
    /// use v4lcap::Timestamp;
    /// let ts = Timestamp::new(5, 5);
    /// ```
    pub fn new(sec: i64, usec: i64) -> Self {
        Timestamp { sec, usec }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06} [s]", self.sec, self.usec)
    }
}

impl From<timeval> for Timestamp {
    fn from(tv: timeval) -> Self {
        Timestamp {
            sec: tv.tv_sec as i64,
            usec: tv.tv_usec as i64,
        }
    }
}

impl From<Timestamp> for time::Duration {
    fn from(ts: Timestamp) -> Self {
        time::Duration::from_secs(ts.sec.max(0) as u64)
            + time::Duration::from_micros(ts.usec.max(0) as u64)
    }
}
