//! Memory-mapped frame capture from video4linux devices
//!
//! A [`Device`] is opened from [`CaptureParams`]: it checks the node, negotiates the exact
//! resolution, pixel format and frame rate, and maps a pool of driver buffers. Frames are then
//! pulled one at a time without copying:
//!
//! ```no_run
//! use v4lcap::prelude::*;
//! use v4lcap::{CaptureParams, Device, FourCC};
//!
//! let params = CaptureParams::new("/dev/video0", 640, 480, FourCC::YUYV).with_fps(30);
//! let mut dev = Device::open(params)?;
//!
//! dev.start()?;
//! for _ in 0..10 {
//!     let frame = dev.pull()?;
//!     println!("buffer {} carries {} bytes", frame.index(), frame.len());
//! }
//! dev.stop();
//! # Ok::<(), v4lcap::Error>(())
//! ```
//!
//! Each frame borrows the device, so it has to be consumed or copied before the next pull hands
//! its buffer back to the driver.

pub use v4l2_sys as v4l_sys;

pub mod v4l2;

pub mod backend;
pub mod buffer;
pub mod capability;
pub mod config;
pub mod control;
pub mod crop;
pub mod device;
pub mod error;
pub mod format;
pub mod io;
pub mod memory;
pub mod parameters;
pub mod poll;
pub mod prelude;

mod fraction;
pub use fraction::Fraction;

mod timestamp;
pub use timestamp::Timestamp;

pub use capability::Capabilities;
pub use config::CaptureParams;
pub use control::Control;
pub use device::Device;
pub use error::{BestEffort, Error, ErrorKind, Result};
pub use format::{Format, FourCC};

#[cfg(test)]
mod mock;
