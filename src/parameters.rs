use bitflags::bitflags;
use std::{fmt, io, mem};

use crate::buffer;
use crate::device::Handle;
use crate::fraction::Fraction;
use crate::v4l2;
use crate::v4l_sys::*;

bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct Capabilities: u32 {
        const TIME_PER_FRAME    = 0x1000;
    }
}

impl From<u32> for Capabilities {
    fn from(caps: u32) -> Self {
        Self::from_bits_retain(caps)
    }
}

impl From<Capabilities> for u32 {
    fn from(capabilities: Capabilities) -> Self {
        capabilities.bits()
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct Modes: u32 {
        const HIGH_QUALITY      = 0x0001;
    }
}

impl From<u32> for Modes {
    fn from(modes: u32) -> Self {
        Self::from_bits_retain(modes)
    }
}

impl From<Modes> for u32 {
    fn from(modes: Modes) -> Self {
        modes.bits()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Streaming parameters (single-planar capture)
pub struct Parameters {
    pub capabilities: Capabilities,
    pub modes: Modes,
    /// Time per frame in seconds
    pub interval: Fraction,
}

impl Parameters {
    /// High quality capture at `fps` frames per second
    pub fn with_fps(fps: u32) -> Self {
        Parameters {
            capabilities: Capabilities::TIME_PER_FRAME,
            modes: Modes::HIGH_QUALITY,
            interval: Fraction::new(1, fps),
        }
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "capabilities : {:?}", self.capabilities)?;
        writeln!(f, "modes        : {:?}", self.modes)?;
        writeln!(f, "interval     : {} [s]", self.interval)?;
        Ok(())
    }
}

impl From<v4l2_captureparm> for Parameters {
    fn from(params: v4l2_captureparm) -> Self {
        Self {
            capabilities: Capabilities::from(params.capability),
            modes: Modes::from(params.capturemode),
            interval: Fraction::from(params.timeperframe),
        }
    }
}

impl From<Parameters> for v4l2_captureparm {
    fn from(parameters: Parameters) -> Self {
        Self {
            capability: parameters.capabilities.into(),
            capturemode: parameters.modes.into(),
            timeperframe: parameters.interval.into(),
            ..unsafe { mem::zeroed() }
        }
    }
}

/// Sets the capture parameters and returns what the driver applied
pub(crate) fn apply(handle: &Handle, params: &Parameters) -> io::Result<Parameters> {
    let mut v4l2_params = v4l2_streamparm {
        type_: buffer::Type::VideoCapture as u32,
        ..unsafe { mem::zeroed() }
    };
    v4l2_params.parm.capture = (*params).into();

    unsafe {
        handle.ioctl(v4l2::vidioc::VIDIOC_S_PARM, &mut v4l2_params)?;
    }

    Ok(Parameters::from(unsafe { v4l2_params.parm.capture }))
}
