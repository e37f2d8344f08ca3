use std::{fmt, io, mem};

use crate::buffer;
use crate::device::Handle;
use crate::error::BestEffort;
use crate::v4l2;
use crate::v4l_sys::*;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// Cropping rectangle in pixels
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.width, self.height
        )
    }
}

impl From<v4l2_rect> for Rect {
    fn from(rect: v4l2_rect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<Rect> for v4l2_rect {
    fn from(rect: Rect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

fn default_rect(handle: &Handle) -> io::Result<Rect> {
    let mut v4l2_cropcap = v4l2_cropcap {
        type_: buffer::Type::VideoCapture as u32,
        ..unsafe { mem::zeroed() }
    };
    unsafe {
        handle.ioctl(v4l2::vidioc::VIDIOC_CROPCAP, &mut v4l2_cropcap)?;
    }

    Ok(Rect::from(v4l2_cropcap.defrect))
}

fn set_rect(handle: &Handle, rect: Rect) -> io::Result<()> {
    let mut v4l2_crop = v4l2_crop {
        type_: buffer::Type::VideoCapture as u32,
        c: rect.into(),
    };
    unsafe { handle.ioctl(v4l2::vidioc::VIDIOC_S_CROP, &mut v4l2_crop) }
}

/// Resets cropping to the driver's default rectangle
///
/// The outcome is reported, never escalated.
pub(crate) fn reset_to_default(handle: &Handle) -> BestEffort {
    let res = default_rect(handle).and_then(|rect| {
        set_rect(handle, rect)?;
        log::debug!("crop set to {}", rect);
        Ok(())
    });

    BestEffort::attempt("crop reset", res)
}
