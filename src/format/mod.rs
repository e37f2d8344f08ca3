use std::{convert::TryFrom, fmt, mem};

use crate::buffer;
use crate::config::CaptureParams;
use crate::device::Handle;
use crate::error::{Error, Result};
use crate::v4l2;
use crate::v4l_sys::*;

pub mod field;
pub use field::FieldOrder;

pub mod fourcc;
pub use fourcc::FourCC;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Streaming format (single-planar)
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// field order for interlacing
    pub field_order: FieldOrder,

    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl Format {
    /// Returns a capture format
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use v4lcap::format::{Format, FourCC};
    /// let fmt = Format::new(640, 480, FourCC::new(b"YUYV"));
    /// ```
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            field_order: FieldOrder::Interlaced,
            stride: 0,
            size: 0,
        }
    }

    /// Raises stride and size to the floors implied by two bytes per pixel
    ///
    /// Some drivers under-report both values.
    pub fn normalized(self) -> Self {
        let stride = self.stride.max(self.width.saturating_mul(2));
        let size = self.size.max(stride.saturating_mul(self.height));
        Format {
            stride,
            size,
            ..self
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "field          : {}", self.field_order)?;
        writeln!(f, "stride         : {}", self.stride)?;
        writeln!(f, "size           : {}", self.size)?;
        Ok(())
    }
}

impl From<v4l2_pix_format> for Format {
    fn from(fmt: v4l2_pix_format) -> Self {
        Self {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            field_order: FieldOrder::try_from(fmt.field).unwrap_or(FieldOrder::Any),
            stride: fmt.bytesperline,
            size: fmt.sizeimage,
        }
    }
}

impl From<Format> for v4l2_pix_format {
    fn from(format: Format) -> Self {
        Self {
            width: format.width,
            height: format.height,
            pixelformat: format.fourcc.into(),
            field: format.field_order as u32,
            bytesperline: format.stride,
            sizeimage: format.size,
            ..unsafe { mem::zeroed() }
        }
    }
}

/// Applies the requested format and checks the driver kept the resolution
///
/// Returns the format exactly as the driver reported it; callers normalize it themselves so
/// the reported image size stays available.
pub(crate) fn negotiate(handle: &Handle, params: &CaptureParams) -> Result<Format> {
    let requested = Format::new(params.width, params.height, params.fourcc);

    let mut v4l2_fmt = v4l2_format {
        type_: buffer::Type::VideoCapture as u32,
        ..unsafe { mem::zeroed() }
    };
    v4l2_fmt.fmt.pix = requested.into();

    unsafe {
        handle
            .ioctl(v4l2::vidioc::VIDIOC_S_FMT, &mut v4l2_fmt)
            .map_err(Error::SetFormat)?;
    }

    let granted = Format::from(unsafe { v4l2_fmt.fmt.pix });
    log::debug!(
        "driver granted {}x{} {} (stride {}, size {})",
        granted.width,
        granted.height,
        granted.fourcc,
        granted.stride,
        granted.size
    );

    if granted.width != requested.width || granted.height != requested.height {
        return Err(Error::FormatMismatch {
            requested: (requested.width, requested.height),
            granted: (granted.width, granted.height),
        });
    }

    Ok(granted)
}
