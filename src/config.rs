use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::format::FourCC;

/// What to capture and from where
///
/// # Example
///
/// ```
/// use v4lcap::{CaptureParams, FourCC};
///
/// let params = CaptureParams::new("/dev/video2", 1280, 720, FourCC::MJPG).with_fps(15);
/// assert_eq!(params.fps, 15);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaptureParams {
    /// Device node, a character special file
    pub path: PathBuf,
    /// Width in pixels, granted exactly or not at all
    pub width: u32,
    /// Height in pixels, granted exactly or not at all
    pub height: u32,
    /// Pixel format
    pub fourcc: FourCC,
    /// Frames per second
    pub fps: u32,
}

impl CaptureParams {
    pub const DEFAULT_FPS: u32 = 30;

    pub fn new<P: Into<PathBuf>>(path: P, width: u32, height: u32, fourcc: FourCC) -> Self {
        CaptureParams {
            path: path.into(),
            width,
            height,
            fourcc,
            fps: Self::DEFAULT_FPS,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Rejects values no driver could honor
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidParams("device path is empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidParams("width and height must be positive"));
        }
        if self.fps == 0 {
            return Err(Error::InvalidParams("frame rate must be positive"));
        }

        Ok(())
    }
}

impl Default for CaptureParams {
    fn default() -> Self {
        CaptureParams::new("/dev/video0", 640, 480, FourCC::YUYV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults() {
        let params = CaptureParams::default();
        assert_eq!(params.path, PathBuf::from("/dev/video0"));
        assert_eq!((params.width, params.height), (640, 480));
        assert_eq!(params.fourcc, FourCC::YUYV);
        assert_eq!(params.fps, 30);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let params = CaptureParams::new("/dev/video0", 0, 480, FourCC::YUYV);
        assert_eq!(
            params.validate().unwrap_err().kind(),
            ErrorKind::InvalidParams
        );

        let params = CaptureParams::default().with_fps(0);
        assert!(params.validate().is_err());

        let params = CaptureParams::new("", 640, 480, FourCC::YUYV);
        assert!(params.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_from_toml() {
        let params: CaptureParams = toml::from_str(
            r#"
            path = "/dev/video1"
            fourcc = "MJPG"
            fps = 10
            "#,
        )
        .unwrap();

        assert_eq!(params.path, PathBuf::from("/dev/video1"));
        assert_eq!(params.fourcc, FourCC::MJPG);
        assert_eq!(params.fps, 10);
        assert_eq!((params.width, params.height), (640, 480));
    }
}
