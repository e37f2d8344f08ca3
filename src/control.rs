use std::{fmt, io, mem};

use crate::device::Handle;
use crate::v4l2;
use crate::v4l_sys::*;

/// Image controls exposed by a capture session
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Control {
    Brightness      = 0x00980900,
    Contrast        = 0x00980901,
    Saturation      = 0x00980902,
}

impl Control {
    pub const ALL: [Control; 3] = [Control::Brightness, Control::Contrast, Control::Saturation];

    pub fn id(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Brightness => "brightness",
            Control::Contrast => "contrast",
            Control::Saturation => "saturation",
        };
        write!(f, "{}", name)
    }
}

/// Control data type
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Boolean,
    Menu,
    Other(u32),
}

impl From<u32> for Type {
    fn from(repr: u32) -> Self {
        match repr {
            1 => Type::Integer,
            2 => Type::Boolean,
            3 => Type::Menu,
            repr => Type::Other(repr),
        }
    }
}

bitflags::bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct Flags: u32 {
        const DISABLED              = 0x0001;
        const GRABBED               = 0x0002;
        const READ_ONLY             = 0x0004;
        const UPDATE                = 0x0008;
        const INACTIVE              = 0x0010;
        const SLIDER                = 0x0020;
        const WRITE_ONLY            = 0x0040;
        const VOLATILE              = 0x0080;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Valid range of a control as reported by the driver
pub struct Description {
    pub id: u32,
    pub typ: Type,
    /// Name of the control, intended for the user
    pub name: String,
    /// Minimum value, inclusive
    pub minimum: i32,
    /// Maximum value, inclusive
    pub maximum: i32,
    pub step: i32,
    pub default: i32,
    pub flags: Flags,
}

impl From<v4l2_queryctrl> for Description {
    fn from(ctrl: v4l2_queryctrl) -> Self {
        let end = ctrl
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(ctrl.name.len());

        Description {
            id: ctrl.id,
            typ: Type::from(ctrl.type_),
            name: String::from_utf8_lossy(&ctrl.name[..end]).into_owned(),
            minimum: ctrl.minimum,
            maximum: ctrl.maximum,
            step: ctrl.step,
            default: ctrl.default_value,
            flags: Flags::from_bits_retain(ctrl.flags),
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID         : {:#010x}", self.id)?;
        writeln!(f, "Type       : {:?}", self.typ)?;
        writeln!(f, "Name       : {}", self.name)?;
        writeln!(f, "Minimum    : {}", self.minimum)?;
        writeln!(f, "Maximum    : {}", self.maximum)?;
        writeln!(f, "Step       : {}", self.step)?;
        writeln!(f, "Default    : {}", self.default)?;
        writeln!(f, "Flags      : {:?}", self.flags)?;
        Ok(())
    }
}

/// Queries the range of a control
///
/// Driver failures are passed through unmodified, see [`io::Error::raw_os_error`].
pub(crate) fn query(handle: &Handle, ctrl: Control) -> io::Result<Description> {
    let mut v4l2_ctrl = v4l2_queryctrl {
        id: ctrl.id(),
        ..unsafe { mem::zeroed() }
    };
    unsafe {
        handle.ioctl(v4l2::vidioc::VIDIOC_QUERYCTRL, &mut v4l2_ctrl)?;
    }

    Ok(Description::from(v4l2_ctrl))
}

pub(crate) fn get(handle: &Handle, ctrl: Control) -> io::Result<i32> {
    let mut v4l2_ctrl = v4l2_control {
        id: ctrl.id(),
        value: 0,
    };
    unsafe {
        handle.ioctl(v4l2::vidioc::VIDIOC_G_CTRL, &mut v4l2_ctrl)?;
    }

    Ok(v4l2_ctrl.value)
}

/// Sets a control without clamping `value` to its range
pub(crate) fn set(handle: &Handle, ctrl: Control, value: i32) -> io::Result<()> {
    let mut v4l2_ctrl = v4l2_control {
        id: ctrl.id(),
        value,
    };
    unsafe { handle.ioctl(v4l2::vidioc::VIDIOC_S_CTRL, &mut v4l2_ctrl) }
}
