use std::convert::TryFrom;
use std::fmt;

/// Field ordering of a captured image, `enum v4l2_field`
///
/// Capture sessions request [`FieldOrder::Interlaced`]; drivers of progressive sensors
/// answer with [`FieldOrder::Progressive`] (`V4L2_FIELD_NONE`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum FieldOrder {
    Any = 0,
    Progressive = 1,
    Top = 2,
    Bottom = 3,
    Interlaced = 4,
    SequentialTB = 5,
    SequentialBT = 6,
    Alternate = 7,
    InterlacedTB = 8,
    InterlacedBT = 9,
}

impl FieldOrder {
    const ALL: [FieldOrder; 10] = [
        FieldOrder::Any,
        FieldOrder::Progressive,
        FieldOrder::Top,
        FieldOrder::Bottom,
        FieldOrder::Interlaced,
        FieldOrder::SequentialTB,
        FieldOrder::SequentialBT,
        FieldOrder::Alternate,
        FieldOrder::InterlacedTB,
        FieldOrder::InterlacedBT,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Progressive => "none",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Interlaced => "interlaced",
            Self::SequentialTB => "seq-tb",
            Self::SequentialBT => "seq-bt",
            Self::Alternate => "alternate",
            Self::InterlacedTB => "interlaced-tb",
            Self::InterlacedBT => "interlaced-bt",
        }
    }
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for FieldOrder {
    /// The unknown raw code
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| *field as u32 == code)
            .ok_or(code)
    }
}
