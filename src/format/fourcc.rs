use std::{fmt, str};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
/// Four character code representing a pixelformat
pub struct FourCC {
    pub repr: [u8; 4],
}

impl FourCC {
    /// YUYV 4:2:2 packed
    pub const YUYV: FourCC = FourCC::new(b"YUYV");
    /// Motion JPEG
    pub const MJPG: FourCC = FourCC::new(b"MJPG");

    /// Returns a pixelformat as four character code
    ///
    /// # Arguments
    ///
    /// * `repr` - Four characters as raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use v4lcap::format::FourCC;
    /// let fourcc = FourCC::new(b"YUYV");
    /// ```
    pub const fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// Returns the string representation of a four character code
    pub fn str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.repr)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.str() {
            Ok(string) => write!(f, "{}", string),
            Err(_) => write!(f, "{:#010x}", u32::from(*self)),
        }
    }
}

/// A string that is not exactly four bytes long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFourCCError(String);

impl fmt::Display for ParseFourCCError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a four character code", self.0)
    }
}

impl std::error::Error for ParseFourCCError {}

impl str::FromStr for FourCC {
    type Err = ParseFourCCError;

    /// Parses codes such as "YUYV" or "MJPG"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            &[a, b, c, d] => Ok(FourCC::new(&[a, b, c, d])),
            _ => Err(ParseFourCCError(s.to_string())),
        }
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        Self::from_le_bytes(fourcc.repr)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FourCC {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
