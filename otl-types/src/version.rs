//! Version numbers used in font tables

use crate::raw::{FixedSize, Scalar};

/// A major/minor version pair.
///
/// This is used for table versions in a number of OpenType tables, including
/// GDEF, GSUB and GPOS. Tables like `hhea` store their version as a 16.16
/// fixed-point number, which for the versions this crate accepts is
/// byte-compatible with a major/minor pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MajorMinor {
    /// The major version number.
    pub major: u16,
    /// The minor version number.
    pub minor: u16,
}

impl MajorMinor {
    /// Version 1.0
    pub const VERSION_1_0: MajorMinor = MajorMinor::new(1, 0);
    /// Version 1.1
    pub const VERSION_1_1: MajorMinor = MajorMinor::new(1, 1);
    /// Version 1.2
    pub const VERSION_1_2: MajorMinor = MajorMinor::new(1, 2);
    /// Version 1.3
    pub const VERSION_1_3: MajorMinor = MajorMinor::new(1, 3);

    /// Create a new version with the provided major and minor parts.
    pub const fn new(major: u16, minor: u16) -> Self {
        MajorMinor { major, minor }
    }

    /// `true` if a table with this version can be read as `other`.
    ///
    /// Minor version changes are backwards compatible; major changes are not.
    pub fn compatible(self, other: MajorMinor) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl std::fmt::Display for MajorMinor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FixedSize for MajorMinor {
    const RAW_BYTE_LEN: usize = u16::RAW_BYTE_LEN * 2;
}

impl Scalar for MajorMinor {
    type Raw = [u8; 4];

    fn to_raw(self) -> Self::Raw {
        let [a, b] = self.major.to_be_bytes();
        let [c, d] = self.minor.to_be_bytes();
        [a, b, c, d]
    }

    fn from_raw(raw: Self::Raw) -> Self {
        let major = u16::from_be_bytes([raw[0], raw[1]]);
        let minor = u16::from_be_bytes([raw[2], raw[3]]);
        MajorMinor { major, minor }
    }
}
