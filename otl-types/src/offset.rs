//! Offsets to tables

use crate::raw::{FixedSize, Scalar};

macro_rules! impl_offset {
    ($name:ident, $bits:literal, $rawty:ty) => {
        #[doc = concat!("A ", stringify!($bits), "-bit offset to a table.")]
        ///
        /// Specific offset fields may or may not permit NULL (zero) values;
        /// we expect the caller to handle the `None` case of [`non_null`].
        ///
        /// [`non_null`]: Self::non_null
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($rawty);

        impl $name {
            /// Create a new offset.
            pub const fn new(raw: $rawty) -> Self {
                Self(raw)
            }

            /// This offset as a `u32`.
            pub const fn to_u32(self) -> u32 {
                self.0 as u32
            }

            /// Returns this offset as a `usize`, or `None` if it is `0`.
            pub fn non_null(self) -> Option<usize> {
                match self.0 {
                    0 => None,
                    other => Some(other as usize),
                }
            }
        }

        impl FixedSize for $name {
            const RAW_BYTE_LEN: usize = <$rawty>::RAW_BYTE_LEN;
        }

        impl Scalar for $name {
            type Raw = <$rawty as Scalar>::Raw;

            fn to_raw(self) -> Self::Raw {
                self.0.to_raw()
            }

            fn from_raw(raw: Self::Raw) -> Self {
                Self(<$rawty>::from_raw(raw))
            }
        }
    };
}

impl_offset!(Offset16, 16, u16);
impl_offset!(Offset32, 32, u32);
