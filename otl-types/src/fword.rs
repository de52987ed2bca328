//! 16-bit signed and unsigned quantities in font design units

use crate::raw::{FixedSize, Scalar};

macro_rules! impl_fword {
    ($name:ident, $docs:literal, $rawty:ty, $to:ident) => {
        #[doc = $docs]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($rawty);

        impl $name {
            /// Create a new value, in font design units.
            pub const fn new(raw: $rawty) -> Self {
                Self(raw)
            }

            /// The raw integer value, in font design units.
            pub const fn $to(self) -> $rawty {
                self.0
            }
        }

        impl From<$rawty> for $name {
            fn from(raw: $rawty) -> Self {
                Self(raw)
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

impl_fword!(
    FWord,
    "A 16-bit signed quantity in font design units.",
    i16,
    to_i16
);
impl_fword!(
    UfWord,
    "A 16-bit unsigned quantity in font design units.",
    u16,
    to_u16
);
