//! Raw font scalars: unaligned big-endian bytes.

mod sealed {
    /// A fixed-size byte array, the wire form of some scalar.
    pub trait BeByteArray: Copy + AsRef<[u8]> + PartialEq + Eq + std::hash::Hash + 'static {
        fn from_slice(slice: &[u8]) -> Option<Self>;
    }

    macro_rules! be_byte_array {
        ($len:literal) => {
            impl BeByteArray for [u8; $len] {
                fn from_slice(slice: &[u8]) -> Option<Self> {
                    slice.try_into().ok()
                }
            }
        };
    }

    be_byte_array!(1);
    be_byte_array!(2);
    be_byte_array!(4);
}

/// A trait for font scalars.
///
/// This is an internal trait for encoding and decoding big-endian bytes,
/// and is not intended to be implemented outside this crate.
pub trait Scalar: Copy + FixedSize {
    /// The raw byte representation of this type.
    type Raw: sealed::BeByteArray;

    /// Encode this type as raw big-endian bytes.
    fn to_raw(self) -> Self::Raw;

    /// Create an instance of this type from raw big-endian bytes.
    fn from_raw(raw: Self::Raw) -> Self;

    /// Attempt to read a scalar from a slice.
    ///
    /// This will always succeed if `slice.len() == Self::RAW_BYTE_LEN`, and
    /// will always return `None` otherwise.
    fn read(slice: &[u8]) -> Option<Self> {
        sealed::BeByteArray::from_slice(slice).map(Self::from_raw)
    }
}

/// A trait for types with a known, constant size.
pub trait FixedSize: Sized {
    /// The raw size of this type, in bytes.
    const RAW_BYTE_LEN: usize;
}

/// A wrapper around raw big-endian bytes for some type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct BigEndian<T: Scalar>(T::Raw);

// # SAFETY:
//
// `BigEndian<T>` has the bound `T: Scalar`, and contains only a single value,
// `<T as Scalar>::Raw`, which is only ever a byte array.
unsafe impl<T> bytemuck::Zeroable for BigEndian<T> where T: Scalar + Copy {}
unsafe impl<T> bytemuck::AnyBitPattern for BigEndian<T> where T: Scalar + Copy + 'static {}

impl<T: Scalar> BigEndian<T> {
    /// Attempt to construct a new raw value from this slice.
    ///
    /// This will fail if `slice.len() != T::RAW_BYTE_LEN`.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        sealed::BeByteArray::from_slice(slice).map(Self)
    }

    /// Convert this raw type to its native representation.
    #[inline(always)]
    pub fn get(self) -> T {
        T::from_raw(self.0)
    }

    /// Set the value, overwriting the bytes.
    pub fn set(&mut self, value: T) {
        self.0 = value.to_raw();
    }

    /// The raw big-endian bytes.
    pub fn be_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: Scalar> From<T> for BigEndian<T> {
    #[inline]
    fn from(val: T) -> Self {
        BigEndian(val.to_raw())
    }
}

impl<T: Scalar + Default> Default for BigEndian<T> {
    fn default() -> Self {
        Self::from(T::default())
    }
}

impl<T: Scalar + std::fmt::Debug> std::fmt::Debug for BigEndian<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.get().fmt(f)
    }
}

impl<T: Scalar + std::fmt::Display> std::fmt::Display for BigEndian<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.get().fmt(f)
    }
}

// NOTE: due to the orphan rules, we cannot impl the inverse of this, e.g.
// impl<T> PartialEq<BigEndian<T>> for T
impl<T: Scalar + PartialEq> PartialEq<T> for BigEndian<T> {
    fn eq(&self, other: &T) -> bool {
        self.get() == *other
    }
}

impl<T: Scalar + PartialOrd> PartialOrd for BigEndian<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.get().partial_cmp(&other.get())
    }
}

impl<T: Scalar + Ord + Eq> Ord for BigEndian<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.get().cmp(&other.get())
    }
}

impl<T: Scalar> FixedSize for BigEndian<T> {
    const RAW_BYTE_LEN: usize = T::RAW_BYTE_LEN;
}

macro_rules! int_scalar {
    ($ty:ty, $raw:ty) => {
        impl FixedSize for $ty {
            const RAW_BYTE_LEN: usize = std::mem::size_of::<$raw>();
        }

        impl Scalar for $ty {
            type Raw = $raw;

            fn to_raw(self) -> Self::Raw {
                self.to_be_bytes()
            }

            #[inline(always)]
            fn from_raw(raw: Self::Raw) -> $ty {
                Self::from_be_bytes(raw)
            }
        }
    };
}

int_scalar!(u8, [u8; 1]);
int_scalar!(i8, [u8; 1]);
int_scalar!(u16, [u8; 2]);
int_scalar!(i16, [u8; 2]);
int_scalar!(u32, [u8; 4]);
int_scalar!(i32, [u8; 4]);
