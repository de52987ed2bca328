//! small utilities used in tests

use types::Scalar;

use crate::font_data::FontData;

/// A convenience type for generating a buffer of big-endian bytes.
#[derive(Debug, Clone, Default)]
pub struct BeBuffer(Vec<u8>);

impl BeBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    /// The current length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Write any scalar to this buffer.
    pub fn push(mut self, item: impl Scalar) -> Self {
        self.0.extend(item.to_raw().as_ref());
        self
    }

    /// Write multiple scalars into the buffer
    pub fn extend<T: Scalar>(mut self, iter: impl IntoIterator<Item = T>) -> Self {
        for item in iter {
            self.0.extend(item.to_raw().as_ref());
        }
        self
    }

    /// Overwrite the two bytes at `pos` with a u16 value.
    ///
    /// Useful for patching offsets once the offset target's position is known.
    pub fn write_over(mut self, pos: usize, value: u16) -> Self {
        self.0[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
        self
    }

    pub fn font_data(&self) -> FontData {
        FontData::new(&self.0)
    }
}

impl std::ops::Deref for BeBuffer {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
