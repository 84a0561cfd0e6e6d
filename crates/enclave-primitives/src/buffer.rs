#[cfg(test)]
#[path = "tests/buffer.rs"]
mod tests;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
    #[error("range {offset}+{len} is out of bounds for a buffer of {capacity} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("output buffer too small: {required} bytes required, {available} available")]
    TooSmall { required: usize, available: usize },
}

fn checked_range(
    capacity: usize,
    offset: usize,
    len: usize,
) -> Result<core::ops::Range<usize>, BufferError> {
    let out_of_bounds = BufferError::OutOfBounds {
        offset,
        len,
        capacity,
    };

    let end = offset.checked_add(len).ok_or(out_of_bounds)?;

    if end > capacity {
        return Err(out_of_bounds);
    }

    Ok(offset..end)
}

/// A read-only sub-range of a caller-owned buffer.
#[derive(Clone, Copy, Debug)]
pub struct BufferView<'a> {
    bytes: &'a [u8],
}

impl<'a> BufferView<'a> {
    pub fn new(bytes: &'a [u8], offset: usize, len: usize) -> Result<Self, BufferError> {
        let range = checked_range(bytes.len(), offset, len)?;

        Ok(Self {
            bytes: bytes.get(range).unwrap_or_default(),
        })
    }

    #[must_use]
    pub const fn whole(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for BufferView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

/// A writable sub-range of a caller-owned buffer.
///
/// Writes never go past the declared length: anything that does not fit is
/// rejected with [`BufferError::TooSmall`] before a single byte is copied.
#[derive(Debug)]
pub struct BufferViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BufferViewMut<'a> {
    pub fn new(bytes: &'a mut [u8], offset: usize, len: usize) -> Result<Self, BufferError> {
        let range = checked_range(bytes.len(), offset, len)?;

        Ok(Self {
            bytes: bytes.get_mut(range).unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn whole(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn ensure_capacity(&self, required: usize) -> Result<(), BufferError> {
        if required > self.bytes.len() {
            return Err(BufferError::TooSmall {
                required,
                available: self.bytes.len(),
            });
        }

        Ok(())
    }

    /// Mutable access to the first `len` bytes of the view.
    pub fn prefix_mut(&mut self, len: usize) -> Result<&mut [u8], BufferError> {
        self.ensure_capacity(len)?;

        Ok(self.bytes.get_mut(..len).unwrap_or_default())
    }

    /// Copies `data` to the start of the view, returning the number of bytes
    /// written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, BufferError> {
        self.prefix_mut(data.len())?.copy_from_slice(data);

        Ok(data.len())
    }
}

impl AsMut<[u8]> for BufferViewMut<'_> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}
