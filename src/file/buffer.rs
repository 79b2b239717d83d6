//! Owned, resizable byte store backing a [`crate::PeFile`].
//!
//! [`RawBuffer`] is the only component that touches bytes: every header handle, directory
//! decoder and structural edit goes through its bounds-checked accessors. Reads and writes
//! outside the current length fail with [`crate::Error::OutOfBounds`] instead of truncating.
//!
//! Each mutating call bumps a generation counter. Derived views (decoded section table,
//! parsed directories) are memoised against that counter, so a view computed before an edit
//! is never served after it.

use super::{
    io::{read_le_at, write_le_at, PeIO},
    Backend,
};
use crate::{Error::OutOfBounds, Result};

/// Input file backed by an owned, growable byte vector.
#[derive(Debug, Clone, Default)]
pub struct RawBuffer {
    data: Vec<u8>,
    generation: u64,
}

impl RawBuffer {
    /// Create a new buffer that takes ownership of `data`.
    ///
    /// ## Arguments
    /// * 'data' - The data buffer to consume
    #[must_use]
    pub fn new(data: Vec<u8>) -> RawBuffer {
        RawBuffer {
            data,
            generation: 0,
        }
    }

    /// Returns the current length of the buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the entire buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Current generation; incremented by every mutating call.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Consume the buffer and return the underlying bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<usize> {
        let Some(end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(end)
    }

    /// Read a little-endian value at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit inside the buffer.
    pub fn read<T: PeIO>(&self, offset: usize) -> Result<T> {
        let mut cursor = offset;
        read_le_at(&self.data, &mut cursor)
    }

    /// Write a little-endian value at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit inside the buffer.
    pub fn write<T: PeIO>(&mut self, offset: usize, value: T) -> Result<()> {
        let mut cursor = offset;
        write_le_at(&mut self.data, &mut cursor, value)?;
        self.touch();
        Ok(())
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the buffer.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = self.check_range(offset, len)?;
        Ok(&self.data[offset..end])
    }

    /// Overwrite the bytes at `offset` with `bytes`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the buffer.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = self.check_range(offset, bytes.len())?;
        self.data[offset..end].copy_from_slice(bytes);
        self.touch();
        Ok(())
    }

    /// Set `len` bytes starting at `offset` to `value`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the buffer.
    pub fn fill(&mut self, offset: usize, len: usize, value: u8) -> Result<()> {
        let end = self.check_range(offset, len)?;
        self.data[offset..end].fill(value);
        self.touch();
        Ok(())
    }

    /// Read a NUL-terminated ASCII string of at most `max_len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` is outside the buffer, or
    /// [`crate::Error::Malformed`] if the string is unterminated within `max_len` bytes or
    /// contains non-ASCII bytes.
    pub fn read_cstring(&self, offset: usize, max_len: usize) -> Result<String> {
        if offset >= self.data.len() {
            return Err(OutOfBounds);
        }

        let window_end = self.data.len().min(offset.saturating_add(max_len));
        let window = &self.data[offset..window_end];
        let Some(len) = window.iter().position(|&b| b == 0) else {
            return Err(malformed_error!(
                "Unterminated string at offset 0x{:X} (limit {} bytes)",
                offset,
                max_len
            ));
        };

        let bytes = &window[..len];
        if !bytes.is_ascii() {
            return Err(malformed_error!(
                "Non-ASCII string at offset 0x{:X}",
                offset
            ));
        }

        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    }

    /// Write `value` followed by a NUL terminator at `offset`, returning the bytes written.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the string and terminator do not fit.
    pub fn write_cstring(&mut self, offset: usize, value: &str) -> Result<usize> {
        let total = value.len() + 1;
        let end = self.check_range(offset, total)?;
        self.data[offset..end - 1].copy_from_slice(value.as_bytes());
        self.data[end - 1] = 0;
        self.touch();
        Ok(total)
    }

    /// Append `bytes` to the end of the buffer, returning the offset at which they begin.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        self.touch();
        offset
    }

    /// Append `len` zero bytes, returning the offset at which they begin.
    pub fn append_zeros(&mut self, len: usize) -> usize {
        let offset = self.data.len();
        self.data.resize(offset + len, 0);
        self.touch();
        offset
    }

    /// Remove `len` bytes at `offset`, shifting all later bytes left.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the buffer.
    pub fn delete_range(&mut self, offset: usize, len: usize) -> Result<()> {
        let end = self.check_range(offset, len)?;
        self.data.drain(offset..end);
        self.touch();
        Ok(())
    }

    /// Insert `bytes` at `offset`, shifting all later bytes right.
    ///
    /// Inserting at exactly the current length is equivalent to appending.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` is past the end of the buffer.
    pub fn insert_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset > self.data.len() {
            return Err(OutOfBounds);
        }
        self.data.splice(offset..offset, bytes.iter().copied());
        self.touch();
        Ok(())
    }

    /// Run `f` against this buffer and roll every byte back if it returns an error.
    ///
    /// The generation counter is still advanced on rollback, so views memoised while `f`
    /// was running are discarded as well.
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.data.clone();
        let result = f(self);
        if result.is_err() {
            self.data = snapshot;
            self.touch();
        }
        result
    }
}

impl Backend for RawBuffer {
    fn len(&self) -> usize {
        RawBuffer::len(self)
    }

    fn into_data(self: Box<Self>) -> Vec<u8> {
        self.data
    }
}
