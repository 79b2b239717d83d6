//! Cursor-based reader for PE directory structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice. Directory decoders in [`crate::directories`] seek the cursor to a translated file
//! offset and then read fields sequentially, exactly as they are laid out on disk.
//!
//! # Examples
//!
//! ```rust
//! use pescope::Parser;
//!
//! // hint = 0, name = "ExitProcess"
//! let data = b"\x00\x00ExitProcess\x00";
//! let mut parser = Parser::new(data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0);
//! assert_eq!(parser.read_string_utf8()?, "ExitProcess");
//! assert!(!parser.has_more_data());
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, read_le_at_ptr, PeIO},
    Result,
};

/// A bounds-checked cursor over a byte slice.
///
/// Every read validates that enough data is available and advances the position only on
/// success, so a failed read leaves the cursor where it was.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Create a parser positioned at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` lies past the end of `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        Ok(parser)
    }

    /// Returns the length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there are bytes left after the current position.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor to an absolute position.
    ///
    /// Seeking to exactly the end of the data is allowed; any read from there fails.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the new position would pass the end of the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Returns the current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the full underlying data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Read a value without advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are not enough bytes.
    pub fn peek_le<T: PeIO>(&self) -> Result<T> {
        let mut temp_position = self.position;
        read_le_at::<T>(self.data, &mut temp_position)
    }

    /// Run `f` and restore the cursor position if it fails.
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Align the cursor up to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the aligned position is past the end of the data.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment == 0 {
            return Ok(());
        }
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a little-endian value and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are not enough bytes.
    pub fn read_le<T: PeIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a pointer-sized value (4 bytes for PE32, 8 bytes for PE32+), widened to `u64`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are not enough bytes.
    pub fn read_ptr(&mut self, is_64: bool) -> Result<u64> {
        read_le_at_ptr(self.data, &mut self.position, is_64)
    }

    /// Read a NUL-terminated string.
    ///
    /// PE names (DLL names, import and export names, section-independent strings) are ASCII
    /// in practice; anything that is not valid UTF-8 is rejected. A string that runs into the
    /// end of the data without a terminator is returned as-is.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is at the end of the data, or
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        self.read_string_utf8_bounded(usize::MAX)
    }

    /// Read a NUL-terminated string of at most `max_len` bytes (terminator excluded).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is at the end of the data,
    /// [`crate::Error::Malformed`] if no terminator is found within `max_len` bytes or the
    /// bytes are not valid UTF-8.
    pub fn read_string_utf8_bounded(&mut self, max_len: usize) -> Result<String> {
        let start = self.position;
        if start >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let limit = self.data.len().min(start.saturating_add(max_len));
        let mut end = start;
        while end < limit && self.data[end] != 0 {
            end += 1;
        }

        if end == limit && limit < self.data.len() && self.data[end] != 0 {
            return Err(malformed_error!(
                "String at offset {} exceeds the maximum length of {} bytes",
                start,
                max_len
            ));
        }

        let string_data = &self.data[start..end];
        self.position = if end < self.data.len() { end + 1 } else { end };

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                end,
                e.utf8_error()
            )
        })
    }

    /// Returns the number of bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Verify that at least `needed` bytes are left.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(out_of_bounds_error!());
        }
        Ok(())
    }

    /// Compute the position `length` bytes ahead of the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on overflow or if it passes the end of the data.
    pub fn calc_end_position(&self, length: usize) -> Result<usize> {
        let Some(end) = self.position.checked_add(length) else {
            return Err(out_of_bounds_error!());
        };
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(end)
    }

    /// Read `length` raw bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are not enough bytes.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }
}
