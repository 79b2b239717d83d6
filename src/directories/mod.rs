//! Decoders for the structures rooted at the optional header's data directories.
//!
//! Each submodule decodes one directory. All of them receive a [`DirectoryContext`],
//! which bundles the buffer, the current section table and the parsing limits, and
//! translate addresses through it. A decoder never writes to the buffer; the structural
//! mutators in [`crate::mutation`] are the only writers.
//!
//! # Directories
//!
//! | Slot | Module |
//! |------|--------|
//! | Export | [`exports`] |
//! | Import | [`imports`] |
//! | Resource | [`resources`] (root directory level) |
//! | Exception | [`exception`] (x64 only) |
//! | Security | [`security`] (address is a file offset) |
//! | BaseRelocation | [`relocations`] |
//! | Debug | [`debug`] |
//! | Tls | [`tls`] |
//! | LoadConfig | [`loadconfig`] |
//! | BoundImport | [`boundimport`] |
//! | DelayImport | [`delayimport`] |
//! | ClrRuntimeHeader | [`clr`] |

pub mod boundimport;
pub mod clr;
pub mod debug;
pub mod delayimport;
pub mod exception;
pub mod exports;
pub mod imports;
pub mod loadconfig;
pub mod relocations;
pub mod resources;
pub mod security;
pub mod tls;

use crate::{
    file::{
        address::{rva_to_offset, rva_to_offset_with_headers, va_to_rva},
        headers::Section,
        parser::Parser,
        PeConfig, RawBuffer,
    },
    Result,
};

/// Everything a directory decoder needs to locate and read its structures.
#[derive(Clone, Copy)]
pub struct DirectoryContext<'a> {
    /// The image bytes
    pub buffer: &'a RawBuffer,
    /// Section table of the current buffer generation
    pub sections: &'a [Section],
    /// `true` for PE32+ images
    pub is_64: bool,
    /// Preferred load address
    pub image_base: u64,
    /// `SizeOfHeaders`, the extent of the header region
    pub size_of_headers: u32,
    /// COFF machine type
    pub machine: u16,
    /// Parsing limits
    pub config: &'a PeConfig,
}

impl<'a> DirectoryContext<'a> {
    /// Translate an RVA, falling back to the header region when the config allows it.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`] if `rva` cannot be translated.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        if self.config.header_region_fallback {
            rva_to_offset_with_headers(rva, self.sections, self.size_of_headers)
        } else {
            rva_to_offset(rva, self.sections)
        }
    }

    /// Convert a virtual address into an RVA.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`] if `va` is below the image base.
    pub fn va_to_rva(&self, va: u64) -> Result<u32> {
        va_to_rva(va, self.image_base)
    }

    /// A parser over the whole image positioned at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`] if `rva` cannot be translated or
    /// [`crate::Error::OutOfBounds`] if it maps past the end of the buffer.
    pub fn parser_at_rva(&self, rva: u32) -> Result<Parser<'a>> {
        let offset = self.rva_to_offset(rva)?;
        Parser::at(self.buffer.data(), offset)
    }

    /// Borrow `len` bytes starting at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`] or [`crate::Error::OutOfBounds`].
    pub fn slice_at_rva(&self, rva: u32, len: usize) -> Result<&'a [u8]> {
        let offset = self.rva_to_offset(rva)?;
        self.buffer.read_bytes(offset, len)
    }

    /// Read a NUL-terminated ASCII name at `rva`, bounded by the configured length.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`], [`crate::Error::OutOfBounds`] or
    /// [`crate::Error::Malformed`] for an unterminated or non-ASCII name.
    pub fn cstring_at_rva(&self, rva: u32) -> Result<String> {
        let offset = self.rva_to_offset(rva)?;
        self.buffer
            .read_cstring(offset, self.config.max_string_length + 1)
    }

    /// Size of a thunk or pointer field: 8 for PE32+, 4 for PE32.
    #[must_use]
    pub fn pointer_size(&self) -> usize {
        if self.is_64 {
            8
        } else {
            4
        }
    }
}
