//! CLR runtime header (`IMAGE_COR20_HEADER`).
//!
//! Managed images carry a 72-byte CLI header in the `ClrRuntimeHeader` directory. It points
//! at the metadata root and a handful of auxiliary tables. Decoding the metadata streams
//! themselves is left to dedicated .NET tooling; [`Cor20Header::metadata`] hands out the
//! raw bytes.

use crate::{directories::DirectoryContext, file::parser::Parser, Result};

/// Size of the CLI header
pub const COR20_HEADER_SIZE: usize = 72;

/// `COMIMAGE_FLAGS_*` bits defined by ECMA-335
const VALID_FLAGS: u32 = 0x0001_001F;

/// Decoded CLI header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header, 72
    pub cb: u32,
    /// Minimum runtime major version
    pub major_runtime_version: u16,
    /// Minimum runtime minor version
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// `COMIMAGE_FLAGS_*`
    pub flags: u32,
    /// Entry point method token, or RVA of a native entry point
    pub entry_point_token: u32,
    /// RVA of managed resources
    pub resource_rva: u32,
    /// Size of managed resources
    pub resource_size: u32,
    /// RVA of the strong name signature
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
    /// Reserved, zero
    pub code_manager_table_rva: u32,
    /// Reserved, zero
    pub code_manager_table_size: u32,
    /// RVA of the VTable fixups
    pub vtable_fixups_rva: u32,
    /// Size of the VTable fixups
    pub vtable_fixups_size: u32,
    /// Reserved, zero
    pub export_address_table_jmp_rva: u32,
    /// Reserved, zero
    pub export_address_table_jmp_size: u32,
    /// RVA of the precompiled image header
    pub managed_native_header_rva: u32,
    /// Size of the precompiled image header
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Decode a CLI header from its 72 bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short, or
    /// [`crate::Error::Malformed`] for a wrong `cb`, a missing metadata directory or
    /// undefined flag bits.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        let mut parser = Parser::new(data);
        parser.ensure_remaining(COR20_HEADER_SIZE)?;

        let cb = parser.read_le::<u32>()?;
        if cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!("CLR header has no metadata directory"));
        }

        let flags = parser.read_le::<u32>()?;
        if flags & !VALID_FLAGS != 0 {
            return Err(malformed_error!(
                "Invalid CLR flags: 0x{:08X} contains undefined bits",
                flags
            ));
        }

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token: parser.read_le::<u32>()?,
            resource_rva: parser.read_le::<u32>()?,
            resource_size: parser.read_le::<u32>()?,
            strong_name_signature_rva: parser.read_le::<u32>()?,
            strong_name_signature_size: parser.read_le::<u32>()?,
            code_manager_table_rva: parser.read_le::<u32>()?,
            code_manager_table_size: parser.read_le::<u32>()?,
            vtable_fixups_rva: parser.read_le::<u32>()?,
            vtable_fixups_size: parser.read_le::<u32>()?,
            export_address_table_jmp_rva: parser.read_le::<u32>()?,
            export_address_table_jmp_size: parser.read_le::<u32>()?,
            managed_native_header_rva: parser.read_le::<u32>()?,
            managed_native_header_size: parser.read_le::<u32>()?,
        })
    }

    /// Decode the CLI header at `rva`.
    ///
    /// # Errors
    /// Returns an error if the header is not mapped or fails [`Cor20Header::read`].
    pub fn parse(ctx: &DirectoryContext<'_>, rva: u32) -> Result<Cor20Header> {
        Self::read(ctx.slice_at_rva(rva, COR20_HEADER_SIZE)?)
    }

    /// Raw metadata bytes, starting with the `BSJB` root signature.
    ///
    /// # Errors
    /// Returns an error if the metadata range is not mapped or exceeds the buffer.
    pub fn metadata<'a>(&self, ctx: &DirectoryContext<'a>) -> Result<&'a [u8]> {
        ctx.slice_at_rva(self.meta_data_rva, self.meta_data_size as usize)
    }
}
