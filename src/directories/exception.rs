//! x64 exception directory (`.pdata`) and unwind information.
//!
//! The directory is an array of 12-byte `RUNTIME_FUNCTION` entries sorted by start
//! address. Each entry points at an `UNWIND_INFO` record describing the function's prolog.

use crate::{directories::DirectoryContext, Error, Result};

/// `IMAGE_FILE_MACHINE_AMD64`
pub const MACHINE_AMD64: u16 = 0x8664;
/// Size of one `RUNTIME_FUNCTION`
pub const RUNTIME_FUNCTION_SIZE: usize = 12;

/// `UNW_FLAG_EHANDLER`
pub const UNW_FLAG_EHANDLER: u8 = 0x1;
/// `UNW_FLAG_UHANDLER`
pub const UNW_FLAG_UHANDLER: u8 = 0x2;
/// `UNW_FLAG_CHAININFO`
pub const UNW_FLAG_CHAININFO: u8 = 0x4;

/// One raw unwind code slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwindCode {
    /// Offset of the end of the prolog instruction
    pub code_offset: u8,
    /// `UWOP_*` operation
    pub unwind_op: u8,
    /// Operation specific info
    pub op_info: u8,
}

/// Decoded `UNWIND_INFO` header and code slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindInfo {
    /// Format version, 1 or 2
    pub version: u8,
    /// `UNW_FLAG_*`
    pub flags: u8,
    /// Length of the prolog in bytes
    pub size_of_prolog: u8,
    /// Register used as frame pointer, zero if none
    pub frame_register: u8,
    /// Scaled frame pointer offset
    pub frame_offset: u8,
    /// Code slots, in table order
    pub codes: Vec<UnwindCode>,
    /// RVA of the language specific handler, when `EHANDLER` or `UHANDLER` is set
    pub handler_rva: Option<u32>,
    /// The parent function entry, when `CHAININFO` is set
    pub chained: Option<RuntimeFunction>,
}

impl UnwindInfo {
    /// Decode the unwind record at `rva`.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or has an unknown version.
    pub fn parse(ctx: &DirectoryContext<'_>, rva: u32) -> Result<UnwindInfo> {
        let mut parser = ctx.parser_at_rva(rva)?;

        let version_flags = parser.read_le::<u8>()?;
        let version = version_flags & 0x7;
        let flags = version_flags >> 3;
        if version != 1 && version != 2 {
            return Err(malformed_error!(
                "Unwind info at RVA 0x{:X} has version {}",
                rva,
                version
            ));
        }

        let size_of_prolog = parser.read_le::<u8>()?;
        let count = parser.read_le::<u8>()?;
        let frame = parser.read_le::<u8>()?;

        let mut codes = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let code_offset = parser.read_le::<u8>()?;
            let op = parser.read_le::<u8>()?;
            codes.push(UnwindCode {
                code_offset,
                unwind_op: op & 0xF,
                op_info: op >> 4,
            });
        }

        // The code array is padded to an even number of slots
        if count % 2 == 1 {
            parser.advance_by(2)?;
        }

        let mut handler_rva = None;
        let mut chained = None;
        if flags & UNW_FLAG_CHAININFO != 0 {
            chained = Some(RuntimeFunction {
                begin_address: parser.read_le::<u32>()?,
                end_address: parser.read_le::<u32>()?,
                unwind_info_address: parser.read_le::<u32>()?,
            });
        } else if flags & (UNW_FLAG_EHANDLER | UNW_FLAG_UHANDLER) != 0 {
            handler_rva = Some(parser.read_le::<u32>()?);
        }

        Ok(UnwindInfo {
            version,
            flags,
            size_of_prolog,
            frame_register: frame & 0xF,
            frame_offset: frame >> 4,
            codes,
            handler_rva,
            chained,
        })
    }
}

/// One `RUNTIME_FUNCTION` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeFunction {
    /// RVA of the first instruction
    pub begin_address: u32,
    /// RVA just past the last instruction
    pub end_address: u32,
    /// RVA of the unwind record
    pub unwind_info_address: u32,
}

impl RuntimeFunction {
    /// Decode this function's unwind record.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or is malformed.
    pub fn unwind_info(&self, ctx: &DirectoryContext<'_>) -> Result<UnwindInfo> {
        UnwindInfo::parse(ctx, self.unwind_info_address)
    }

    /// Returns `true` if `rva` lies inside the function.
    #[must_use]
    pub fn contains(&self, rva: u32) -> bool {
        rva >= self.begin_address && rva < self.end_address
    }
}

/// Decode the runtime function table in the `size` bytes at `rva`.
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] for machines other than x64, or an error if the
/// table cannot be read or exceeds the configured limit.
pub fn parse(ctx: &DirectoryContext<'_>, rva: u32, size: u32) -> Result<Vec<RuntimeFunction>> {
    if ctx.machine != MACHINE_AMD64 {
        return Err(Error::NotSupported);
    }

    let count = size as usize / RUNTIME_FUNCTION_SIZE;
    if count > ctx.config.max_runtime_functions {
        return Err(malformed_error!(
            "Exception directory holds {} functions, limit is {}",
            count,
            ctx.config.max_runtime_functions
        ));
    }

    let mut parser = ctx.parser_at_rva(rva)?;
    let mut functions = Vec::with_capacity(count);
    for _ in 0..count {
        let function = RuntimeFunction {
            begin_address: parser.read_le::<u32>()?,
            end_address: parser.read_le::<u32>()?,
            unwind_info_address: parser.read_le::<u32>()?,
        };
        if function.begin_address == 0 && function.end_address == 0 {
            continue;
        }
        functions.push(function);
    }

    Ok(functions)
}
