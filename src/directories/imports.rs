//! Import directory: descriptors, lookup tables and hint/name records.
//!
//! The directory is an array of 20-byte `IMAGE_IMPORT_DESCRIPTOR` entries terminated by an
//! all-zero entry. Each descriptor names a module and points at two parallel thunk arrays:
//! the import lookup table (`OriginalFirstThunk`) and the import address table
//! (`FirstThunk`). A thunk with the high bit set is an ordinal import; otherwise it is the
//! RVA of a hint/name record (`u16` hint followed by a NUL-terminated name).

use crate::{directories::DirectoryContext, Result};

/// Size of one import descriptor
pub const IMPORT_DESCRIPTOR_SIZE: usize = 20;
/// Ordinal flag of a PE32 thunk
pub const ORDINAL_FLAG_32: u64 = 0x8000_0000;
/// Ordinal flag of a PE32+ thunk
pub const ORDINAL_FLAG_64: u64 = 0x8000_0000_0000_0000;

/// One decoded `IMAGE_IMPORT_DESCRIPTOR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    /// File offset of the descriptor
    pub offset: usize,
    /// RVA of the import lookup table
    pub original_first_thunk: u32,
    /// Zero unless the image is bound
    pub time_date_stamp: u32,
    /// Index of the first forwarder reference
    pub forwarder_chain: u32,
    /// RVA of the module name
    pub name_rva: u32,
    /// RVA of the import address table
    pub first_thunk: u32,
    /// The module name
    pub dll_name: String,
}

impl ImportDescriptor {
    /// RVA of the thunk array that names the imports; falls back to the IAT when the
    /// lookup table is absent.
    #[must_use]
    pub fn lookup_table(&self) -> u32 {
        if self.original_first_thunk != 0 {
            self.original_first_thunk
        } else {
            self.first_thunk
        }
    }
}

/// How an import is identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportName {
    /// Imported by name, with a hint into the exporter's name table
    Name {
        /// Export name table index hint
        hint: u16,
        /// Symbol name
        name: String,
    },
    /// Imported by ordinal
    Ordinal(u16),
}

impl ImportName {
    /// The symbol name, if imported by name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            ImportName::Name { name, .. } => Some(name),
            ImportName::Ordinal(_) => None,
        }
    }
}

/// One imported symbol, flattened with its module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFunction {
    /// Module the symbol is imported from
    pub dll: String,
    /// Name or ordinal
    pub import: ImportName,
    /// RVA of the lookup table entry
    pub thunk_rva: u32,
    /// RVA of the import address table slot the loader patches
    pub iat_rva: u32,
    /// Raw value of the lookup table entry
    pub thunk_value: u64,
}

/// Decode the descriptor array starting at `rva`, excluding the terminator.
///
/// # Errors
/// Returns [`crate::Error::NotMapped`] if the directory or a module name is not mapped,
/// [`crate::Error::OutOfBounds`] if the array runs off the buffer, or
/// [`crate::Error::Malformed`] if no terminator is found within the configured limit.
pub fn parse_descriptors(ctx: &DirectoryContext<'_>, rva: u32) -> Result<Vec<ImportDescriptor>> {
    let mut parser = ctx.parser_at_rva(rva)?;
    let mut descriptors = Vec::new();

    loop {
        if descriptors.len() >= ctx.config.max_import_descriptors {
            return Err(malformed_error!(
                "Import directory exceeds {} descriptors",
                ctx.config.max_import_descriptors
            ));
        }

        let offset = parser.pos();
        let original_first_thunk = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let forwarder_chain = parser.read_le::<u32>()?;
        let name_rva = parser.read_le::<u32>()?;
        let first_thunk = parser.read_le::<u32>()?;

        if original_first_thunk == 0
            && time_date_stamp == 0
            && forwarder_chain == 0
            && name_rva == 0
            && first_thunk == 0
        {
            break;
        }

        descriptors.push(ImportDescriptor {
            offset,
            original_first_thunk,
            time_date_stamp,
            forwarder_chain,
            name_rva,
            first_thunk,
            dll_name: ctx.cstring_at_rva(name_rva)?,
        });
    }

    Ok(descriptors)
}

/// Decode the symbols imported through every descriptor.
///
/// # Errors
/// Returns an error if a thunk array or hint/name record cannot be read.
pub fn parse_functions(
    ctx: &DirectoryContext<'_>,
    descriptors: &[ImportDescriptor],
) -> Result<Vec<ImportedFunction>> {
    let mut functions = Vec::new();
    for descriptor in descriptors {
        functions.extend(walk_thunks(
            ctx,
            &descriptor.dll_name,
            descriptor.lookup_table(),
            descriptor.first_thunk,
            0,
        )?);
    }
    Ok(functions)
}

/// Walk a zero-terminated thunk array and decode each entry.
///
/// `name_bias` is subtracted from hint/name pointers before translation; it is the image
/// base for old delay-import tables that store virtual addresses, zero otherwise.
///
/// # Errors
/// Returns an error if the array or a hint/name record cannot be read, or the array has
/// no terminator within the configured limit.
pub fn walk_thunks(
    ctx: &DirectoryContext<'_>,
    dll: &str,
    lookup_rva: u32,
    iat_rva: u32,
    name_bias: u64,
) -> Result<Vec<ImportedFunction>> {
    let mut functions = Vec::new();
    if lookup_rva == 0 {
        return Ok(functions);
    }

    let pointer_size = ctx.pointer_size();
    let ordinal_flag = if ctx.is_64 {
        ORDINAL_FLAG_64
    } else {
        ORDINAL_FLAG_32
    };
    let mut parser = ctx.parser_at_rva(lookup_rva)?;

    for index in 0.. {
        if index >= ctx.config.max_thunks_per_descriptor {
            return Err(malformed_error!(
                "Thunk array of '{}' exceeds {} entries",
                dll,
                ctx.config.max_thunks_per_descriptor
            ));
        }

        let value = parser.read_ptr(ctx.is_64)?;
        if value == 0 {
            break;
        }

        let step = u32::try_from(index * pointer_size)
            .map_err(|_| malformed_error!("Thunk array of '{}' is too large", dll))?;

        let import = if value & ordinal_flag != 0 {
            ImportName::Ordinal((value & 0xFFFF) as u16)
        } else {
            let name_rva = u32::try_from(value.wrapping_sub(name_bias) & 0x7FFF_FFFF)
                .map_err(|_| malformed_error!("Hint/name pointer 0x{:X} is invalid", value))?;
            let mut record = ctx.parser_at_rva(name_rva)?;
            let hint = record.read_le::<u16>()?;
            let name = ctx.buffer.read_cstring(
                record.pos(),
                ctx.config.max_string_length + 1,
            )?;
            ImportName::Name { hint, name }
        };

        functions.push(ImportedFunction {
            dll: dll.to_string(),
            import,
            thunk_rva: lookup_rva.wrapping_add(step),
            iat_rva: iat_rva.wrapping_add(step),
            thunk_value: value,
        });
    }

    Ok(functions)
}
