//! Export directory.

use crate::{directories::DirectoryContext, Result};

/// Size of `IMAGE_EXPORT_DIRECTORY`
pub const EXPORT_DIRECTORY_SIZE: usize = 40;

/// One exported symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFunction {
    /// Biased ordinal (`Base + index`)
    pub ordinal: u32,
    /// RVA of the symbol, or of the forwarder string
    pub rva: u32,
    /// Name, if the symbol is exported by name
    pub name: Option<String>,
    /// `module.symbol` string for forwarded exports
    pub forwarder: Option<String>,
}

/// Decoded `IMAGE_EXPORT_DIRECTORY` with its address, name and ordinal tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDirectory {
    /// Reserved, zero
    pub characteristics: u32,
    /// Creation timestamp
    pub time_date_stamp: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// RVA of the module name
    pub name_rva: u32,
    /// Ordinal base
    pub base: u32,
    /// Entries in the export address table
    pub number_of_functions: u32,
    /// Entries in the name pointer table
    pub number_of_names: u32,
    /// RVA of the export address table
    pub address_of_functions: u32,
    /// RVA of the name pointer table
    pub address_of_names: u32,
    /// RVA of the ordinal table
    pub address_of_name_ordinals: u32,
    /// Module name
    pub name: String,
    /// Non-empty export address table entries, in ordinal order
    pub functions: Vec<ExportedFunction>,
}

impl ExportDirectory {
    /// Decode the export directory at `rva` spanning `size` bytes.
    ///
    /// # Errors
    /// Returns an error if the directory or one of its tables cannot be read, or if it
    /// declares more functions than the configured limit.
    pub fn parse(ctx: &DirectoryContext<'_>, rva: u32, size: u32) -> Result<ExportDirectory> {
        let mut parser = ctx.parser_at_rva(rva)?;

        let characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let name_rva = parser.read_le::<u32>()?;
        let base = parser.read_le::<u32>()?;
        let number_of_functions = parser.read_le::<u32>()?;
        let number_of_names = parser.read_le::<u32>()?;
        let address_of_functions = parser.read_le::<u32>()?;
        let address_of_names = parser.read_le::<u32>()?;
        let address_of_name_ordinals = parser.read_le::<u32>()?;

        let limit = ctx.config.max_exports;
        if number_of_functions as usize > limit || number_of_names as usize > limit {
            return Err(malformed_error!(
                "Export directory declares {} functions and {} names, limit is {}",
                number_of_functions,
                number_of_names,
                limit
            ));
        }

        let name = if name_rva == 0 {
            String::new()
        } else {
            ctx.cstring_at_rva(name_rva)?
        };

        let mut names: Vec<Option<String>> = vec![None; number_of_functions as usize];
        if number_of_names > 0 {
            let mut name_pointers = ctx.parser_at_rva(address_of_names)?;
            let mut ordinals = ctx.parser_at_rva(address_of_name_ordinals)?;
            for _ in 0..number_of_names {
                let pointer = name_pointers.read_le::<u32>()?;
                let index = usize::from(ordinals.read_le::<u16>()?);
                if let Some(slot) = names.get_mut(index) {
                    *slot = Some(ctx.cstring_at_rva(pointer)?);
                }
            }
        }

        let directory_end = u64::from(rva) + u64::from(size);
        let mut functions = Vec::new();
        if number_of_functions > 0 {
            let mut addresses = ctx.parser_at_rva(address_of_functions)?;
            for (index, name) in names.into_iter().enumerate() {
                let function_rva = addresses.read_le::<u32>()?;
                if function_rva == 0 {
                    continue;
                }

                let forwarder = if function_rva >= rva && u64::from(function_rva) < directory_end {
                    Some(ctx.cstring_at_rva(function_rva)?)
                } else {
                    None
                };

                functions.push(ExportedFunction {
                    ordinal: base.wrapping_add(index as u32),
                    rva: function_rva,
                    name,
                    forwarder,
                });
            }
        }

        Ok(ExportDirectory {
            characteristics,
            time_date_stamp,
            major_version,
            minor_version,
            name_rva,
            base,
            number_of_functions,
            number_of_names,
            address_of_functions,
            address_of_names,
            address_of_name_ordinals,
            name,
            functions,
        })
    }

    /// Find an export by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ExportedFunction> {
        self.functions
            .iter()
            .find(|function| function.name.as_deref() == Some(name))
    }

    /// Find an export by biased ordinal.
    #[must_use]
    pub fn by_ordinal(&self, ordinal: u32) -> Option<&ExportedFunction> {
        self.functions
            .iter()
            .find(|function| function.ordinal == ordinal)
    }
}
