//! Delay-load import directory.
//!
//! Descriptors are 32 bytes each. When bit 0 of `Attributes` is set every address in the
//! descriptor is an RVA; otherwise (Visual C++ 6 era binaries) they are virtual addresses
//! and the image base has to be subtracted first.

use crate::{
    directories::{
        imports::{walk_thunks, ImportedFunction},
        DirectoryContext,
    },
    Result,
};

/// Attribute bit marking RVA-based descriptors
pub const DELAY_ATTRIBUTE_RVA_BASED: u32 = 1;

/// One decoded `ImgDelayDescr`, with addresses normalised to RVAs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayImportDescriptor {
    /// Raw attributes
    pub attributes: u32,
    /// RVA of the module name
    pub name_rva: u32,
    /// RVA of the module handle slot
    pub module_handle_rva: u32,
    /// RVA of the delay import address table
    pub import_address_table_rva: u32,
    /// RVA of the delay import name table
    pub import_name_table_rva: u32,
    /// RVA of the optional bound IAT
    pub bound_import_address_table_rva: u32,
    /// RVA of the optional unload IAT copy
    pub unload_information_table_rva: u32,
    /// Timestamp of the bound module, zero if not bound
    pub time_date_stamp: u32,
    /// Module name
    pub dll_name: String,
    /// Symbols named by the import name table
    pub functions: Vec<ImportedFunction>,
}

impl DelayImportDescriptor {
    /// Returns `true` if the descriptor stored RVAs rather than virtual addresses.
    #[must_use]
    pub fn is_rva_based(&self) -> bool {
        self.attributes & DELAY_ATTRIBUTE_RVA_BASED != 0
    }
}

/// Decode the delay import descriptors at `rva`, excluding the terminator.
///
/// # Errors
/// Returns an error if a descriptor, name or thunk array cannot be read, or there is no
/// terminator within the configured descriptor limit.
pub fn parse(ctx: &DirectoryContext<'_>, rva: u32) -> Result<Vec<DelayImportDescriptor>> {
    let mut parser = ctx.parser_at_rva(rva)?;
    let mut descriptors = Vec::new();

    loop {
        if descriptors.len() >= ctx.config.max_import_descriptors {
            return Err(malformed_error!(
                "Delay import directory exceeds {} descriptors",
                ctx.config.max_import_descriptors
            ));
        }

        let mut raw = [0u32; 8];
        for field in &mut raw {
            *field = parser.read_le::<u32>()?;
        }
        if raw[1] == 0 {
            break;
        }

        let attributes = raw[0];
        let rva_based = attributes & DELAY_ATTRIBUTE_RVA_BASED != 0;
        let normalise = |value: u32| -> Result<u32> {
            if rva_based || value == 0 {
                Ok(value)
            } else {
                ctx.va_to_rva(u64::from(value))
            }
        };

        let name_rva = normalise(raw[1])?;
        let import_address_table_rva = normalise(raw[3])?;
        let import_name_table_rva = normalise(raw[4])?;
        let dll_name = ctx.cstring_at_rva(name_rva)?;
        let name_bias = if rva_based { 0 } else { ctx.image_base };

        descriptors.push(DelayImportDescriptor {
            attributes,
            name_rva,
            module_handle_rva: normalise(raw[2])?,
            import_address_table_rva,
            import_name_table_rva,
            bound_import_address_table_rva: normalise(raw[5])?,
            unload_information_table_rva: normalise(raw[6])?,
            time_date_stamp: raw[7],
            functions: walk_thunks(
                ctx,
                &dll_name,
                import_name_table_rva,
                import_address_table_rva,
                name_bias,
            )?,
            dll_name,
        });
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        directories::{
            imports::ImportName,
            testing::{context, single_section, Fixture},
        },
        file::PeConfig,
    };

    #[test]
    fn rva_based() {
        let mut fx = Fixture::new(0x200);
        fx.u32(0x00, 1)
            .u32(0x04, 0x1100)
            .u32(0x08, 0x1180)
            .u32(0x0C, 0x10C0)
            .u32(0x10, 0x1080)
            .u64(0x80, 0x1140)
            .u64(0x88, 0x8000_0000_0000_0007)
            .bytes(0x100, b"comdlg32.dll\0")
            .bytes(0x140, b"\x00\x00GetOpenFileNameW\0");
        let buffer = fx.buffer();
        let sections = single_section(buffer.len());
        let config = PeConfig::default();
        let ctx = context(&buffer, &sections, &config, true);

        let delay = parse(&ctx, 0x1000).unwrap();
        assert_eq!(delay.len(), 1);
        assert!(delay[0].is_rva_based());
        assert_eq!(delay[0].dll_name, "comdlg32.dll");
        assert_eq!(delay[0].module_handle_rva, 0x1180);
        assert_eq!(delay[0].functions.len(), 2);
        assert_eq!(delay[0].functions[0].import.name(), Some("GetOpenFileNameW"));
        assert_eq!(delay[0].functions[0].iat_rva, 0x10C0);
        assert_eq!(delay[0].functions[1].import, ImportName::Ordinal(7));
    }

    #[test]
    fn va_based() {
        let base = 0x40_0000_u32;
        let mut fx = Fixture::new(0x200);
        fx.u32(0x04, base + 0x1100)
            .u32(0x0C, base + 0x10C0)
            .u32(0x10, base + 0x1080)
            .u32(0x80, base + 0x1140)
            .bytes(0x100, b"old.dll\0")
            .bytes(0x140, b"\x00\x00Legacy\0");
        let buffer = fx.buffer();
        let sections = single_section(buffer.len());
        let config = PeConfig::default();
        let ctx = context(&buffer, &sections, &config, false);

        let delay = parse(&ctx, 0x1000).unwrap();
        assert!(!delay[0].is_rva_based());
        assert_eq!(delay[0].name_rva, 0x1100);
        assert_eq!(delay[0].dll_name, "old.dll");
        assert_eq!(delay[0].functions[0].import.name(), Some("Legacy"));
    }
}
