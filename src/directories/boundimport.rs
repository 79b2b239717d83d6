//! Bound import directory.
//!
//! Each `IMAGE_BOUND_IMPORT_DESCRIPTOR` is followed by its forwarder references. Module
//! names are stored as offsets from the start of the directory. Linkers usually place the
//! directory in the header region, after the section table.

use crate::{directories::DirectoryContext, Result};

/// A module the bound module forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundForwarderRef {
    /// Timestamp of the forwarded-to module at bind time
    pub time_date_stamp: u32,
    /// Name offset relative to the directory
    pub offset_module_name: u16,
    /// Module name
    pub module_name: String,
}

/// One decoded `IMAGE_BOUND_IMPORT_DESCRIPTOR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundImportDescriptor {
    /// Timestamp of the imported module at bind time
    pub time_date_stamp: u32,
    /// Name offset relative to the directory
    pub offset_module_name: u16,
    /// Module name
    pub module_name: String,
    /// Forwarder references following the descriptor
    pub forwarders: Vec<BoundForwarderRef>,
}

/// Decode the bound import descriptors at `rva`, excluding the terminator.
///
/// # Errors
/// Returns an error if the directory cannot be read or has no terminator within the
/// configured descriptor limit.
pub fn parse(ctx: &DirectoryContext<'_>, rva: u32) -> Result<Vec<BoundImportDescriptor>> {
    let base = ctx.rva_to_offset(rva)?;
    let mut parser = ctx.parser_at_rva(rva)?;
    let mut descriptors = Vec::new();
    let read_name = |offset: u16| {
        ctx.buffer
            .read_cstring(base + usize::from(offset), ctx.config.max_string_length + 1)
    };

    loop {
        if descriptors.len() >= ctx.config.max_import_descriptors {
            return Err(malformed_error!(
                "Bound import directory exceeds {} descriptors",
                ctx.config.max_import_descriptors
            ));
        }

        let time_date_stamp = parser.read_le::<u32>()?;
        let offset_module_name = parser.read_le::<u16>()?;
        let forwarder_count = parser.read_le::<u16>()?;
        if time_date_stamp == 0 && offset_module_name == 0 && forwarder_count == 0 {
            break;
        }

        let mut forwarders = Vec::with_capacity(usize::from(forwarder_count));
        for _ in 0..forwarder_count {
            let time_date_stamp = parser.read_le::<u32>()?;
            let offset_module_name = parser.read_le::<u16>()?;
            let _reserved = parser.read_le::<u16>()?;
            forwarders.push(BoundForwarderRef {
                time_date_stamp,
                offset_module_name,
                module_name: read_name(offset_module_name)?,
            });
        }

        descriptors.push(BoundImportDescriptor {
            time_date_stamp,
            offset_module_name,
            module_name: read_name(offset_module_name)?,
            forwarders,
        });
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        directories::testing::{context, Fixture},
        file::{headers::Section, PeConfig},
    };

    #[test]
    fn bound_imports_in_header_region() {
        let mut fx = Fixture::new(0x400);
        fx.u32(0x2A0, 0x5000_0000)
            .u16(0x2A4, 0x20)
            .u16(0x2A6, 1)
            .u32(0x2A8, 0x5000_0001)
            .u16(0x2AC, 0x30)
            .u32(0x2B0, 0x5000_0002)
            .u16(0x2B4, 0x3C)
            .bytes(0x2C0, b"KERNEL32.dll\0")
            .bytes(0x2D0, b"NTDLL.DLL\0")
            .bytes(0x2DC, b"USER32.dll\0");
        let buffer = fx.buffer();
        let sections: Vec<Section> = Vec::new();
        let config = PeConfig::default();
        let mut ctx = context(&buffer, &sections, &config, true);
        ctx.size_of_headers = 0x400;

        let bound = parse(&ctx, 0x2A0).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].module_name, "KERNEL32.dll");
        assert_eq!(bound[0].forwarders.len(), 1);
        assert_eq!(bound[0].forwarders[0].module_name, "NTDLL.DLL");
        assert_eq!(bound[1].module_name, "USER32.dll");
        assert!(bound[1].forwarders.is_empty());

        let strict = PeConfig::strict();
        let mut ctx = context(&buffer, &sections, &strict, true);
        ctx.size_of_headers = 0x400;
        assert!(parse(&ctx, 0x2A0).unwrap_err().is_not_mapped());
    }
}
