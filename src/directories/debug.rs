//! Debug directory and CodeView records.

use crate::{directories::DirectoryContext, file::parser::Parser, Result};

/// Size of one `IMAGE_DEBUG_DIRECTORY` entry
pub const DEBUG_DIRECTORY_SIZE: usize = 28;
/// `RSDS`, the PDB 7.0 CodeView signature
pub const CODEVIEW_PDB70_SIGNATURE: u32 = 0x5344_5352;

/// `IMAGE_DEBUG_TYPE_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugType {
    /// Unknown
    Unknown,
    /// COFF debug information
    Coff,
    /// CodeView record (PDB path)
    CodeView,
    /// Frame pointer omission information
    Fpo,
    /// Location of a DBG file
    Misc,
    /// Copy of the exception table
    Exception,
    /// Reserved
    Fixup,
    /// Mapping from image RVAs to source RVAs
    OmapToSrc,
    /// Mapping from source RVAs to image RVAs
    OmapFromSrc,
    /// Borland
    Borland,
    /// Reserved
    Reserved10,
    /// Reserved
    Clsid,
    /// Visual C++ feature counts
    VcFeature,
    /// Profile guided optimisation data
    Pogo,
    /// Incremental link-time code generation
    Iltcg,
    /// Intel MPX
    Mpx,
    /// Deterministic build marker
    Repro,
    /// Extended DLL characteristics
    ExDllCharacteristics,
    /// Any other value
    Other(u32),
}

impl From<u32> for DebugType {
    fn from(value: u32) -> Self {
        match value {
            0 => DebugType::Unknown,
            1 => DebugType::Coff,
            2 => DebugType::CodeView,
            3 => DebugType::Fpo,
            4 => DebugType::Misc,
            5 => DebugType::Exception,
            6 => DebugType::Fixup,
            7 => DebugType::OmapToSrc,
            8 => DebugType::OmapFromSrc,
            9 => DebugType::Borland,
            10 => DebugType::Reserved10,
            11 => DebugType::Clsid,
            12 => DebugType::VcFeature,
            13 => DebugType::Pogo,
            14 => DebugType::Iltcg,
            15 => DebugType::Mpx,
            16 => DebugType::Repro,
            20 => DebugType::ExDllCharacteristics,
            other => DebugType::Other(other),
        }
    }
}

/// Decoded PDB 7.0 CodeView record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeViewPdb70 {
    /// PDB signature GUID
    pub guid: uguid::Guid,
    /// PDB age
    pub age: u32,
    /// Path of the PDB as seen by the linker
    pub path: String,
}

/// One `IMAGE_DEBUG_DIRECTORY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugDirectoryEntry {
    /// Reserved, zero
    pub characteristics: u32,
    /// Creation timestamp
    pub time_date_stamp: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Kind of debug data
    pub debug_type: DebugType,
    /// Size of the debug data
    pub size_of_data: u32,
    /// RVA of the debug data, zero if not mapped
    pub address_of_raw_data: u32,
    /// File offset of the debug data
    pub pointer_to_raw_data: u32,
    /// Decoded record, for PDB 7.0 CodeView entries
    pub codeview: Option<CodeViewPdb70>,
}

/// Decode the debug directory entries in the `size` bytes at `rva`.
///
/// A CodeView payload that cannot be decoded leaves `codeview` empty instead of failing
/// the directory.
///
/// # Errors
/// Returns an error if the entries cannot be read or exceed the configured limit.
pub fn parse(ctx: &DirectoryContext<'_>, rva: u32, size: u32) -> Result<Vec<DebugDirectoryEntry>> {
    let count = size as usize / DEBUG_DIRECTORY_SIZE;
    if count > ctx.config.max_debug_entries {
        return Err(malformed_error!(
            "Debug directory holds {} entries, limit is {}",
            count,
            ctx.config.max_debug_entries
        ));
    }

    let mut parser = ctx.parser_at_rva(rva)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let debug_type = DebugType::from(parser.read_le::<u32>()?);
        let size_of_data = parser.read_le::<u32>()?;
        let address_of_raw_data = parser.read_le::<u32>()?;
        let pointer_to_raw_data = parser.read_le::<u32>()?;

        let codeview = if debug_type == DebugType::CodeView {
            let payload = ctx
                .buffer
                .read_bytes(pointer_to_raw_data as usize, size_of_data as usize);
            match payload.and_then(|data| parse_codeview(data, ctx.config.max_string_length)) {
                Ok(record) => record,
                Err(error) => {
                    log::debug!("Skipping undecodable CodeView record: {}", error);
                    None
                }
            }
        } else {
            None
        };

        entries.push(DebugDirectoryEntry {
            characteristics,
            time_date_stamp,
            major_version,
            minor_version,
            debug_type,
            size_of_data,
            address_of_raw_data,
            pointer_to_raw_data,
            codeview,
        });
    }

    Ok(entries)
}

/// Decode a CodeView payload; `None` for formats other than PDB 7.0.
///
/// # Errors
/// Returns an error if an `RSDS` record is truncated or its path is not valid UTF-8.
pub fn parse_codeview(data: &[u8], max_path: usize) -> Result<Option<CodeViewPdb70>> {
    let mut parser = Parser::new(data);
    if parser.read_le::<u32>()? != CODEVIEW_PDB70_SIGNATURE {
        return Ok(None);
    }

    let mut guid = [0u8; 16];
    guid.copy_from_slice(parser.read_bytes(16)?);
    let age = parser.read_le::<u32>()?;
    let path = parser.read_string_utf8_bounded(max_path)?;

    Ok(Some(CodeViewPdb70 {
        guid: uguid::Guid::from_bytes(guid),
        age,
        path,
    }))
}
