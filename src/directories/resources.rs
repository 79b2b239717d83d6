//! Resource directory tables.
//!
//! Only the table layout is decoded: a directory header followed by named and ID entries.
//! Every offset inside the resource tree is relative to the start of the root directory,
//! so callers that want to descend pass the root RVA back in.

use widestring::U16Str;

use crate::{directories::DirectoryContext, Result};

const HIGH_BIT: u32 = 0x8000_0000;

/// Identifier of a resource directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    /// Numeric ID (resource type, ID or language)
    Id(u32),
    /// UTF-16 name stored inside the resource section
    Name(String),
}

/// One entry of a resource directory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Name or ID
    pub name: ResourceName,
    /// `true` if the entry points at another directory table
    pub is_directory: bool,
    /// Offset of the target relative to the root directory, high bit cleared
    pub offset: u32,
}

/// `IMAGE_RESOURCE_DATA_ENTRY`, the leaf of the resource tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDataEntry {
    /// RVA of the resource bytes
    pub data_rva: u32,
    /// Size of the resource bytes
    pub size: u32,
    /// Code page used to decode the bytes
    pub code_page: u32,
}

/// One decoded `IMAGE_RESOURCE_DIRECTORY` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDirectory {
    /// Reserved, zero
    pub characteristics: u32,
    /// Creation timestamp
    pub time_date_stamp: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Count of named entries, which come first
    pub number_of_named_entries: u16,
    /// Count of ID entries
    pub number_of_id_entries: u16,
    /// Named entries followed by ID entries
    pub entries: Vec<ResourceEntry>,
}

impl ResourceDirectory {
    /// Decode the root table of the resource tree at `root_rva`.
    ///
    /// # Errors
    /// Returns an error if the table cannot be read or declares more entries than the
    /// configured limit.
    pub fn parse(ctx: &DirectoryContext<'_>, root_rva: u32) -> Result<ResourceDirectory> {
        Self::parse_at(ctx, root_rva, 0)
    }

    /// Decode the table at `relative` bytes from the root.
    ///
    /// # Errors
    /// Returns an error if the table cannot be read or declares more entries than the
    /// configured limit.
    pub fn parse_at(
        ctx: &DirectoryContext<'_>,
        root_rva: u32,
        relative: u32,
    ) -> Result<ResourceDirectory> {
        let root = ctx.rva_to_offset(root_rva)?;
        let mut parser = ctx.parser_at_rva(root_rva.wrapping_add(relative))?;

        let characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let number_of_named_entries = parser.read_le::<u16>()?;
        let number_of_id_entries = parser.read_le::<u16>()?;

        let total = usize::from(number_of_named_entries) + usize::from(number_of_id_entries);
        if total > ctx.config.max_resource_entries {
            return Err(malformed_error!(
                "Resource directory declares {} entries, limit is {}",
                total,
                ctx.config.max_resource_entries
            ));
        }

        let mut entries = Vec::with_capacity(total);
        for _ in 0..total {
            let name = parser.read_le::<u32>()?;
            let target = parser.read_le::<u32>()?;

            let name = if name & HIGH_BIT != 0 {
                ResourceName::Name(read_name(ctx, root + (name & !HIGH_BIT) as usize)?)
            } else {
                ResourceName::Id(name)
            };

            entries.push(ResourceEntry {
                name,
                is_directory: target & HIGH_BIT != 0,
                offset: target & !HIGH_BIT,
            });
        }

        Ok(ResourceDirectory {
            characteristics,
            time_date_stamp,
            major_version,
            minor_version,
            number_of_named_entries,
            number_of_id_entries,
            entries,
        })
    }
}

impl ResourceEntry {
    /// Decode the next table down, for entries that point at a directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is a leaf, or any error from
    /// [`ResourceDirectory::parse_at`].
    pub fn subdirectory(
        &self,
        ctx: &DirectoryContext<'_>,
        root_rva: u32,
    ) -> Result<ResourceDirectory> {
        if !self.is_directory {
            return Err(malformed_error!("Resource entry is not a directory"));
        }
        ResourceDirectory::parse_at(ctx, root_rva, self.offset)
    }

    /// Decode the data entry, for leaf entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is a directory, or a read error.
    pub fn data_entry(
        &self,
        ctx: &DirectoryContext<'_>,
        root_rva: u32,
    ) -> Result<ResourceDataEntry> {
        if self.is_directory {
            return Err(malformed_error!("Resource entry is a directory"));
        }

        let mut parser = ctx.parser_at_rva(root_rva.wrapping_add(self.offset))?;
        Ok(ResourceDataEntry {
            data_rva: parser.read_le::<u32>()?,
            size: parser.read_le::<u32>()?,
            code_page: parser.read_le::<u32>()?,
        })
    }
}

fn read_name(ctx: &DirectoryContext<'_>, offset: usize) -> Result<String> {
    let length = usize::from(ctx.buffer.read::<u16>(offset)?);
    if length > ctx.config.max_string_length {
        return Err(malformed_error!(
            "Resource name of {} characters exceeds the limit",
            length
        ));
    }

    let bytes = ctx.buffer.read_bytes(offset + 2, length * 2)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok(U16Str::from_slice(&units).to_string_lossy())
}
