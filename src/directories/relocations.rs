//! Base relocation blocks.
//!
//! The directory is a sequence of blocks, each covering one 4 KiB page: an 8-byte header
//! (`VirtualAddress`, `SizeOfBlock`) followed by 16-bit entries whose high nibble is the
//! relocation type and low 12 bits the offset inside the page.

use crate::{directories::DirectoryContext, Result};

const BLOCK_HEADER_SIZE: u32 = 8;

/// `IMAGE_REL_BASED_*` relocation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelocationType {
    /// Padding entry, skipped by the loader
    Absolute,
    /// High 16 bits of a 32-bit address
    High,
    /// Low 16 bits of a 32-bit address
    Low,
    /// Full 32-bit address
    HighLow,
    /// High 16 bits, adjusted by the following entry
    HighAdj,
    /// Machine specific (MIPS jump, ARM MOV32, RISC-V high 20)
    MachineSpecific5,
    /// Reserved
    Reserved,
    /// Machine specific (Thumb MOV32, RISC-V low 12I)
    MachineSpecific7,
    /// Machine specific (RISC-V low 12S, LoongArch)
    MachineSpecific8,
    /// Machine specific (MIPS16 jump)
    MachineSpecific9,
    /// Full 64-bit address
    Dir64,
    /// Any other type value
    Unknown(u8),
}

impl From<u8> for RelocationType {
    fn from(value: u8) -> Self {
        match value {
            0 => RelocationType::Absolute,
            1 => RelocationType::High,
            2 => RelocationType::Low,
            3 => RelocationType::HighLow,
            4 => RelocationType::HighAdj,
            5 => RelocationType::MachineSpecific5,
            6 => RelocationType::Reserved,
            7 => RelocationType::MachineSpecific7,
            8 => RelocationType::MachineSpecific8,
            9 => RelocationType::MachineSpecific9,
            10 => RelocationType::Dir64,
            other => RelocationType::Unknown(other),
        }
    }
}

/// One relocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationEntry {
    /// Relocation type from the high nibble
    pub kind: RelocationType,
    /// Offset inside the block's page
    pub offset: u16,
}

/// One page's worth of relocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationBlock {
    /// RVA of the page
    pub page_rva: u32,
    /// Size of the block including its header
    pub block_size: u32,
    /// Entries in table order, padding included
    pub entries: Vec<RelocationEntry>,
}

impl RelocationBlock {
    /// RVAs patched by this block, padding entries excluded.
    pub fn targets(&self) -> impl Iterator<Item = (RelocationType, u32)> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.kind != RelocationType::Absolute)
            .map(|entry| {
                (
                    entry.kind,
                    self.page_rva.wrapping_add(u32::from(entry.offset)),
                )
            })
    }
}

/// Decode all relocation blocks in the `size` bytes at `rva`.
///
/// # Errors
/// Returns an error if the directory cannot be read, a block declares a size smaller than
/// its header or past the directory, or there are more blocks than the configured limit.
pub fn parse(ctx: &DirectoryContext<'_>, rva: u32, size: u32) -> Result<Vec<RelocationBlock>> {
    let mut parser = ctx.parser_at_rva(rva)?;
    let mut blocks = Vec::new();
    let mut consumed = 0_u32;

    while size - consumed >= BLOCK_HEADER_SIZE {
        if blocks.len() >= ctx.config.max_relocation_blocks {
            return Err(malformed_error!(
                "Relocation directory exceeds {} blocks",
                ctx.config.max_relocation_blocks
            ));
        }

        let page_rva = parser.read_le::<u32>()?;
        let block_size = parser.read_le::<u32>()?;
        if page_rva == 0 && block_size == 0 {
            break;
        }

        if block_size < BLOCK_HEADER_SIZE || block_size > size - consumed {
            return Err(malformed_error!(
                "Relocation block at page 0x{:X} has invalid size {}",
                page_rva,
                block_size
            ));
        }

        let count = (block_size - BLOCK_HEADER_SIZE) / 2;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = parser.read_le::<u16>()?;
            entries.push(RelocationEntry {
                kind: RelocationType::from((raw >> 12) as u8),
                offset: raw & 0x0FFF,
            });
        }

        // Odd block sizes leave a trailing byte
        parser.advance_by(((block_size - BLOCK_HEADER_SIZE) % 2) as usize)?;
        consumed += block_size;
        blocks.push(RelocationBlock {
            page_rva,
            block_size,
            entries,
        });
    }

    Ok(blocks)
}
