//! Section and image characteristic flags.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `IMAGE_SCN_*` flags stored in the `Characteristics` field of a section header
    pub struct SectionCharacteristics: u32 {
        /// Section should not be padded to the next boundary (obsolete)
        const TYPE_NO_PAD = 0x0000_0008;
        /// Section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// Section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// Section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// Section contains comments or other information (object files only)
        const LNK_INFO = 0x0000_0200;
        /// Section will not become part of the image (object files only)
        const LNK_REMOVE = 0x0000_0800;
        /// Section contains COMDAT data (object files only)
        const LNK_COMDAT = 0x0000_1000;
        /// Section contains data referenced through the global pointer
        const GPREL = 0x0000_8000;
        /// Section contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// Section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// Section cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// Section is not pageable
        const MEM_NOT_PAGED = 0x0800_0000;
        /// Section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// Section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// Section can be read
        const MEM_READ = 0x4000_0000;
        /// Section can be written to
        const MEM_WRITE = 0x8000_0000;
    }
}

/// Mask of the 4-bit `IMAGE_SCN_ALIGN_*` field inside the section characteristics
pub const SECTION_ALIGN_MASK: u32 = 0x00F0_0000;

impl SectionCharacteristics {
    /// Characteristics of a plain read-write data section
    pub const DATA_RW: SectionCharacteristics = SectionCharacteristics::CNT_INITIALIZED_DATA
        .union(SectionCharacteristics::MEM_READ)
        .union(SectionCharacteristics::MEM_WRITE);

    /// Characteristics of an executable code section
    pub const CODE_RX: SectionCharacteristics = SectionCharacteristics::CNT_CODE
        .union(SectionCharacteristics::MEM_EXECUTE)
        .union(SectionCharacteristics::MEM_READ);

    /// Extract the alignment encoded in the `IMAGE_SCN_ALIGN_*` bits, in bytes.
    ///
    /// Returns `None` when no alignment is encoded (image files normally leave it unset).
    #[must_use]
    pub fn alignment(raw: u32) -> Option<u32> {
        let nibble = (raw & SECTION_ALIGN_MASK) >> 20;
        if nibble == 0 || nibble > 14 {
            None
        } else {
            Some(1 << (nibble - 1))
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `IMAGE_FILE_*` flags stored in the COFF file header
    pub struct FileCharacteristics: u16 {
        /// Relocation information was stripped
        const RELOCS_STRIPPED = 0x0001;
        /// The file is executable
        const EXECUTABLE_IMAGE = 0x0002;
        /// The application can handle addresses above 2 GB
        const LARGE_ADDRESS_AWARE = 0x0020;
        /// The machine is based on a 32-bit word architecture
        const MACHINE_32BIT = 0x0100;
        /// Debugging information was removed
        const DEBUG_STRIPPED = 0x0200;
        /// The image is a system file
        const SYSTEM = 0x1000;
        /// The image is a dynamic-link library
        const DLL = 0x2000;
    }
}
