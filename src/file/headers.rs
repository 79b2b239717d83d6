//! DOS, NT and section headers as live handles over a [`crate::file::RawBuffer`].
//!
//! Every header type in this module is a small `Copy` handle that only remembers where the
//! structure starts. Getters decode the current buffer bytes and setters encode and write
//! through immediately, so there is never a detached copy that could go stale after an
//! edit. [`Headers::parse`] validates the fixed header chain once and hands out the handles.
//!
//! The one exception is [`Section`], a decoded snapshot of a section header. The facade
//! memoises the section table per buffer generation, which is cheaper than decoding ten
//! fields on every address translation.
//!
//! # Layout
//!
//! ```text
//! 0x00            DOS header (64 bytes, e_lfanew at 0x3C)
//! e_lfanew        "PE\0\0"
//! e_lfanew + 4    COFF file header (20 bytes)
//! e_lfanew + 24   optional header (SizeOfOptionalHeader bytes, data directories at the end)
//! ...             section table (NumberOfSections x 40 bytes)
//! ```

use strum::{EnumCount, EnumIter};

use crate::{
    file::{characteristics::SectionCharacteristics, RawBuffer},
    Result,
};

/// `MZ`
pub const DOS_MAGIC: u16 = 0x5A4D;
/// `PE\0\0`
pub const PE_SIGNATURE: u32 = 0x0000_4550;
/// Optional header magic of 32-bit images
pub const PE32_MAGIC: u16 = 0x10B;
/// Optional header magic of 64-bit images
pub const PE32_PLUS_MAGIC: u16 = 0x20B;
/// Size of the DOS header
pub const DOS_HEADER_SIZE: usize = 64;
/// Size of the COFF file header
pub const FILE_HEADER_SIZE: usize = 20;
/// Size of one section table entry
pub const SECTION_HEADER_SIZE: usize = 40;
/// Size of one data directory entry
pub const DATA_DIRECTORY_SIZE: usize = 8;
/// Number of data directory slots defined for PE images
pub const MAX_DATA_DIRECTORIES: usize = 16;

const E_LFANEW: usize = 0x3C;
const PE32_DIRECTORIES: usize = 96;
const PE32_PLUS_DIRECTORIES: usize = 112;

/// The 16 data directory slots of the optional header, in table order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, EnumCount)]
pub enum DataDirectoryType {
    /// Export table
    Export = 0,
    /// Import table
    Import = 1,
    /// Resource table
    Resource = 2,
    /// Exception table (`.pdata`)
    Exception = 3,
    /// Attribute certificate table; its address is a file offset, not an RVA
    Security = 4,
    /// Base relocation table
    BaseRelocation = 5,
    /// Debug directory
    Debug = 6,
    /// Architecture specific data, reserved
    Architecture = 7,
    /// Global pointer register value
    GlobalPtr = 8,
    /// Thread local storage table
    Tls = 9,
    /// Load configuration table
    LoadConfig = 10,
    /// Bound import table
    BoundImport = 11,
    /// Import address table
    Iat = 12,
    /// Delay import descriptors
    DelayImport = 13,
    /// CLR runtime header
    ClrRuntimeHeader = 14,
    /// Reserved, must be zero
    Reserved = 15,
}

impl DataDirectoryType {
    /// Slot index inside the data directory array.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Handle to the DOS header at offset 0.
#[derive(Debug, Clone, Copy)]
pub struct DosHeader {
    offset: usize,
}

impl DosHeader {
    header_getter!(
        /// `e_magic`, `MZ` for valid images
        e_magic, u16, 0
    );
    header_field!(
        /// `e_lfanew`, file offset of the NT headers
        e_lfanew, set_e_lfanew, u32, E_LFANEW
    );
}

/// Handle to the COFF file header.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    offset: usize,
}

impl FileHeader {
    header_getter!(
        /// Target machine (`IMAGE_FILE_MACHINE_*`)
        machine, u16, 0
    );
    header_field!(
        /// Number of entries in the section table
        number_of_sections, set_number_of_sections, u16, 2
    );
    header_field!(
        /// Link timestamp
        time_date_stamp, set_time_date_stamp, u32, 4
    );
    header_getter!(
        /// Offset of the COFF symbol table, zero for images
        pointer_to_symbol_table, u32, 8
    );
    header_getter!(
        /// Number of COFF symbols
        number_of_symbols, u32, 12
    );
    header_getter!(
        /// Size of the optional header that follows
        size_of_optional_header, u16, 16
    );
    header_field!(
        /// `IMAGE_FILE_*` characteristics
        characteristics, set_characteristics, u16, 18
    );

    /// File offset of this header.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Handle to the optional header, aware of the PE32 / PE32+ layout difference.
#[derive(Debug, Clone, Copy)]
pub struct OptionalHeader {
    offset: usize,
    is_64: bool,
    size: usize,
}

impl OptionalHeader {
    header_getter!(
        /// `0x10B` for PE32, `0x20B` for PE32+
        magic, u16, 0
    );
    header_getter!(
        /// Linker major version
        major_linker_version, u8, 2
    );
    header_getter!(
        /// Linker minor version
        minor_linker_version, u8, 3
    );
    header_field!(
        /// Combined size of all code sections
        size_of_code, set_size_of_code, u32, 4
    );
    header_field!(
        /// Combined size of all initialized data sections
        size_of_initialized_data, set_size_of_initialized_data, u32, 8
    );
    header_field!(
        /// Combined size of all uninitialized data sections
        size_of_uninitialized_data, set_size_of_uninitialized_data, u32, 12
    );
    header_field!(
        /// RVA of the entry point, zero if there is none
        address_of_entry_point, set_address_of_entry_point, u32, 16
    );
    header_getter!(
        /// RVA of the start of the code section
        base_of_code, u32, 20
    );
    header_getter!(
        /// Virtual alignment of sections
        section_alignment, u32, 32
    );
    header_getter!(
        /// Raw data alignment of sections
        file_alignment, u32, 36
    );
    header_getter!(
        /// Required OS major version
        major_operating_system_version, u16, 40
    );
    header_getter!(
        /// Required OS minor version
        minor_operating_system_version, u16, 42
    );
    header_getter!(
        /// Image major version
        major_image_version, u16, 44
    );
    header_getter!(
        /// Image minor version
        minor_image_version, u16, 46
    );
    header_getter!(
        /// Subsystem major version
        major_subsystem_version, u16, 48
    );
    header_getter!(
        /// Subsystem minor version
        minor_subsystem_version, u16, 50
    );
    header_getter!(
        /// Reserved, must be zero
        win32_version_value, u32, 52
    );
    header_field!(
        /// Size of the image in memory, a multiple of the section alignment
        size_of_image, set_size_of_image, u32, 56
    );
    header_getter!(
        /// Combined size of all headers rounded up to the file alignment
        size_of_headers, u32, 60
    );
    header_field!(
        /// Image checksum
        checksum, set_checksum, u32, 64
    );
    header_getter!(
        /// Subsystem required to run the image
        subsystem, u16, 68
    );
    header_field!(
        /// `IMAGE_DLLCHARACTERISTICS_*` flags
        dll_characteristics, set_dll_characteristics, u16, 70
    );

    /// Returns `true` for PE32+ images.
    #[must_use]
    pub fn is_64(&self) -> bool {
        self.is_64
    }

    /// File offset of this header.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared size of the optional header.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// RVA of the start of the data section; only present in PE32 images.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn base_of_data(&self, buffer: &RawBuffer) -> Result<Option<u32>> {
        if self.is_64 {
            return Ok(None);
        }
        Ok(Some(buffer.read::<u32>(self.offset + 24)?))
    }

    /// Preferred load address.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn image_base(&self, buffer: &RawBuffer) -> Result<u64> {
        if self.is_64 {
            buffer.read::<u64>(self.offset + 24)
        } else {
            Ok(u64::from(buffer.read::<u32>(self.offset + 28)?))
        }
    }

    fn pointer_field(&self, buffer: &RawBuffer, pe32: usize, pe32_plus: usize) -> Result<u64> {
        if self.is_64 {
            buffer.read::<u64>(self.offset + pe32_plus)
        } else {
            Ok(u64::from(buffer.read::<u32>(self.offset + pe32)?))
        }
    }

    /// Stack reserve size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn size_of_stack_reserve(&self, buffer: &RawBuffer) -> Result<u64> {
        self.pointer_field(buffer, 72, 72)
    }

    /// Stack commit size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn size_of_stack_commit(&self, buffer: &RawBuffer) -> Result<u64> {
        self.pointer_field(buffer, 76, 80)
    }

    /// Heap reserve size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn size_of_heap_reserve(&self, buffer: &RawBuffer) -> Result<u64> {
        self.pointer_field(buffer, 80, 88)
    }

    /// Heap commit size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn size_of_heap_commit(&self, buffer: &RawBuffer) -> Result<u64> {
        self.pointer_field(buffer, 84, 96)
    }

    /// Reserved loader flags.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn loader_flags(&self, buffer: &RawBuffer) -> Result<u32> {
        buffer.read::<u32>(self.offset + if self.is_64 { 104 } else { 88 })
    }

    /// Declared number of data directory slots, as stored.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
    pub fn number_of_rva_and_sizes(&self, buffer: &RawBuffer) -> Result<u32> {
        buffer.read::<u32>(self.offset + if self.is_64 { 108 } else { 92 })
    }

    fn directories_offset(&self) -> usize {
        self.offset
            + if self.is_64 {
                PE32_PLUS_DIRECTORIES
            } else {
                PE32_DIRECTORIES
            }
    }

    /// Number of data directory slots that are both declared and physically present.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the count field lies outside the buffer.
    pub fn directory_count(&self, buffer: &RawBuffer) -> Result<usize> {
        let declared = self.number_of_rva_and_sizes(buffer)? as usize;
        let room = self.size.saturating_sub(self.directories_offset() - self.offset)
            / DATA_DIRECTORY_SIZE;
        Ok(declared.min(room).min(MAX_DATA_DIRECTORIES))
    }

    /// Handle to a data directory slot, `None` if the image does not declare it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the count field lies outside the buffer.
    pub fn data_directory(
        &self,
        buffer: &RawBuffer,
        kind: DataDirectoryType,
    ) -> Result<Option<DataDirectory>> {
        if kind.index() >= self.directory_count(buffer)? {
            return Ok(None);
        }

        Ok(Some(DataDirectory {
            offset: self.directories_offset() + kind.index() * DATA_DIRECTORY_SIZE,
            kind,
        }))
    }
}

/// Handle to one `(VirtualAddress, Size)` slot of the data directory array.
#[derive(Debug, Clone, Copy)]
pub struct DataDirectory {
    offset: usize,
    kind: DataDirectoryType,
}

impl DataDirectory {
    header_field!(
        /// RVA of the directory; a file offset for [`DataDirectoryType::Security`]
        virtual_address, set_virtual_address, u32, 0
    );
    header_field!(
        /// Size of the directory in bytes
        size, set_size, u32, 4
    );

    /// Which slot this handle points at.
    #[must_use]
    pub fn kind(&self) -> DataDirectoryType {
        self.kind
    }

    /// Returns `true` if both address and size are zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the slot lies outside the buffer.
    pub fn is_absent(&self, buffer: &RawBuffer) -> Result<bool> {
        Ok(self.virtual_address(buffer)? == 0 && self.size(buffer)? == 0)
    }

    /// Zero both fields.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the slot lies outside the buffer.
    pub fn clear(&self, buffer: &mut RawBuffer) -> Result<()> {
        buffer.fill(self.offset, DATA_DIRECTORY_SIZE, 0)
    }
}

/// Handle to one 40-byte section table entry.
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    offset: usize,
}

impl SectionHeader {
    header_field!(
        /// Size of the section once loaded
        virtual_size, set_virtual_size, u32, 8
    );
    header_field!(
        /// RVA of the first byte of the section
        virtual_address, set_virtual_address, u32, 12
    );
    header_field!(
        /// Size of the initialized data on disk
        size_of_raw_data, set_size_of_raw_data, u32, 16
    );
    header_field!(
        /// File offset of the section's raw data
        pointer_to_raw_data, set_pointer_to_raw_data, u32, 20
    );
    header_field!(
        /// `IMAGE_SCN_*` characteristics
        characteristics, set_characteristics, u32, 36
    );

    /// Handle for the entry starting at `offset`.
    #[must_use]
    pub fn at(offset: usize) -> SectionHeader {
        SectionHeader { offset }
    }

    /// File offset of this entry.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decode the entry into a [`Section`] snapshot.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry lies outside the buffer.
    pub fn read(&self, buffer: &RawBuffer, index: usize) -> Result<Section> {
        Section::parse(
            buffer.read_bytes(self.offset, SECTION_HEADER_SIZE)?,
            index,
            self.offset,
        )
    }

    /// Encode `section` into this entry. The snapshot's own offset and index are ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry lies outside the buffer.
    pub fn write(&self, buffer: &mut RawBuffer, section: &Section) -> Result<()> {
        buffer.write_bytes(self.offset, &section.to_bytes())
    }
}

/// Decoded snapshot of a section table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Position in the section table
    pub index: usize,
    /// File offset of the 40-byte header this snapshot was decoded from
    pub header_offset: usize,
    /// Raw name, NUL padded, not necessarily NUL terminated
    pub name: [u8; 8],
    /// `VirtualSize`
    pub virtual_size: u32,
    /// `VirtualAddress`
    pub virtual_address: u32,
    /// `SizeOfRawData`
    pub size_of_raw_data: u32,
    /// `PointerToRawData`
    pub pointer_to_raw_data: u32,
    /// `PointerToRelocations`, zero in images
    pub pointer_to_relocations: u32,
    /// `PointerToLinenumbers`, zero in images
    pub pointer_to_linenumbers: u32,
    /// `NumberOfRelocations`
    pub number_of_relocations: u16,
    /// `NumberOfLinenumbers`
    pub number_of_linenumbers: u16,
    /// `Characteristics`
    pub characteristics: u32,
}

impl Section {
    /// Decode a section from the 40 bytes of its table entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 40 bytes.
    pub fn parse(data: &[u8], index: usize, header_offset: usize) -> Result<Section> {
        let mut parser = crate::Parser::new(data);
        let mut name = [0u8; 8];
        name.copy_from_slice(parser.read_bytes(8)?);

        Ok(Section {
            index,
            header_offset,
            name,
            virtual_size: parser.read_le::<u32>()?,
            virtual_address: parser.read_le::<u32>()?,
            size_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
            pointer_to_relocations: parser.read_le::<u32>()?,
            pointer_to_linenumbers: parser.read_le::<u32>()?,
            number_of_relocations: parser.read_le::<u16>()?,
            number_of_linenumbers: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u32>()?,
        })
    }

    /// Encode the snapshot as a 40-byte section table entry.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SECTION_HEADER_SIZE] {
        let mut bytes = [0u8; SECTION_HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.name);
        bytes[8..12].copy_from_slice(&self.virtual_size.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.virtual_address.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.size_of_raw_data.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.pointer_to_raw_data.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.pointer_to_relocations.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.pointer_to_linenumbers.to_le_bytes());
        bytes[32..34].copy_from_slice(&self.number_of_relocations.to_le_bytes());
        bytes[34..36].copy_from_slice(&self.number_of_linenumbers.to_le_bytes());
        bytes[36..40].copy_from_slice(&self.characteristics.to_le_bytes());
        bytes
    }

    /// Name with trailing NUL padding removed; invalid UTF-8 is replaced.
    #[must_use]
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Encode a section name into the padded 8-byte form.
    ///
    /// # Errors
    /// Returns [`crate::Error::Precondition`] if `name` is empty or longer than 8 bytes.
    pub fn encode_name(name: &str) -> Result<[u8; 8]> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > 8 {
            return Err(precondition_error!(
                "Section name '{}' must be between 1 and 8 bytes",
                name
            ));
        }

        let mut encoded = [0u8; 8];
        encoded[..bytes.len()].copy_from_slice(bytes);
        Ok(encoded)
    }

    /// Characteristics as typed flags; unknown bits are kept.
    #[must_use]
    pub fn flags(&self) -> SectionCharacteristics {
        SectionCharacteristics::from_bits_retain(self.characteristics)
    }

    /// Size of the section's virtual range: the larger of `VirtualSize` and `SizeOfRawData`.
    ///
    /// Linkers may leave `VirtualSize` at zero, in which case the raw size is what the
    /// loader maps.
    #[must_use]
    pub fn virtual_span(&self) -> u32 {
        self.virtual_size.max(self.size_of_raw_data)
    }

    /// First RVA past the section's virtual range.
    #[must_use]
    pub fn virtual_extent(&self) -> u64 {
        u64::from(self.virtual_address) + u64::from(self.virtual_span())
    }

    /// Returns `true` if `rva` falls inside the section's virtual range.
    #[must_use]
    pub fn contains_rva(&self, rva: u64) -> bool {
        rva >= u64::from(self.virtual_address) && rva < self.virtual_extent()
    }

    /// Returns `true` if `offset` falls inside the section's raw data.
    #[must_use]
    pub fn contains_offset(&self, offset: usize) -> bool {
        let start = self.pointer_to_raw_data as usize;
        let end = start + self.size_of_raw_data as usize;
        offset >= start && offset < end
    }

    /// Handle to the table entry this snapshot was decoded from.
    #[must_use]
    pub fn header(&self) -> SectionHeader {
        SectionHeader::at(self.header_offset)
    }
}

/// The validated header chain of an image.
#[derive(Debug, Clone, Copy)]
pub struct Headers {
    /// DOS header
    pub dos: DosHeader,
    /// COFF file header
    pub file: FileHeader,
    /// Optional header
    pub optional: OptionalHeader,
    section_table: usize,
}

impl Headers {
    /// Validate and locate the DOS, NT and optional headers.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad magic or signature, an `e_lfanew` that
    /// points outside the buffer, an unknown optional header magic, an optional header too
    /// small for its fixed fields, or a section table that does not fit in the buffer.
    pub fn parse(buffer: &RawBuffer) -> Result<Headers> {
        if buffer.len() < DOS_HEADER_SIZE {
            return Err(malformed_error!(
                "Input of {} bytes is too small for a DOS header",
                buffer.len()
            ));
        }

        let dos = DosHeader { offset: 0 };
        if dos.e_magic(buffer)? != DOS_MAGIC {
            return Err(malformed_error!("Invalid DOS header magic"));
        }

        let nt_offset = dos.e_lfanew(buffer)? as usize;
        let Some(nt_end) = nt_offset.checked_add(4 + FILE_HEADER_SIZE) else {
            return Err(malformed_error!("e_lfanew 0x{:X} overflows", nt_offset));
        };
        if nt_end > buffer.len() {
            return Err(malformed_error!(
                "e_lfanew 0x{:X} points outside of the {} byte input",
                nt_offset,
                buffer.len()
            ));
        }

        if buffer.read::<u32>(nt_offset)? != PE_SIGNATURE {
            return Err(malformed_error!(
                "Invalid PE signature at offset 0x{:X}",
                nt_offset
            ));
        }

        let file = FileHeader {
            offset: nt_offset + 4,
        };
        let optional_offset = file.offset + FILE_HEADER_SIZE;
        let optional_size = usize::from(file.size_of_optional_header(buffer)?);

        let magic = buffer
            .read::<u16>(optional_offset)
            .map_err(|_| malformed_error!("Optional header is truncated"))?;
        let (is_64, minimum) = match magic {
            PE32_MAGIC => (false, PE32_DIRECTORIES),
            PE32_PLUS_MAGIC => (true, PE32_PLUS_DIRECTORIES),
            _ => {
                return Err(malformed_error!(
                    "Unknown optional header magic 0x{:X}",
                    magic
                ))
            }
        };

        if optional_size < minimum {
            return Err(malformed_error!(
                "SizeOfOptionalHeader {} is smaller than the {} bytes of fixed fields",
                optional_size,
                minimum
            ));
        }
        if optional_offset + optional_size > buffer.len() {
            return Err(malformed_error!("Optional header is truncated"));
        }

        let optional = OptionalHeader {
            offset: optional_offset,
            is_64,
            size: optional_size,
        };
        let headers = Headers {
            dos,
            file,
            optional,
            section_table: optional_offset + optional_size,
        };

        let table_end = headers.section_table_end(buffer)?;
        if table_end > buffer.len() {
            return Err(malformed_error!(
                "Section table ends at 0x{:X}, past the end of the input",
                table_end
            ));
        }

        Ok(headers)
    }

    /// File offset of the first section table entry.
    #[must_use]
    pub fn section_table_offset(&self) -> usize {
        self.section_table
    }

    /// File offset just past the last section table entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the section count lies outside the buffer.
    pub fn section_table_end(&self, buffer: &RawBuffer) -> Result<usize> {
        let count = usize::from(self.file.number_of_sections(buffer)?);
        Ok(self.section_table + count * SECTION_HEADER_SIZE)
    }

    /// Handle to section table entry `index`, which need not exist yet.
    #[must_use]
    pub fn section_header(&self, index: usize) -> SectionHeader {
        SectionHeader::at(self.section_table + index * SECTION_HEADER_SIZE)
    }

    /// Decode the full section table.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if an entry lies outside the buffer.
    pub fn read_sections(&self, buffer: &RawBuffer) -> Result<Vec<Section>> {
        let count = usize::from(self.file.number_of_sections(buffer)?);
        (0..count)
            .map(|index| self.section_header(index).read(buffer, index))
            .collect()
    }

    /// Returns `true` for PE32+ images.
    #[must_use]
    pub fn is_64(&self) -> bool {
        self.optional.is_64
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{test::TestImage, Error};

    #[test]
    fn parse_pe32_plus() {
        let buffer = RawBuffer::new(TestImage::pe64().build());
        let headers = Headers::parse(&buffer).unwrap();

        assert!(headers.is_64());
        assert_eq!(headers.dos.e_lfanew(&buffer).unwrap(), 0x80);
        assert_eq!(headers.file.machine(&buffer).unwrap(), 0x8664);
        assert_eq!(headers.file.number_of_sections(&buffer).unwrap(), 4);
        assert_eq!(headers.optional.magic(&buffer).unwrap(), PE32_PLUS_MAGIC);
        assert_eq!(
            headers.optional.image_base(&buffer).unwrap(),
            0x1_4000_0000
        );
        assert_eq!(headers.optional.base_of_data(&buffer).unwrap(), None);
        assert_eq!(headers.optional.section_alignment(&buffer).unwrap(), 0x1000);
        assert_eq!(headers.optional.file_alignment(&buffer).unwrap(), 0x200);
        assert_eq!(headers.optional.directory_count(&buffer).unwrap(), 16);
        assert_eq!(headers.section_table_offset(), 0x80 + 24 + 240);

        let sections = headers.read_sections(&buffer).unwrap();
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].name_str(), ".text");
        assert_eq!(sections[1].virtual_address, 0x2000);
        assert_eq!(sections[3].index, 3);
    }

    #[test]
    fn parse_pe32() {
        let buffer = RawBuffer::new(TestImage::pe32().build());
        let headers = Headers::parse(&buffer).unwrap();

        assert!(!headers.is_64());
        assert_eq!(headers.optional.image_base(&buffer).unwrap(), 0x40_0000);
        assert!(headers.optional.base_of_data(&buffer).unwrap().is_some());
        assert_eq!(headers.section_table_offset(), 0x80 + 24 + 224);
        assert_eq!(headers.optional.size_of_stack_reserve(&buffer).unwrap(), 0x10_0000);
    }

    #[test]
    fn writes_go_through() {
        let mut buffer = RawBuffer::new(TestImage::pe64().build());
        let headers = Headers::parse(&buffer).unwrap();

        headers.optional.set_size_of_image(&mut buffer, 0x9000).unwrap();
        assert_eq!(headers.optional.size_of_image(&buffer).unwrap(), 0x9000);

        let header = headers.section_header(1);
        header.set_virtual_size(&mut buffer, 0x123).unwrap();
        assert_eq!(header.read(&buffer, 1).unwrap().virtual_size, 0x123);

        let import = headers
            .optional
            .data_directory(&buffer, DataDirectoryType::Import)
            .unwrap()
            .unwrap();
        import.clear(&mut buffer).unwrap();
        assert!(import.is_absent(&buffer).unwrap());
    }

    #[test]
    fn directory_count_is_clamped() {
        let mut buffer = RawBuffer::new(TestImage::pe64().build());
        let headers = Headers::parse(&buffer).unwrap();
        let count_offset = headers.optional.offset() + 108;

        buffer.write::<u32>(count_offset, 0xFFFF).unwrap();
        assert_eq!(headers.optional.directory_count(&buffer).unwrap(), 16);

        buffer.write::<u32>(count_offset, 2).unwrap();
        assert!(headers
            .optional
            .data_directory(&buffer, DataDirectoryType::Resource)
            .unwrap()
            .is_none());
        assert!(headers
            .optional
            .data_directory(&buffer, DataDirectoryType::Import)
            .unwrap()
            .is_some());
    }

    #[test]
    fn rejects_malformed() {
        let valid = TestImage::pe64().build();

        let mut data = valid.clone();
        data[0] = b'X';
        assert!(matches!(
            Headers::parse(&RawBuffer::new(data)),
            Err(Error::Malformed { .. })
        ));

        let mut data = valid.clone();
        data[0x80] = b'X';
        assert!(Headers::parse(&RawBuffer::new(data)).is_err());

        let mut data = valid.clone();
        data[0x3C..0x40].copy_from_slice(&0xFFFF_FF00_u32.to_le_bytes());
        assert!(Headers::parse(&RawBuffer::new(data)).is_err());

        let mut data = valid.clone();
        data[0x80 + 24] = 0x07;
        assert!(Headers::parse(&RawBuffer::new(data)).is_err());

        let mut data = valid.clone();
        data[0x80 + 4 + 16..0x80 + 4 + 18].copy_from_slice(&16u16.to_le_bytes());
        assert!(Headers::parse(&RawBuffer::new(data)).is_err());

        assert!(Headers::parse(&RawBuffer::new(b"MZ".to_vec())).is_err());
        assert!(Headers::parse(&RawBuffer::new(valid[..0x100].to_vec())).is_err());
    }

    #[test]
    fn section_snapshot() {
        let name = Section::encode_name(".pimp").unwrap();
        assert_eq!(&name, b".pimp\0\0\0");
        assert!(Section::encode_name("").is_err());
        assert!(Section::encode_name("toolongname").is_err());

        let section = Section {
            index: 0,
            header_offset: 0,
            name,
            virtual_size: 0,
            virtual_address: 0x3000,
            size_of_raw_data: 0x200,
            pointer_to_raw_data: 0x800,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: SectionCharacteristics::DATA_RW.bits(),
        };

        assert_eq!(section.virtual_span(), 0x200);
        assert!(section.contains_rva(0x31FF));
        assert!(!section.contains_rva(0x3200));
        assert!(section.contains_offset(0x800));
        assert!(!section.contains_offset(0xA00));

        let decoded = Section::parse(&section.to_bytes(), 0, 0).unwrap();
        assert_eq!(decoded, section);
    }

    #[test]
    fn directory_types() {
        assert_eq!(DataDirectoryType::COUNT, MAX_DATA_DIRECTORIES);
        for (index, kind) in DataDirectoryType::iter().enumerate() {
            assert_eq!(kind.index(), index);
        }
    }
}
