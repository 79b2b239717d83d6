//! Synthetic PE images for unit tests.
//!
//! [`TestImage`] lays out a small but complete executable: four file-aligned sections, an
//! import table with two modules, an export table with a forwarder, debug, TLS,
//! load-config, resource, relocation and (for PE32+) exception directories. Optional
//! pieces (a CLR header, an attribute certificate) are switched on through the builder.
//!
//! ```text
//! section  VirtualAddress  VirtualSize  PointerToRawData  SizeOfRawData
//! .text    0x1000          0x100        0x400             0x200
//! .rdata   0x2000          0x800        0x600             0x800
//! .data    0x3000          0x200        0xE00             0x200
//! .reloc   0x4000          0x20         0x1000            0x200
//! ```

use crate::file::{characteristics::SectionCharacteristics, headers::DataDirectoryType};

pub const E_LFANEW: usize = 0x80;
pub const SIZE_OF_HEADERS: u32 = 0x400;
pub const FILE_ALIGNMENT: u32 = 0x200;
pub const SECTION_ALIGNMENT: u32 = 0x1000;
pub const SIZE_OF_IMAGE: u32 = 0x5000;
pub const FILE_LEN: usize = 0x1200;

pub const IMPORT_RVA: u32 = 0x2000;
pub const IMPORT_SIZE: u32 = 60;
pub const EXPORT_RVA: u32 = 0x2200;
pub const EXPORT_SIZE: u32 = 0xB0;
pub const DEBUG_RVA: u32 = 0x2300;
pub const TLS_RVA: u32 = 0x2380;
pub const LOAD_CONFIG_RVA: u32 = 0x2400;
pub const EXCEPTION_RVA: u32 = 0x2480;
pub const RESOURCE_RVA: u32 = 0x2600;
pub const CLR_RVA: u32 = 0x2700;
pub const RELOC_RVA: u32 = 0x4000;

pub const PDB_GUID: uguid::Guid = uguid::guid!("6f1c2f9a-0b7e-4d2a-9c55-3e8f00a1b2c4");

struct Layout {
    name: &'static [u8],
    virtual_address: u32,
    virtual_size: u32,
    pointer_to_raw_data: u32,
    size_of_raw_data: u32,
    characteristics: SectionCharacteristics,
}

const SECTIONS: [Layout; 4] = [
    Layout {
        name: b".text",
        virtual_address: 0x1000,
        virtual_size: 0x100,
        pointer_to_raw_data: 0x400,
        size_of_raw_data: 0x200,
        characteristics: SectionCharacteristics::CODE_RX,
    },
    Layout {
        name: b".rdata",
        virtual_address: 0x2000,
        virtual_size: 0x800,
        pointer_to_raw_data: 0x600,
        size_of_raw_data: 0x800,
        characteristics: SectionCharacteristics::CNT_INITIALIZED_DATA
            .union(SectionCharacteristics::MEM_READ),
    },
    Layout {
        name: b".data",
        virtual_address: 0x3000,
        virtual_size: 0x200,
        pointer_to_raw_data: 0xE00,
        size_of_raw_data: 0x200,
        characteristics: SectionCharacteristics::DATA_RW,
    },
    Layout {
        name: b".reloc",
        virtual_address: 0x4000,
        virtual_size: 0x20,
        pointer_to_raw_data: 0x1000,
        size_of_raw_data: 0x200,
        characteristics: SectionCharacteristics::CNT_INITIALIZED_DATA
            .union(SectionCharacteristics::MEM_READ)
            .union(SectionCharacteristics::MEM_DISCARDABLE),
    },
];

/// Builder for a synthetic executable.
pub struct TestImage {
    is_64: bool,
    managed: bool,
    certificate: Option<Vec<u8>>,
}

impl TestImage {
    pub fn pe64() -> Self {
        TestImage {
            is_64: true,
            managed: false,
            certificate: None,
        }
    }

    pub fn pe32() -> Self {
        TestImage {
            is_64: false,
            ..Self::pe64()
        }
    }

    /// Add a CLR header and a stub metadata root.
    pub fn managed(mut self) -> Self {
        self.managed = true;
        self
    }

    /// Append an attribute certificate carrying `blob` after the last section.
    pub fn certificate(mut self, blob: &[u8]) -> Self {
        self.certificate = Some(blob.to_vec());
        self
    }

    pub fn image_base(&self) -> u64 {
        if self.is_64 {
            0x1_4000_0000
        } else {
            0x40_0000
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = Image {
            data: vec![0; FILE_LEN],
        };
        self.headers(&mut image);
        self.section_table(&mut image);
        image.bytes(0x400, &[0x48, 0x83, 0xEC, 0x28, 0x31, 0xC9, 0xC3]);
        self.imports(&mut image);
        self.exports(&mut image);
        self.debug(&mut image);
        self.tls(&mut image);
        self.load_config(&mut image);
        if self.is_64 {
            self.exception(&mut image);
        }
        self.resources(&mut image);
        self.relocations(&mut image);
        if self.managed {
            self.clr(&mut image);
        }
        if let Some(blob) = &self.certificate {
            self.append_certificate(&mut image, blob);
        }
        image.data
    }

    fn optional_offset(&self) -> usize {
        E_LFANEW + 24
    }

    fn optional_size(&self) -> usize {
        if self.is_64 {
            240
        } else {
            224
        }
    }

    fn directory(&self, image: &mut Image, kind: DataDirectoryType, rva: u32, size: u32) {
        let base = self.optional_offset() + if self.is_64 { 112 } else { 96 };
        let slot = base + kind.index() * 8;
        image.u32(slot, rva).u32(slot + 4, size);
    }

    fn headers(&self, image: &mut Image) {
        image.bytes(0, b"MZ").u32(0x3C, E_LFANEW as u32);
        image.bytes(0x40, b"\x0E\x1F\xBA\x0E\x00\xB4\x09\xCD\x21\xB8\x01\x4C\xCD\x21");

        image
            .bytes(E_LFANEW, b"PE\0\0")
            .u16(E_LFANEW + 4, if self.is_64 { 0x8664 } else { 0x14C })
            .u16(E_LFANEW + 6, SECTIONS.len() as u16)
            .u32(E_LFANEW + 8, 0x6500_0000)
            .u16(E_LFANEW + 20, self.optional_size() as u16)
            .u16(E_LFANEW + 22, if self.is_64 { 0x0022 } else { 0x0102 });

        let opt = self.optional_offset();
        image
            .u16(opt, if self.is_64 { 0x20B } else { 0x10B })
            .bytes(opt + 2, &[14, 36])
            .u32(opt + 4, 0x200)
            .u32(opt + 8, 0xC00)
            .u32(opt + 16, 0x1000)
            .u32(opt + 20, 0x1000)
            .u32(opt + 32, SECTION_ALIGNMENT)
            .u32(opt + 36, FILE_ALIGNMENT)
            .u16(opt + 40, 6)
            .u16(opt + 48, 6)
            .u32(opt + 56, SIZE_OF_IMAGE)
            .u32(opt + 60, SIZE_OF_HEADERS)
            .u16(opt + 68, 3)
            .u16(opt + 70, 0x8160);

        if self.is_64 {
            image
                .u64(opt + 24, self.image_base())
                .u64(opt + 72, 0x10_0000)
                .u64(opt + 80, 0x1000)
                .u64(opt + 88, 0x10_0000)
                .u64(opt + 96, 0x1000)
                .u32(opt + 108, 16);
        } else {
            image
                .u32(opt + 24, 0x3000)
                .u32(opt + 28, self.image_base() as u32)
                .u32(opt + 72, 0x10_0000)
                .u32(opt + 76, 0x1000)
                .u32(opt + 80, 0x10_0000)
                .u32(opt + 84, 0x1000)
                .u32(opt + 92, 16);
        }

        self.directory(image, DataDirectoryType::Export, EXPORT_RVA, EXPORT_SIZE);
        self.directory(image, DataDirectoryType::Import, IMPORT_RVA, IMPORT_SIZE);
        self.directory(image, DataDirectoryType::Resource, RESOURCE_RVA, 0x28);
        if self.is_64 {
            self.directory(image, DataDirectoryType::Exception, EXCEPTION_RVA, 12);
        }
        self.directory(image, DataDirectoryType::BaseRelocation, RELOC_RVA, 12);
        self.directory(image, DataDirectoryType::Debug, DEBUG_RVA, 28);
        self.directory(
            image,
            DataDirectoryType::Tls,
            TLS_RVA,
            if self.is_64 { 40 } else { 24 },
        );
        self.directory(
            image,
            DataDirectoryType::LoadConfig,
            LOAD_CONFIG_RVA,
            if self.is_64 { 0x60 } else { 0x40 },
        );
        self.directory(image, DataDirectoryType::Iat, 0x2060, 0x60);
    }

    fn section_table(&self, image: &mut Image) {
        let table = self.optional_offset() + self.optional_size();
        for (index, section) in SECTIONS.iter().enumerate() {
            let at = table + index * 40;
            image
                .bytes(at, section.name)
                .u32(at + 8, section.virtual_size)
                .u32(at + 12, section.virtual_address)
                .u32(at + 16, section.size_of_raw_data)
                .u32(at + 20, section.pointer_to_raw_data)
                .u32(at + 36, section.characteristics.bits());
        }
    }

    // RVA 0x2000 + n lives at file offset 0x600 + n
    fn rdata(rva: u32) -> usize {
        0x600 + (rva - 0x2000) as usize
    }

    fn pointer(&self, image: &mut Image, rva: u32, value: u64) {
        if self.is_64 {
            image.u64(Self::rdata(rva), value);
        } else {
            image.u32(Self::rdata(rva), value as u32);
        }
    }

    fn imports(&self, image: &mut Image) {
        // kernel32.dll
        image
            .u32(Self::rdata(0x2000), 0x2040)
            .u32(Self::rdata(0x200C), 0x20C0)
            .u32(Self::rdata(0x2010), 0x2060);
        // user32.dll
        image
            .u32(Self::rdata(0x2014), 0x2080)
            .u32(Self::rdata(0x2020), 0x20D0)
            .u32(Self::rdata(0x2024), 0x20A0);

        let step = if self.is_64 { 8 } else { 4 };
        for table in [0x2040, 0x2060] {
            self.pointer(image, table, 0x20E0);
            self.pointer(image, table + step, 0x2100);
        }
        for table in [0x2080, 0x20A0] {
            self.pointer(image, table, 0x2120);
        }

        image
            .bytes(Self::rdata(0x20C0), b"kernel32.dll\0")
            .bytes(Self::rdata(0x20D0), b"user32.dll\0")
            .bytes(Self::rdata(0x20E0), b"\x01\x00ExitProcess\0")
            .bytes(Self::rdata(0x2100), b"\x02\x00GetLastError\0")
            .bytes(Self::rdata(0x2120), b"\x03\x00MessageBoxW\0");
    }

    fn exports(&self, image: &mut Image) {
        let dir = Self::rdata(EXPORT_RVA);
        image
            .u32(dir + 12, 0x2280)
            .u32(dir + 16, 1)
            .u32(dir + 20, 2)
            .u32(dir + 24, 2)
            .u32(dir + 28, 0x2240)
            .u32(dir + 32, 0x2250)
            .u32(dir + 36, 0x2260)
            .u32(Self::rdata(0x2240), 0x1010)
            .u32(Self::rdata(0x2244), 0x2290)
            .u32(Self::rdata(0x2250), 0x2270)
            .u32(Self::rdata(0x2254), 0x2278)
            .u16(Self::rdata(0x2260), 0)
            .u16(Self::rdata(0x2262), 1)
            .bytes(Self::rdata(0x2270), b"Alpha\0")
            .bytes(Self::rdata(0x2278), b"Beta\0")
            .bytes(Self::rdata(0x2280), b"sample.exe\0")
            .bytes(Self::rdata(0x2290), b"KERNEL32.ExitProcess\0");
    }

    fn debug(&self, image: &mut Image) {
        let mut record = Vec::new();
        record.extend_from_slice(b"RSDS");
        record.extend_from_slice(&PDB_GUID.to_bytes());
        record.extend_from_slice(&1u32.to_le_bytes());
        record.extend_from_slice(b"sample.pdb\0");

        let entry = Self::rdata(DEBUG_RVA);
        image
            .u32(entry + 4, 0x6500_0000)
            .u32(entry + 12, 2)
            .u32(entry + 16, record.len() as u32)
            .u32(entry + 20, 0x2340)
            .u32(entry + 24, Self::rdata(0x2340) as u32)
            .bytes(Self::rdata(0x2340), &record);
    }

    fn tls(&self, image: &mut Image) {
        let base = self.image_base();
        let fields = [
            base + 0x3000,
            base + 0x3010,
            base + 0x3100,
            base + 0x23C0,
        ];
        let step = if self.is_64 { 8 } else { 4 };
        for (index, value) in fields.into_iter().enumerate() {
            self.pointer(image, TLS_RVA + index as u32 * step, value);
        }
        self.pointer(image, 0x23C0, base + 0x1020);
    }

    fn load_config(&self, image: &mut Image) {
        let at = Self::rdata(LOAD_CONFIG_RVA);
        let cookie = self.image_base() + 0x3008;
        if self.is_64 {
            image.u32(at, 0x60).u64(at + 0x58, cookie);
        } else {
            image.u32(at, 0x40).u32(at + 0x3C, cookie as u32);
        }
    }

    fn exception(&self, image: &mut Image) {
        image
            .u32(Self::rdata(EXCEPTION_RVA), 0x1000)
            .u32(Self::rdata(EXCEPTION_RVA + 4), 0x1007)
            .u32(Self::rdata(EXCEPTION_RVA + 8), 0x24A0)
            // version 1, prolog 4, one UWOP_ALLOC_SMALL slot
            .bytes(Self::rdata(0x24A0), &[0x01, 0x04, 0x01, 0x00, 0x04, 0x42]);
    }

    fn resources(&self, image: &mut Image) {
        let root = Self::rdata(RESOURCE_RVA);
        image
            .u16(root + 14, 1)
            .u32(root + 16, 16)
            .u32(root + 20, 0x8000_0018);
    }

    fn relocations(&self, image: &mut Image) {
        let kind: u16 = if self.is_64 { 10 } else { 3 };
        image
            .u32(0x1000, 0x1000)
            .u32(0x1004, 12)
            .u16(0x1008, (kind << 12) | 0x010);
    }

    fn clr(&self, image: &mut Image) {
        let at = Self::rdata(CLR_RVA);
        image
            .u32(at, 72)
            .u16(at + 4, 2)
            .u16(at + 6, 5)
            .u32(at + 8, 0x2760)
            .u32(at + 12, 0x20)
            .u32(at + 16, 1)
            .u32(at + 20, 0x0600_0001)
            .bytes(Self::rdata(0x2760), b"BSJB");
        self.directory(image, DataDirectoryType::ClrRuntimeHeader, CLR_RVA, 72);
    }

    fn append_certificate(&self, image: &mut Image, blob: &[u8]) {
        let offset = image.data.len();
        let length = 8 + blob.len();
        let padded = (length + 7) & !7;
        image.data.resize(offset + padded, 0);
        image
            .u32(offset, length as u32)
            .u16(offset + 4, 0x0200)
            .u16(offset + 6, 2)
            .bytes(offset + 8, blob);
        self.directory(
            image,
            DataDirectoryType::Security,
            offset as u32,
            padded as u32,
        );
    }
}

struct Image {
    data: Vec<u8>,
}

impl Image {
    fn u16(&mut self, offset: usize, value: u16) -> &mut Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    fn u32(&mut self, offset: usize, value: u32) -> &mut Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    fn u64(&mut self, offset: usize, value: u64) -> &mut Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    fn bytes(&mut self, offset: usize, value: &[u8]) -> &mut Self {
        self.data[offset..offset + value.len()].copy_from_slice(value);
        self
    }
}
