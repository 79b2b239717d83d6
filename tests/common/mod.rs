//! Synthetic executables shared by the integration tests.
//!
//! ```text
//! section  VirtualAddress  VirtualSize  PointerToRawData  SizeOfRawData
//! .text    0x1000          0x100        0x400             0x200
//! .rdata   0x2000          0x300        0x600             0x400
//! .data    0x3000          0x80         0xA00             0x200
//! .reloc   0x4000          0xC          0xC00             0x200
//! ```
//!
//! `.rdata` holds an import table (kernel32.dll: ExitProcess, GetLastError;
//! user32.dll: MessageBoxW) and an export table (sample.dll: Alpha, Beta).
#![allow(dead_code)]

pub const FILE_LEN: usize = 0xE00;
pub const SIZE_OF_IMAGE: u32 = 0x5000;
pub const SECTION_COUNT: usize = 4;

pub const ORIGINAL_IMPORTS: [(&str, &str); 3] = [
    ("kernel32.dll", "ExitProcess"),
    ("kernel32.dll", "GetLastError"),
    ("user32.dll", "MessageBoxW"),
];

const E_LFANEW: usize = 0x80;

struct Writer(Vec<u8>);

impl Writer {
    fn bytes(&mut self, at: usize, bytes: &[u8]) -> &mut Self {
        self.0[at..at + bytes.len()].copy_from_slice(bytes);
        self
    }

    fn u16(&mut self, at: usize, value: u16) -> &mut Self {
        self.bytes(at, &value.to_le_bytes())
    }

    fn u32(&mut self, at: usize, value: u32) -> &mut Self {
        self.bytes(at, &value.to_le_bytes())
    }

    fn u64(&mut self, at: usize, value: u64) -> &mut Self {
        self.bytes(at, &value.to_le_bytes())
    }
}

// .rdata: RVA 0x2000 + n at file offset 0x600 + n
fn rdata(rva: u32) -> usize {
    0x600 + (rva - 0x2000) as usize
}

/// Build the sample image, PE32+ when `is_64`.
pub fn sample(is_64: bool) -> Vec<u8> {
    let mut w = Writer(vec![0; FILE_LEN]);
    let opt = E_LFANEW + 24;
    let opt_size = if is_64 { 240 } else { 224 };
    let dirs = opt + if is_64 { 112 } else { 96 };
    let image_base: u64 = if is_64 { 0x1_8000_0000 } else { 0x1000_0000 };

    w.bytes(0, b"MZ").u32(0x3C, E_LFANEW as u32);
    w.bytes(E_LFANEW, b"PE\0\0")
        .u16(E_LFANEW + 4, if is_64 { 0x8664 } else { 0x14C })
        .u16(E_LFANEW + 6, SECTION_COUNT as u16)
        .u16(E_LFANEW + 20, opt_size as u16)
        .u16(E_LFANEW + 22, if is_64 { 0x2022 } else { 0x2102 });

    w.u16(opt, if is_64 { 0x20B } else { 0x10B })
        .u32(opt + 4, 0x200)
        .u32(opt + 8, 0x800)
        .u32(opt + 16, 0x1000)
        .u32(opt + 20, 0x1000)
        .u32(opt + 32, 0x1000)
        .u32(opt + 36, 0x200)
        .u16(opt + 40, 6)
        .u16(opt + 48, 6)
        .u32(opt + 56, SIZE_OF_IMAGE)
        .u32(opt + 60, 0x400)
        .u16(opt + 68, 2);
    if is_64 {
        w.u64(opt + 24, image_base)
            .u64(opt + 72, 0x10_0000)
            .u64(opt + 80, 0x1000)
            .u64(opt + 88, 0x10_0000)
            .u64(opt + 96, 0x1000)
            .u32(opt + 108, 16);
    } else {
        w.u32(opt + 24, 0x2000)
            .u32(opt + 28, image_base as u32)
            .u32(opt + 72, 0x10_0000)
            .u32(opt + 76, 0x1000)
            .u32(opt + 80, 0x10_0000)
            .u32(opt + 84, 0x1000)
            .u32(opt + 92, 16);
    }

    // Export, Import, BaseRelocation, IAT
    w.u32(dirs, 0x2200).u32(dirs + 4, 0x80);
    w.u32(dirs + 8, 0x2000).u32(dirs + 12, 60);
    w.u32(dirs + 5 * 8, 0x4000).u32(dirs + 5 * 8 + 4, 12);
    w.u32(dirs + 12 * 8, 0x2060).u32(dirs + 12 * 8 + 4, 0x60);

    let table = opt + opt_size;
    let sections: [(&[u8], u32, u32, u32, u32, u32); SECTION_COUNT] = [
        (b".text", 0x100, 0x1000, 0x200, 0x400, 0x6000_0020),
        (b".rdata", 0x300, 0x2000, 0x400, 0x600, 0x4000_0040),
        (b".data", 0x80, 0x3000, 0x200, 0xA00, 0xC000_0040),
        (b".reloc", 0xC, 0x4000, 0x200, 0xC00, 0x4200_0040),
    ];
    for (index, (name, vsize, va, raw_size, raw_ptr, characteristics)) in
        sections.into_iter().enumerate()
    {
        let at = table + index * 40;
        w.bytes(at, name)
            .u32(at + 8, vsize)
            .u32(at + 12, va)
            .u32(at + 16, raw_size)
            .u32(at + 20, raw_ptr)
            .u32(at + 36, characteristics);
    }

    // mov eax, 1; ret
    w.bytes(0x400, &[0xB8, 0x01, 0x00, 0x00, 0x00, 0xC3]);

    // Imports: descriptors at 0x2000, OFTs at 0x2040/0x2080, IATs at 0x2060/0x20A0
    w.u32(rdata(0x2000), 0x2040)
        .u32(rdata(0x200C), 0x20C0)
        .u32(rdata(0x2010), 0x2060)
        .u32(rdata(0x2014), 0x2080)
        .u32(rdata(0x2020), 0x20D0)
        .u32(rdata(0x2024), 0x20A0);
    let step = if is_64 { 8 } else { 4 };
    let thunk = |w: &mut Writer, rva: u32, value: u32| {
        if is_64 {
            w.u64(rdata(rva), u64::from(value));
        } else {
            w.u32(rdata(rva), value);
        }
    };
    for table in [0x2040, 0x2060] {
        thunk(&mut w, table, 0x20E0);
        thunk(&mut w, table + step, 0x2100);
    }
    for table in [0x2080, 0x20A0] {
        thunk(&mut w, table, 0x2120);
    }
    w.bytes(rdata(0x20C0), b"kernel32.dll\0")
        .bytes(rdata(0x20D0), b"user32.dll\0")
        .bytes(rdata(0x20E0), b"\x01\x00ExitProcess\0")
        .bytes(rdata(0x2100), b"\x02\x00GetLastError\0")
        .bytes(rdata(0x2120), b"\x03\x00MessageBoxW\0");

    // Exports: two named functions
    let dir = rdata(0x2200);
    w.u32(dir + 12, 0x2260)
        .u32(dir + 16, 1)
        .u32(dir + 20, 2)
        .u32(dir + 24, 2)
        .u32(dir + 28, 0x2240)
        .u32(dir + 32, 0x2248)
        .u32(dir + 36, 0x2250)
        .u32(rdata(0x2240), 0x1000)
        .u32(rdata(0x2244), 0x1003)
        .u32(rdata(0x2248), 0x2270)
        .u32(rdata(0x224C), 0x2278)
        .u16(rdata(0x2250), 0)
        .u16(rdata(0x2252), 1)
        .bytes(rdata(0x2260), b"sample.dll\0")
        .bytes(rdata(0x2270), b"Alpha\0")
        .bytes(rdata(0x2278), b"Beta\0");

    // One relocation block covering the .data page
    let kind: u16 = if is_64 { 10 } else { 3 };
    w.u32(0xC00, 0x3000).u32(0xC04, 12).u16(0xC08, (kind << 12) | 0x8);

    w.0
}
