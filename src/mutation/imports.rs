//! Import table injection.
//!
//! New modules cannot be squeezed into the existing import table, since the descriptor
//! array must stay contiguous and is usually followed by other data. Instead the section
//! holding the table is copied into a fresh section, the import directory is repointed at
//! the copy, and the new descriptors, names, hint/name records and thunk arrays are laid
//! out behind the copied bytes. The existing descriptors keep pointing at their original
//! thunks and names, which stay where they are.
//!
//! [`ImportLayout`] computes the exact size of everything before a byte is written; every
//! write is then checked against the planned section size.

use std::collections::HashSet;

use crate::{
    directories::imports::{ImportDescriptor, IMPORT_DESCRIPTOR_SIZE},
    file::{
        address::section_for_rva,
        headers::{DataDirectoryType, Headers, Section},
        PeConfig, RawBuffer,
    },
    mutation::sections::add_section,
    utils::{align_up_usize, to_u32},
    Error, Result,
};

/// A module to import and the functions to import from it by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Module name, e.g. `ws2_32.dll`
    pub module: String,
    /// Function names
    pub functions: Vec<String>,
}

impl ImportRequest {
    /// Create a request for `functions` from `module`.
    pub fn new<M, I, F>(module: M, functions: I) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        ImportRequest {
            module: module.into(),
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Placement of one new module, as offsets from the start of the new section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// NUL-terminated module name
    pub name_offset: usize,
    /// One hint/name record per function, 2-byte aligned
    pub records: Vec<usize>,
    /// Zero-terminated thunk array, pointer aligned
    pub thunks_offset: usize,
}

/// Exact layout of a rebuilt import section.
///
/// ```text
/// 0                    copy of the section that held the old import table
/// descriptors_offset   existing descriptors, new descriptors, zero terminator
/// max(copy, table)     per module: name, hint/name records, thunk array
/// total
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLayout {
    /// Offset of the descriptor array, equal to its offset in the old section
    pub descriptors_offset: usize,
    /// Number of descriptors already present
    pub existing: usize,
    /// Bytes copied from the old section
    pub copied_len: usize,
    /// Size of a thunk
    pub pointer_size: usize,
    /// New modules, in request order
    pub modules: Vec<ModuleLayout>,
    /// Size of the new section
    pub total: usize,
}

impl ImportLayout {
    /// Lay out `requests` behind `copied_len` copied bytes and a descriptor array at
    /// `descriptors_offset` that already holds `existing` entries.
    #[must_use]
    pub fn plan(
        requests: &[ImportRequest],
        copied_len: usize,
        descriptors_offset: usize,
        existing: usize,
        pointer_size: usize,
    ) -> ImportLayout {
        let table_end =
            descriptors_offset + (existing + requests.len() + 1) * IMPORT_DESCRIPTOR_SIZE;
        let mut cursor = copied_len.max(table_end);

        let mut modules = Vec::with_capacity(requests.len());
        for request in requests {
            let name_offset = cursor;
            cursor += request.module.len() + 1;

            let mut records = Vec::with_capacity(request.functions.len());
            for function in &request.functions {
                cursor = align_up_usize(cursor, 2);
                records.push(cursor);
                cursor += 2 + function.len() + 1;
            }

            cursor = align_up_usize(cursor, pointer_size);
            let thunks_offset = cursor;
            cursor += (request.functions.len() + 1) * pointer_size;

            modules.push(ModuleLayout {
                name_offset,
                records,
                thunks_offset,
            });
        }

        ImportLayout {
            descriptors_offset,
            existing,
            copied_len,
            pointer_size,
            modules,
            total: cursor,
        }
    }

    /// Offset of descriptor `index`, counting existing descriptors first.
    #[must_use]
    pub fn descriptor_offset(&self, index: usize) -> usize {
        self.descriptors_offset + index * IMPORT_DESCRIPTOR_SIZE
    }

    /// Size of the descriptor array including the terminator.
    #[must_use]
    pub fn directory_size(&self) -> usize {
        (self.existing + self.modules.len() + 1) * IMPORT_DESCRIPTOR_SIZE
    }
}

/// Bounds-checked writer over the raw data of the new section.
struct SectionWriter<'a> {
    buffer: &'a mut RawBuffer,
    start: usize,
    len: usize,
    virtual_address: u32,
}

impl SectionWriter<'_> {
    fn check(&self, offset: usize, len: usize) -> Result<usize> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(self.start + offset),
            _ => Err(malformed_error!(
                "Import layout overflows its section: 0x{:X} + {} > 0x{:X}",
                offset,
                len,
                self.len
            )),
        }
    }

    fn rva(&self, offset: usize) -> Result<u32> {
        self.check(offset, 0)?;
        let Some(rva) = self.virtual_address.checked_add(to_u32(offset)?) else {
            return Err(Error::OffsetNotMapped {
                offset: self.start + offset,
            });
        };
        Ok(rva)
    }

    fn bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let at = self.check(offset, bytes.len())?;
        self.buffer.write_bytes(at, bytes)
    }

    fn zero(&mut self, offset: usize, len: usize) -> Result<()> {
        let at = self.check(offset, len)?;
        self.buffer.fill(at, len, 0)
    }

    fn cstring(&mut self, offset: usize, value: &str) -> Result<()> {
        let at = self.check(offset, value.len() + 1)?;
        self.buffer.write_cstring(at, value).map(drop)
    }

    fn u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.bytes(offset, &value.to_le_bytes())
    }

    fn u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.bytes(offset, &value.to_le_bytes())
    }

    fn thunk(&mut self, offset: usize, value: u32, pointer_size: usize) -> Result<()> {
        if pointer_size == 8 {
            self.bytes(offset, &u64::from(value).to_le_bytes())
        } else {
            self.u32(offset, value)
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.is_ascii() && !name.contains('\0')
}

fn validate(existing: &[ImportDescriptor], requests: &[ImportRequest]) -> Result<()> {
    if requests.is_empty() {
        return Err(precondition_error!("No imports requested"));
    }

    let mut seen: HashSet<String> = existing
        .iter()
        .map(|descriptor| descriptor.dll_name.to_ascii_lowercase())
        .collect();

    for request in requests {
        if !is_valid_name(&request.module) {
            return Err(precondition_error!(
                "Invalid module name '{}'",
                request.module
            ));
        }
        if request.functions.is_empty() {
            return Err(precondition_error!(
                "No functions requested from '{}'",
                request.module
            ));
        }
        if let Some(function) = request.functions.iter().find(|f| !is_valid_name(f)) {
            return Err(precondition_error!(
                "Invalid function name '{}' for '{}'",
                function,
                request.module
            ));
        }
        if !seen.insert(request.module.to_ascii_lowercase()) {
            return Err(precondition_error!(
                "Module '{}' is already imported",
                request.module
            ));
        }
    }

    Ok(())
}

/// Import functions from modules the image does not import yet.
///
/// The section holding the current import table is copied into a new section named
/// [`PeConfig::import_section_name`]; the import directory is repointed at the copied
/// descriptor array and its size set to cover existing descriptors, new descriptors and
/// the terminator. Each new descriptor's `OriginalFirstThunk` and `FirstThunk` point at
/// the same thunk array. An image without an import table gets one.
///
/// # Errors
/// Returns [`crate::Error::Precondition`] for an empty request, an empty or non-ASCII
/// name, a module requested twice or already imported (ignoring ASCII case), or if the
/// new section does not fit. Returns [`crate::Error::NotMapped`] if the current import
/// directory lies outside every section.
pub fn add_imports(
    buffer: &mut RawBuffer,
    headers: &Headers,
    sections: &[Section],
    existing: &[ImportDescriptor],
    requests: &[ImportRequest],
    config: &PeConfig,
) -> Result<Section> {
    validate(existing, requests)?;

    let Some(directory) = headers
        .optional
        .data_directory(buffer, DataDirectoryType::Import)?
    else {
        return Err(precondition_error!(
            "The optional header has no import directory slot"
        ));
    };

    let import_rva = directory.virtual_address(buffer)?;
    let (copied, descriptors_offset) = if import_rva == 0 {
        (Vec::new(), 0)
    } else {
        let Some(old) = section_for_rva(import_rva, sections) else {
            return Err(Error::NotMapped {
                address: u64::from(import_rva),
            });
        };
        let bytes = buffer
            .read_bytes(
                old.pointer_to_raw_data as usize,
                old.size_of_raw_data as usize,
            )?
            .to_vec();
        (bytes, (import_rva - old.virtual_address) as usize)
    };

    let pointer_size = if headers.is_64() { 8 } else { 4 };
    let layout = ImportLayout::plan(
        requests,
        copied.len(),
        descriptors_offset,
        existing.len(),
        pointer_size,
    );

    let section = add_section(
        buffer,
        headers,
        sections,
        config.import_section_name,
        to_u32(layout.total)?,
        config.import_section_characteristics,
    )?;

    let mut writer = SectionWriter {
        buffer,
        start: section.pointer_to_raw_data as usize,
        len: section.size_of_raw_data as usize,
        virtual_address: section.virtual_address,
    };

    writer.bytes(0, &copied)?;
    let first_new = layout.descriptor_offset(layout.existing);
    writer.zero(
        first_new,
        (requests.len() + 1) * IMPORT_DESCRIPTOR_SIZE,
    )?;

    for (index, (request, module)) in requests.iter().zip(&layout.modules).enumerate() {
        writer.cstring(module.name_offset, &request.module)?;

        for (function, &record) in request.functions.iter().zip(&module.records) {
            writer.u16(record, 0)?;
            writer.cstring(record + 2, function)?;
        }

        for (slot, &record) in module.records.iter().enumerate() {
            let rva = writer.rva(record)?;
            writer.thunk(module.thunks_offset + slot * pointer_size, rva, pointer_size)?;
        }
        writer.zero(
            module.thunks_offset + module.records.len() * pointer_size,
            pointer_size,
        )?;

        let thunks_rva = writer.rva(module.thunks_offset)?;
        let descriptor = layout.descriptor_offset(layout.existing + index);
        writer.u32(descriptor, thunks_rva)?;
        writer.u32(descriptor + 4, 0)?;
        writer.u32(descriptor + 8, 0)?;
        writer.u32(descriptor + 12, writer.rva(module.name_offset)?)?;
        writer.u32(descriptor + 16, thunks_rva)?;
    }

    let table_rva = writer.rva(descriptors_offset)?;
    directory.set_virtual_address(buffer, table_rva)?;
    directory.set_size(buffer, to_u32(layout.directory_size())?)?;

    log::debug!(
        "Rebuilt the import table in section '{}' at RVA 0x{:X}: {} existing and {} new descriptors",
        section.name_str(),
        table_rva,
        layout.existing,
        requests.len()
    );

    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        directories::{
            imports::{parse_descriptors, parse_functions},
            DirectoryContext,
        },
        test::{self, TestImage},
    };

    fn image(data: Vec<u8>) -> (RawBuffer, Headers, Vec<Section>) {
        let buffer = RawBuffer::new(data);
        let headers = Headers::parse(&buffer).unwrap();
        let sections = headers.read_sections(&buffer).unwrap();
        (buffer, headers, sections)
    }

    fn context<'a>(
        buffer: &'a RawBuffer,
        headers: &Headers,
        sections: &'a [Section],
        config: &'a PeConfig,
    ) -> DirectoryContext<'a> {
        DirectoryContext {
            buffer,
            sections,
            is_64: headers.is_64(),
            image_base: headers.optional.image_base(buffer).unwrap(),
            size_of_headers: headers.optional.size_of_headers(buffer).unwrap(),
            machine: headers.file.machine(buffer).unwrap(),
            config,
        }
    }

    fn descriptors(
        buffer: &RawBuffer,
        headers: &Headers,
        config: &PeConfig,
    ) -> Vec<ImportDescriptor> {
        let sections = headers.read_sections(buffer).unwrap();
        let ctx = context(buffer, headers, &sections, config);
        let rva = headers
            .optional
            .data_directory(buffer, DataDirectoryType::Import)
            .unwrap()
            .unwrap()
            .virtual_address(buffer)
            .unwrap();
        parse_descriptors(&ctx, rva).unwrap()
    }

    #[test]
    fn plan_is_exact() {
        let requests = [ImportRequest::new("a.dll", ["Foo", "Bar"])];
        let layout = ImportLayout::plan(&requests, 0x800, 0, 2, 8);

        assert_eq!(layout.modules[0].name_offset, 0x800);
        assert_eq!(layout.modules[0].records, [0x806, 0x80C]);
        assert_eq!(layout.modules[0].thunks_offset, 0x818);
        assert_eq!(layout.total, 0x818 + 3 * 8);
        assert_eq!(layout.directory_size(), 4 * IMPORT_DESCRIPTOR_SIZE);
        assert_eq!(layout.descriptor_offset(2), 40);
    }

    #[test]
    fn plan_grows_past_a_full_copy() {
        // Descriptor array ends right at the end of the copied bytes
        let requests = [
            ImportRequest::new("x.dll", ["A"]),
            ImportRequest::new("yy.dll", ["Bee", "C"]),
        ];
        let layout = ImportLayout::plan(&requests, 60, 0, 2, 4);

        let table_end = 5 * IMPORT_DESCRIPTOR_SIZE;
        assert_eq!(layout.modules[0].name_offset, table_end);
        assert_eq!(layout.modules[0].records, [table_end + 6]);
        assert_eq!(layout.modules[0].thunks_offset, table_end + 12);
        assert_eq!(layout.modules[1].name_offset, table_end + 20);
        assert_eq!(layout.modules[1].records, [table_end + 28, table_end + 34]);
        assert_eq!(layout.modules[1].thunks_offset, table_end + 40);
        assert_eq!(layout.total, table_end + 52);
    }

    #[test]
    fn injected_imports_read_back() {
        let (mut buffer, headers, sections) = image(TestImage::pe64().build());
        let config = PeConfig::default();
        let existing = descriptors(&buffer, &headers, &config);

        let section = add_imports(
            &mut buffer,
            &headers,
            &sections,
            &existing,
            &[ImportRequest::new("new.dll", ["Foo", "Bar"])],
            &config,
        )
        .unwrap();
        assert_eq!(section.name_str(), ".pimp");
        assert_eq!(section.virtual_address, 0x5000);

        let import = headers
            .optional
            .data_directory(&buffer, DataDirectoryType::Import)
            .unwrap()
            .unwrap();
        assert_eq!(import.virtual_address(&buffer).unwrap(), 0x5000);
        assert_eq!(import.size(&buffer).unwrap(), 4 * 20);

        let sections = headers.read_sections(&buffer).unwrap();
        let ctx = context(&buffer, &headers, &sections, &config);
        let after = parse_descriptors(&ctx, 0x5000).unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(existing.len(), 2);
        for (old, new) in existing.iter().zip(&after) {
            assert_eq!(old.dll_name, new.dll_name);
            assert_eq!(old.first_thunk, new.first_thunk);
            assert_eq!(old.original_first_thunk, new.original_first_thunk);
        }
        assert_eq!(after[2].dll_name, "new.dll");
        assert_eq!(after[2].original_first_thunk, after[2].first_thunk);

        let functions = parse_functions(&ctx, &after).unwrap();
        let added: Vec<_> = functions
            .iter()
            .filter(|f| f.dll == "new.dll")
            .filter_map(|f| f.import.name())
            .collect();
        assert_eq!(added, ["Foo", "Bar"]);
        assert_eq!(functions.len(), 5);

        // Terminator right after the last descriptor, inside the declared size
        let terminator = ctx.rva_to_offset(0x5000 + 3 * 20).unwrap();
        assert!(buffer
            .read_bytes(terminator, 20)
            .unwrap()
            .iter()
            .all(|&b| b == 0));
    }

    #[test]
    fn pe32_thunks_are_four_bytes() {
        let (mut buffer, headers, sections) = image(TestImage::pe32().build());
        let config = PeConfig::default();
        let existing = descriptors(&buffer, &headers, &config);

        add_imports(
            &mut buffer,
            &headers,
            &sections,
            &existing,
            &[ImportRequest::new("shell32.dll", ["ShellExecuteW"])],
            &config,
        )
        .unwrap();

        let sections = headers.read_sections(&buffer).unwrap();
        let ctx = context(&buffer, &headers, &sections, &config);
        let after = descriptors(&buffer, &headers, &config);
        let functions = parse_functions(&ctx, &after[2..]).unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].import.name(), Some("ShellExecuteW"));
        assert_eq!(functions[0].thunk_value & 0xFFFF_FFFF_0000_0000, 0);
        assert_eq!(functions[0].thunk_rva % 4, 0);
    }

    #[test]
    fn image_without_imports_gets_a_table() {
        let (mut buffer, headers, sections) = image(TestImage::pe64().build());
        headers
            .optional
            .data_directory(&buffer, DataDirectoryType::Import)
            .unwrap()
            .unwrap()
            .clear(&mut buffer)
            .unwrap();
        let config = PeConfig::default();

        let section = add_imports(
            &mut buffer,
            &headers,
            &sections,
            &[],
            &[ImportRequest::new("kernel32.dll", ["Sleep"])],
            &config,
        )
        .unwrap();

        let after = descriptors(&buffer, &headers, &config);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].offset, section.pointer_to_raw_data as usize);
        // Two descriptors, "kernel32.dll\0" padded to 14, one record, aligned thunk pair
        assert_eq!(section.size_of_raw_data, 40 + 14 + 8 + 2 + 16);
    }

    #[test]
    fn rejects_duplicates_and_empty_requests() {
        let (mut buffer, headers, sections) = image(TestImage::pe64().build());
        let config = PeConfig::default();
        let existing = descriptors(&buffer, &headers, &config);
        let before = buffer.data().to_vec();

        let rejected = [
            vec![],
            vec![ImportRequest::new("KERNEL32.DLL", ["Beep"])],
            vec![
                ImportRequest::new("a.dll", ["X"]),
                ImportRequest::new("A.dll", ["Y"]),
            ],
            vec![ImportRequest::new("", ["X"])],
            vec![ImportRequest::new("b.dll", Vec::<String>::new())],
            vec![ImportRequest::new("c.dll", [""])],
            vec![ImportRequest::new("d\u{e9}.dll", ["X"])],
        ];
        for requests in rejected {
            assert!(matches!(
                add_imports(&mut buffer, &headers, &sections, &existing, &requests, &config),
                Err(Error::Precondition(_))
            ));
        }
        assert_eq!(buffer.data(), &before[..]);
        assert_eq!(buffer.len(), test::FILE_LEN);
    }

    #[test]
    fn custom_section_name() {
        let (mut buffer, headers, sections) = image(TestImage::pe64().build());
        let config = PeConfig {
            import_section_name: ".idata2",
            ..PeConfig::default()
        };
        let existing = descriptors(&buffer, &headers, &config);

        let section = add_imports(
            &mut buffer,
            &headers,
            &sections,
            &existing,
            &[ImportRequest::new("z.dll", ["Z"])],
            &config,
        )
        .unwrap();
        assert_eq!(section.name_str(), ".idata2");
        assert_eq!(section.characteristics, config.import_section_characteristics.bits());
    }
}
