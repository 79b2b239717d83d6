//! Cross-checks against the independent `goblin` PE parser, before and after edits.

mod common;

use goblin::pe::PE;
use pescope::prelude::*;

fn assert_sections_agree(pe: &PeFile) -> Result<()> {
    let theirs = PE::parse(pe.data()).expect("goblin parses the image");
    let ours = pe.sections()?;

    assert_eq!(theirs.sections.len(), ours.len());
    for (mine, other) in ours.iter().zip(&theirs.sections) {
        assert_eq!(mine.name_str(), other.name().unwrap());
        assert_eq!(mine.virtual_address, other.virtual_address);
        assert_eq!(mine.virtual_size, other.virtual_size);
        assert_eq!(mine.pointer_to_raw_data, other.pointer_to_raw_data);
        assert_eq!(mine.size_of_raw_data, other.size_of_raw_data);
        assert_eq!(mine.characteristics, other.characteristics);
    }

    let optional = theirs.header.optional_header.expect("optional header");
    assert_eq!(
        u64::from(pe.entry_point()?),
        optional.standard_fields.address_of_entry_point as u64
    );
    assert_eq!(pe.image_base()?, optional.windows_fields.image_base as u64);
    assert_eq!(
        u64::from(
            pe.headers()
                .optional
                .size_of_image(pe.buffer())?
        ),
        optional.windows_fields.size_of_image as u64
    );
    assert_eq!(pe.is_pe32_plus(), theirs.is_64);
    Ok(())
}

fn import_pairs(pe: &PeFile) -> Result<Vec<(String, String)>> {
    Ok(pe
        .imports()?
        .iter()
        .map(|function| {
            (
                function.dll.clone(),
                function.import.name().unwrap_or_default().to_string(),
            )
        })
        .collect())
}

fn goblin_import_pairs(data: &[u8]) -> Vec<(String, String)> {
    let theirs = PE::parse(data).expect("goblin parses the image");
    theirs
        .imports
        .iter()
        .map(|import| (import.dll.to_string(), import.name.to_string()))
        .collect()
}

#[test]
fn pristine_images_agree() -> Result<()> {
    for is_64 in [false, true] {
        let pe = PeFile::from_mem(common::sample(is_64))?;
        assert_sections_agree(&pe)?;

        let mut ours = import_pairs(&pe)?;
        let mut theirs = goblin_import_pairs(pe.data());
        ours.sort();
        theirs.sort();
        assert_eq!(ours, theirs);

        let theirs = PE::parse(pe.data()).expect("goblin parses the image");
        let exports = pe.exports()?.expect("export directory");
        assert_eq!(exports.functions.len(), theirs.exports.len());
        for export in &theirs.exports {
            let name = export.name.expect("named export");
            let mine = exports.by_name(name).expect("same export");
            assert_eq!(mine.rva as usize, export.rva);
        }
    }
    Ok(())
}

#[test]
fn added_section_is_visible() -> Result<()> {
    for is_64 in [false, true] {
        let mut pe = PeFile::from_mem(common::sample(is_64))?;
        let added = pe.add_section(".extra", 0x300, SectionCharacteristics::DATA_RW)?;

        assert_eq!(added.virtual_address, 0x5000);
        assert_eq!(added.pointer_to_raw_data as usize, common::FILE_LEN);
        assert_sections_agree(&pe)?;

        let theirs = PE::parse(pe.data()).expect("goblin parses the image");
        let last = theirs.sections.last().expect("sections");
        assert_eq!(last.name().unwrap(), ".extra");
    }
    Ok(())
}

#[test]
fn removed_sections_stay_consistent() -> Result<()> {
    for is_64 in [false, true] {
        let mut pe = PeFile::from_mem(common::sample(is_64))?;
        pe.remove_section(".data", true)?;
        assert_sections_agree(&pe)?;
        assert_eq!(
            goblin_import_pairs(pe.data()).len(),
            common::ORIGINAL_IMPORTS.len()
        );

        pe.remove_section(".reloc", true)?;
        assert_sections_agree(&pe)?;
        assert_eq!(pe.len(), common::FILE_LEN - 0x400);
    }
    Ok(())
}

#[test]
fn injected_imports_are_visible() -> Result<()> {
    for is_64 in [false, true] {
        let mut pe = PeFile::from_mem(common::sample(is_64))?;
        pe.add_imports(&[
            ImportRequest::new("ws2_32.dll", ["WSAStartup", "socket", "connect"]),
            ImportRequest::new("advapi32.dll", ["RegOpenKeyExW"]),
        ])?;
        assert_sections_agree(&pe)?;

        let mut ours = import_pairs(&pe)?;
        let mut theirs = goblin_import_pairs(pe.data());
        ours.sort();
        theirs.sort();
        assert_eq!(ours, theirs);
        assert_eq!(theirs.len(), common::ORIGINAL_IMPORTS.len() + 4);

        let goblin = PE::parse(pe.data()).expect("goblin parses the image");
        for library in ["kernel32.dll", "user32.dll", "ws2_32.dll", "advapi32.dll"] {
            assert!(goblin.libraries.contains(&library), "{library}");
        }
    }
    Ok(())
}

#[test]
fn edits_compose() -> Result<()> {
    let mut pe = PeFile::from_mem(common::sample(true))?;
    pe.add_section(".one", 0x10, SectionCharacteristics::DATA_RW)?;
    pe.add_imports(&[ImportRequest::new("ole32.dll", ["CoInitialize"])])?;
    pe.remove_section(".one", true)?;
    assert_sections_agree(&pe)?;

    let pairs = goblin_import_pairs(pe.data());
    assert!(pairs.contains(&("ole32.dll".to_string(), "CoInitialize".to_string())));
    Ok(())
}
