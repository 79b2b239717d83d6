//! Section append and removal.

use crate::{
    file::{
        characteristics::SectionCharacteristics,
        headers::{DataDirectoryType, Headers, Section, SECTION_HEADER_SIZE},
        RawBuffer,
    },
    utils::{align_up, to_u32},
    Result,
};
use strum::IntoEnumIterator;

/// Append a zero-filled section of `size` bytes and describe it in a new section header.
///
/// The raw data is appended at the current end of the buffer, so no existing byte moves.
/// The new section starts at the first section-aligned RVA past every existing section;
/// its virtual and raw sizes are both `size`. `NumberOfSections` grows by one and
/// `SizeOfImage` by `size` rounded up to the section alignment.
///
/// # Errors
/// Returns [`crate::Error::Precondition`] if the name is not 1 to 8 bytes, `size` is zero,
/// the section count is saturated, or there is no room for another header before the
/// first section's raw data.
pub fn add_section(
    buffer: &mut RawBuffer,
    headers: &Headers,
    sections: &[Section],
    name: &str,
    size: u32,
    characteristics: SectionCharacteristics,
) -> Result<Section> {
    let encoded = Section::encode_name(name)?;
    if size == 0 {
        return Err(precondition_error!("Section '{}' must not be empty", name));
    }

    let count = headers.file.number_of_sections(buffer)?;
    let Some(new_count) = count.checked_add(1) else {
        return Err(precondition_error!("The section table is full"));
    };

    let slot = headers.section_table_offset() + usize::from(count) * SECTION_HEADER_SIZE;
    let limit = header_region_limit(buffer, headers, sections)?;
    if slot + SECTION_HEADER_SIZE > limit {
        return Err(precondition_error!(
            "No room for another section header: table ends at 0x{:X}, raw data starts at 0x{:X}",
            slot,
            limit
        ));
    }

    let alignment = headers.optional.section_alignment(buffer)?;
    let highest = sections
        .iter()
        .map(Section::virtual_extent)
        .max()
        .unwrap_or_else(|| u64::from(headers.optional.size_of_headers(buffer).unwrap_or(0)));
    let highest = u32::try_from(highest)
        .map_err(|_| malformed_error!("Section table extends past the 32-bit address space"))?;
    let virtual_address = align_up(highest, alignment)?;
    let image_growth = align_up(size, alignment)?;

    let pointer_to_raw_data = to_u32(buffer.len())?;
    buffer.append_zeros(size as usize);

    let section = Section {
        index: usize::from(count),
        header_offset: slot,
        name: encoded,
        virtual_size: size,
        virtual_address,
        size_of_raw_data: size,
        pointer_to_raw_data,
        pointer_to_relocations: 0,
        pointer_to_linenumbers: 0,
        number_of_relocations: 0,
        number_of_linenumbers: 0,
        characteristics: characteristics.bits(),
    };
    section.header().write(buffer, &section)?;
    headers.file.set_number_of_sections(buffer, new_count)?;

    let size_of_image = headers.optional.size_of_image(buffer)?;
    let Some(size_of_image) = size_of_image.checked_add(image_growth) else {
        return Err(malformed_error!("SizeOfImage overflows"));
    };
    headers.optional.set_size_of_image(buffer, size_of_image)?;

    log::debug!(
        "Added section '{}' at RVA 0x{:X}, file offset 0x{:X}, {} bytes",
        name,
        virtual_address,
        pointer_to_raw_data,
        size
    );

    Ok(section)
}

/// First file offset the section table may not grow into: the lowest raw data pointer,
/// capped by `SizeOfHeaders`.
fn header_region_limit(
    buffer: &RawBuffer,
    headers: &Headers,
    sections: &[Section],
) -> Result<usize> {
    let mut limit = buffer.len();
    let size_of_headers = headers.optional.size_of_headers(buffer)? as usize;
    if size_of_headers != 0 {
        limit = limit.min(size_of_headers);
    }

    for section in sections {
        if section.size_of_raw_data != 0 && section.pointer_to_raw_data != 0 {
            limit = limit.min(section.pointer_to_raw_data as usize);
        }
    }
    Ok(limit)
}

/// Remove the first section named `name` and repack the section table.
///
/// With `remove_content` the section's raw bytes are deleted from the buffer and every
/// section (and the certificate table) stored after them moves down by the removed size.
///
/// Sections virtually below the removed one have their `VirtualSize` stretched to the
/// start of the next remaining section. A data directory whose address and size equal the
/// removed section's is cleared. `SizeOfImage` shrinks only when the removed section was
/// the highest one in memory.
///
/// # Errors
/// Returns [`crate::Error::Precondition`] if no section has that name, or if content
/// removal would delete header bytes or raw data shared with another section. Returns an
/// error if the raw data range lies outside the buffer.
pub fn remove_section(
    buffer: &mut RawBuffer,
    headers: &Headers,
    sections: &[Section],
    name: &str,
    remove_content: bool,
) -> Result<Section> {
    let Some(removed) = sections.iter().find(|section| section.name_str() == name) else {
        return Err(precondition_error!("No section named '{}'", name));
    };
    let removed = removed.clone();

    let mut remaining: Vec<Section> = sections
        .iter()
        .filter(|section| section.index != removed.index)
        .cloned()
        .collect();

    let shift = if remove_content && removed.size_of_raw_data != 0 {
        check_removable_content(buffer, headers, &removed, &remaining)?;

        let start = removed.pointer_to_raw_data;
        buffer.delete_range(start as usize, removed.size_of_raw_data as usize)?;
        for section in &mut remaining {
            if section.pointer_to_raw_data > start {
                section.pointer_to_raw_data = section
                    .pointer_to_raw_data
                    .checked_sub(removed.size_of_raw_data)
                    .ok_or_else(|| {
                        malformed_error!(
                            "Section '{}' raw data moves below offset 0",
                            section.name_str()
                        )
                    })?;
            }
        }
        removed.size_of_raw_data
    } else {
        0
    };

    for index in 0..remaining.len().saturating_sub(1) {
        let next = remaining[index + 1].virtual_address;
        let section = &mut remaining[index];
        if section.virtual_address >= removed.virtual_address || next <= section.virtual_address {
            continue;
        }

        let gap = next - section.virtual_address;
        if section.virtual_size != gap {
            log::debug!(
                "Resizing section '{}' from 0x{:X} to 0x{:X} bytes after removing '{}'",
                section.name_str(),
                section.virtual_size,
                gap,
                name
            );
            section.virtual_size = gap;
        }
    }

    for kind in DataDirectoryType::iter() {
        let Some(directory) = headers.optional.data_directory(buffer, kind)? else {
            continue;
        };

        let address = directory.virtual_address(buffer)?;
        if kind == DataDirectoryType::Security {
            if shift != 0 && address > removed.pointer_to_raw_data {
                let moved = address.checked_sub(shift).ok_or_else(|| {
                    malformed_error!("Certificate table at 0x{:X} overlaps removed data", address)
                })?;
                directory.set_virtual_address(buffer, moved)?;
            }
            continue;
        }

        if address == removed.virtual_address && directory.size(buffer)? == removed.virtual_size
        {
            log::debug!(
                "Clearing the {:?} directory, it described section '{}'",
                kind,
                name
            );
            directory.clear(buffer)?;
        }
    }

    let alignment = headers.optional.section_alignment(buffer)?;
    let remaining_extent = remaining
        .iter()
        .map(Section::virtual_extent)
        .max()
        .unwrap_or(0);
    if removed.virtual_extent() >= remaining_extent {
        let size_of_image = headers.optional.size_of_image(buffer)?;
        let floor = u32::try_from(remaining_extent)
            .map_err(|_| malformed_error!("Section table extends past the 32-bit address space"))
            .and_then(|extent| align_up(extent, alignment))?;
        let reduced = size_of_image
            .saturating_sub(align_up(removed.virtual_span(), alignment)?)
            .max(floor);
        headers.optional.set_size_of_image(buffer, reduced)?;
    }

    let table = headers.section_table_offset();
    buffer.fill(table, sections.len() * SECTION_HEADER_SIZE, 0)?;
    for (index, section) in remaining.iter_mut().enumerate() {
        section.index = index;
        section.header_offset = table + index * SECTION_HEADER_SIZE;
        section.header().write(buffer, section)?;
    }

    let count = u16::try_from(remaining.len())
        .map_err(|_| malformed_error!("Section count {} exceeds u16", remaining.len()))?;
    headers.file.set_number_of_sections(buffer, count)?;

    log::debug!(
        "Removed section '{}' (RVA 0x{:X}, {} raw bytes{})",
        name,
        removed.virtual_address,
        removed.size_of_raw_data,
        if shift != 0 { ", content deleted" } else { "" }
    );

    Ok(removed)
}

/// Deleting `removed`'s raw bytes must not touch the headers or another section's data.
fn check_removable_content(
    buffer: &RawBuffer,
    headers: &Headers,
    removed: &Section,
    remaining: &[Section],
) -> Result<()> {
    let start = u64::from(removed.pointer_to_raw_data);
    let end = start + u64::from(removed.size_of_raw_data);

    let size_of_headers = u64::from(headers.optional.size_of_headers(buffer)?);
    let table_end = headers.section_table_end(buffer)? as u64;
    let header_end = size_of_headers.max(table_end);
    if start < header_end {
        return Err(precondition_error!(
            "Raw data of '{}' at 0x{:X} lies inside the headers ending at 0x{:X}",
            removed.name_str(),
            start,
            header_end
        ));
    }

    for other in remaining {
        if other.size_of_raw_data == 0 {
            continue;
        }
        let other_start = u64::from(other.pointer_to_raw_data);
        let other_end = other_start + u64::from(other.size_of_raw_data);
        if other_start < end && start < other_end {
            return Err(precondition_error!(
                "Raw data of '{}' overlaps '{}'",
                removed.name_str(),
                other.name_str()
            ));
        }
    }
    Ok(())
}
