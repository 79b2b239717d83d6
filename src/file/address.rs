//! Translation between relative virtual addresses and file offsets.
//!
//! Both directions scan the section table linearly and pick the first section whose range
//! contains the address. The table is passed in on every call, since a structural edit can
//! change it between two translations.
//!
//! A section's virtual range is `[VirtualAddress, VirtualAddress + max(VirtualSize,
//! SizeOfRawData))` and its file range is `[PointerToRawData, PointerToRawData +
//! SizeOfRawData)`. Using the larger of the two sizes for the virtual range keeps every
//! offset inside a section's raw data translatable in both directions, even when a linker
//! left `VirtualSize` at zero.

use crate::{file::headers::Section, Error, Result};

/// Translate an RVA into a file offset.
///
/// # Errors
/// Returns [`crate::Error::NotMapped`] if no section's virtual range contains `rva`.
pub fn rva_to_offset(rva: u32, sections: &[Section]) -> Result<usize> {
    let rva_wide = u64::from(rva);
    for section in sections {
        if section.contains_rva(rva_wide) {
            return Ok(section.pointer_to_raw_data as usize
                + (rva - section.virtual_address) as usize);
        }
    }

    Err(Error::NotMapped {
        address: rva_wide,
    })
}

/// Translate a file offset into an RVA.
///
/// # Errors
/// Returns [`crate::Error::OffsetNotMapped`] if no section's raw data contains `offset`.
pub fn offset_to_rva(offset: usize, sections: &[Section]) -> Result<u32> {
    for section in sections {
        if section.contains_offset(offset) {
            let delta = offset - section.pointer_to_raw_data as usize;
            return u32::try_from(delta)
                .ok()
                .and_then(|delta| section.virtual_address.checked_add(delta))
                .ok_or(Error::OffsetNotMapped { offset });
        }
    }

    Err(Error::OffsetNotMapped { offset })
}

/// Translate an RVA into a file offset, mapping the header region onto itself.
///
/// RVAs below `size_of_headers` that no section covers address the headers, which the
/// loader maps at the same offset. Bound import tables live there.
///
/// # Errors
/// Returns [`crate::Error::NotMapped`] if neither a section nor the header region
/// contains `rva`.
pub fn rva_to_offset_with_headers(
    rva: u32,
    sections: &[Section],
    size_of_headers: u32,
) -> Result<usize> {
    match rva_to_offset(rva, sections) {
        Err(error) if error.is_not_mapped() && rva < size_of_headers => {
            log::trace!("RVA 0x{:X} resolved inside the header region", rva);
            Ok(rva as usize)
        }
        result => result,
    }
}

/// Convert a virtual address into an RVA by subtracting the image base.
///
/// # Errors
/// Returns [`crate::Error::NotMapped`] if `va` is below the image base or the difference
/// does not fit 32 bits.
pub fn va_to_rva(va: u64, image_base: u64) -> Result<u32> {
    va.checked_sub(image_base)
        .and_then(|rva| u32::try_from(rva).ok())
        .ok_or(Error::NotMapped { address: va })
}

/// Find the section whose virtual range contains `rva`.
#[must_use]
pub fn section_for_rva(rva: u32, sections: &[Section]) -> Option<&Section> {
    sections
        .iter()
        .find(|section| section.contains_rva(u64::from(rva)))
}
