//! Alignment and width-conversion helpers shared by the header parser and the mutator.

use crate::Result;

/// Converts a `usize` to `u32` for PE serialization, returning an error if the value
/// exceeds `u32::MAX`. Every RVA, raw pointer and size in a PE image is 32 bits wide.
///
/// # Errors
///
/// Returns an error if `value` exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| malformed_error!("PE serialization value {} exceeds u32::MAX", value))
}

/// Rounds `value` up to the next multiple of `alignment`.
///
/// An alignment of zero leaves the value unchanged, which matches how the loader treats a
/// missing `SectionAlignment`.
///
/// # Errors
///
/// Returns an error if the aligned value does not fit into `u32`.
///
/// # Examples
///
/// ```rust,ignore
/// use pescope::utils::align_up;
///
/// assert_eq!(align_up(0x1001, 0x1000)?, 0x2000);
/// assert_eq!(align_up(0x2000, 0x1000)?, 0x2000);
/// assert_eq!(align_up(0x10, 0)?, 0x10);
/// # Ok::<(), pescope::Error>(())
/// ```
pub fn align_up(value: u32, alignment: u32) -> Result<u32> {
    if alignment <= 1 {
        return Ok(value);
    }

    let aligned = u64::from(value).div_ceil(u64::from(alignment)) * u64::from(alignment);
    u32::try_from(aligned).map_err(|_| {
        malformed_error!(
            "Aligning 0x{:X} to 0x{:X} overflows the 32-bit address space",
            value,
            alignment
        )
    })
}

/// Rounds a `usize` up to the next multiple of `alignment` (no-op for 0 or 1).
#[must_use]
pub fn align_up_usize(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}
