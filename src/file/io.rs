//! Little-endian codec primitives for PE structures.
//!
//! Every multi-byte field in a PE image is little-endian. The [`crate::file::io::PeIO`] trait
//! ties each fixed-width integer type to its byte array representation, and the free functions
//! in this module perform bounds-checked reads and writes against plain slices. The
//! [`crate::file::buffer::RawBuffer`] and [`crate::file::parser::Parser`] types are built on
//! top of these helpers, so this is the single place where slice indexing for typed values
//! happens.
//!
//! # Examples
//!
//! ```rust,ignore
//! use pescope::file::io::{read_le_at, write_le_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_le_at::<u16>(&mut data, &mut offset, 0x5A4D)?;
//! write_le_at::<u32>(&mut data, &mut offset, 0x80)?;
//!
//! let mut offset = 0;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 0x5A4D);
//! assert_eq!(read_le_at::<u32>(&data, &mut offset)?, 0x80);
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for fixed-width values that can be decoded from and encoded to little-endian bytes.
///
/// The associated `Bytes` type is the fixed-size array for that type (e.g. `[u8; 4]` for
/// `u32`). Implemented for the unsigned and signed integers used by PE headers.
pub trait PeIO: Sized + Copy {
    /// Byte array representation of this type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode T from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encode T to little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_pe_io {
    ($($ty:ty),*) => {
        $(
            impl PeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_pe_io!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: PeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` at `offset` and advances the offset past it.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Safely writes `value` in little-endian byte order to the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn write_le<T: PeIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_le_at(data, &mut offset, value)
}

/// Safely writes `value` at `offset` and advances the offset past it.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn write_le_at<T: PeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(value.to_le_bytes().as_ref());
    *offset = end;

    Ok(())
}

/// Reads either a 4-byte or an 8-byte pointer-sized value, widened to `u64`.
///
/// PE32 images use 32-bit thunks and VA fields, PE32+ images use 64-bit ones.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at_ptr(data: &[u8], offset: &mut usize, is_64: bool) -> Result<u64> {
    if is_64 {
        read_le_at::<u64>(data, offset)
    } else {
        Ok(u64::from(read_le_at::<u32>(data, offset)?))
    }
}

/// Writes either a 4-byte or an 8-byte pointer-sized value.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes, or a
/// malformed error if a 32-bit slot cannot hold `value`.
pub fn write_le_at_ptr(data: &mut [u8], offset: &mut usize, value: u64, is_64: bool) -> Result<()> {
    if is_64 {
        write_le_at::<u64>(data, offset, value)
    } else {
        let narrow = u32::try_from(value)
            .map_err(|_| malformed_error!("Value 0x{:X} does not fit a 32-bit slot", value))?;
        write_le_at::<u32>(data, offset, narrow)
    }
}
