//! Thread local storage directory.
//!
//! All address fields of `IMAGE_TLS_DIRECTORY` are virtual addresses, pointer sized.

use crate::{directories::DirectoryContext, Result};

/// Decoded `IMAGE_TLS_DIRECTORY32` / `IMAGE_TLS_DIRECTORY64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsDirectory {
    /// VA of the start of the TLS template
    pub start_address_of_raw_data: u64,
    /// VA of the end of the TLS template
    pub end_address_of_raw_data: u64,
    /// VA of the slot that receives the TLS index
    pub address_of_index: u64,
    /// VA of the zero-terminated callback array
    pub address_of_callbacks: u64,
    /// Bytes of zero fill after the template
    pub size_of_zero_fill: u32,
    /// Alignment characteristics
    pub characteristics: u32,
    /// Callback RVAs, in array order
    pub callbacks: Vec<u32>,
}

impl TlsDirectory {
    /// Decode the TLS directory at `rva`.
    ///
    /// # Errors
    /// Returns an error if the directory or the callback array cannot be read, or the
    /// array exceeds the configured limit.
    pub fn parse(ctx: &DirectoryContext<'_>, rva: u32) -> Result<TlsDirectory> {
        let mut parser = ctx.parser_at_rva(rva)?;

        let start_address_of_raw_data = parser.read_ptr(ctx.is_64)?;
        let end_address_of_raw_data = parser.read_ptr(ctx.is_64)?;
        let address_of_index = parser.read_ptr(ctx.is_64)?;
        let address_of_callbacks = parser.read_ptr(ctx.is_64)?;
        let size_of_zero_fill = parser.read_le::<u32>()?;
        let characteristics = parser.read_le::<u32>()?;

        let mut callbacks = Vec::new();
        if address_of_callbacks != 0 {
            let mut array = ctx.parser_at_rva(ctx.va_to_rva(address_of_callbacks)?)?;
            loop {
                let callback = array.read_ptr(ctx.is_64)?;
                if callback == 0 {
                    break;
                }
                if callbacks.len() >= ctx.config.max_tls_callbacks {
                    return Err(malformed_error!(
                        "TLS callback array exceeds {} entries",
                        ctx.config.max_tls_callbacks
                    ));
                }
                callbacks.push(ctx.va_to_rva(callback)?);
            }
        }

        Ok(TlsDirectory {
            start_address_of_raw_data,
            end_address_of_raw_data,
            address_of_index,
            address_of_callbacks,
            size_of_zero_fill,
            characteristics,
            callbacks,
        })
    }
}
