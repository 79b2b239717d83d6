//! Attribute certificate table.
//!
//! Unlike every other directory, the address stored in the security slot is a file
//! offset. The table is not mapped into memory and the section table is not consulted.
//! Each `WIN_CERTIFICATE` entry starts on an 8-byte boundary; the certificate bytes are
//! handed out verbatim.

use crate::{file::RawBuffer, Result};

const WIN_CERTIFICATE_HEADER_SIZE: usize = 8;

/// `WIN_CERT_TYPE_PKCS_SIGNED_DATA`, an Authenticode signature
pub const WIN_CERT_TYPE_PKCS_SIGNED_DATA: u16 = 0x0002;

/// One `WIN_CERTIFICATE` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinCertificate {
    /// File offset of the entry
    pub offset: usize,
    /// `dwLength`, header included
    pub length: u32,
    /// `wRevision`
    pub revision: u16,
    /// `wCertificateType`
    pub certificate_type: u16,
    /// Certificate bytes, header excluded
    pub data: Vec<u8>,
}

impl WinCertificate {
    /// Returns `true` for PKCS#7 Authenticode signatures.
    #[must_use]
    pub fn is_authenticode(&self) -> bool {
        self.certificate_type == WIN_CERT_TYPE_PKCS_SIGNED_DATA
    }
}

/// Decode the certificate table at file offset `offset` spanning `size` bytes.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the table does not fit in the buffer, or
/// [`crate::Error::Malformed`] if an entry's length is smaller than its header or
/// overruns the table.
pub fn parse(buffer: &RawBuffer, offset: u32, size: u32) -> Result<Vec<WinCertificate>> {
    let start = offset as usize;
    let table = buffer.read_bytes(start, size as usize)?;
    let mut certificates = Vec::new();
    let mut position = 0_usize;

    while table.len() - position >= WIN_CERTIFICATE_HEADER_SIZE {
        let mut parser = crate::Parser::at(table, position)?;
        let length = parser.read_le::<u32>()?;
        let revision = parser.read_le::<u16>()?;
        let certificate_type = parser.read_le::<u16>()?;

        let entry_len = length as usize;
        if entry_len < WIN_CERTIFICATE_HEADER_SIZE || entry_len > table.len() - position {
            return Err(malformed_error!(
                "Certificate at offset 0x{:X} has invalid length {}",
                start + position,
                length
            ));
        }

        certificates.push(WinCertificate {
            offset: start + position,
            length,
            revision,
            certificate_type,
            data: parser
                .read_bytes(entry_len - WIN_CERTIFICATE_HEADER_SIZE)?
                .to_vec(),
        });

        position += (entry_len + 7) & !7;
    }

    Ok(certificates)
}
