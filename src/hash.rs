//! Digests over the image bytes and its import list.
//!
//! Only the raw digest algorithms live here. Authenticode hashing, which skips the
//! checksum and the certificate table, and SHA-256 are left to the caller.

use std::fmt::Write;

use md5::{Digest, Md5};
use sha1::Sha1;

use crate::directories::imports::{ImportName, ImportedFunction};

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// Lowercase hex MD5 of `data`.
#[must_use]
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    to_hex(&hasher.finalize())
}

/// Lowercase hex SHA-1 of `data`.
#[must_use]
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    to_hex(&hasher.finalize())
}

/// Module name as it appears in an import hash: lowercase, without a library extension.
fn module_stem(dll: &str) -> String {
    let lower = dll.to_ascii_lowercase();
    [".dll", ".ocx", ".sys"]
        .iter()
        .find_map(|ext| lower.strip_suffix(ext))
        .map_or_else(|| lower.clone(), str::to_string)
}

/// Import hash: MD5 of `module.function` pairs joined by commas, in import order.
///
/// Ordinal imports contribute `ordN`. Returns `None` for an empty import list.
#[must_use]
pub fn imphash(imports: &[ImportedFunction]) -> Option<String> {
    if imports.is_empty() {
        return None;
    }

    let list = imports
        .iter()
        .map(|function| {
            let symbol = match &function.import {
                ImportName::Name { name, .. } => name.to_ascii_lowercase(),
                ImportName::Ordinal(ordinal) => format!("ord{ordinal}"),
            };
            format!("{}.{}", module_stem(&function.dll), symbol)
        })
        .collect::<Vec<_>>()
        .join(",");

    Some(md5_hex(list.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(dll: &str, import: ImportName) -> ImportedFunction {
        ImportedFunction {
            dll: dll.to_string(),
            import,
            thunk_rva: 0,
            iat_rva: 0,
            thunk_value: 0,
        }
    }

    #[test]
    fn known_digests() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            sha1_hex(b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn stems() {
        assert_eq!(module_stem("KERNEL32.DLL"), "kernel32");
        assert_eq!(module_stem("comctl.ocx"), "comctl");
        assert_eq!(module_stem("ntoskrnl.sys"), "ntoskrnl");
        assert_eq!(module_stem("msvcrt.drv"), "msvcrt.drv");
        assert_eq!(module_stem("noext"), "noext");
    }

    #[test]
    fn imphash_list() {
        let imports = [
            import(
                "KERNEL32.dll",
                ImportName::Name {
                    hint: 0,
                    name: "ExitProcess".to_string(),
                },
            ),
            import("ws2_32.dll", ImportName::Ordinal(115)),
        ];

        assert_eq!(
            imphash(&imports),
            Some(md5_hex(b"kernel32.exitprocess,ws2_32.ord115"))
        );
        assert_eq!(imphash(&[]), None);
    }
}
