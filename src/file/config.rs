//! Parsing limits and mutation defaults.
//!
//! Every directory walk in this crate is driven by counts or terminators stored in the
//! image itself. [`PeConfig`] caps those walks so hostile input cannot make a parser loop
//! or allocate without bound, and carries the defaults used when a mutation creates a new
//! section.

use crate::file::characteristics::SectionCharacteristics;

/// Limits and defaults for parsing and mutating an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeConfig {
    /// Maximum number of import descriptors decoded before the walk is rejected
    pub max_import_descriptors: usize,

    /// Maximum number of thunks followed per import or delay-import descriptor
    pub max_thunks_per_descriptor: usize,

    /// Maximum `NumberOfFunctions` accepted in the export directory
    pub max_exports: usize,

    /// Maximum number of base relocation blocks
    pub max_relocation_blocks: usize,

    /// Maximum number of debug directory entries
    pub max_debug_entries: usize,

    /// Maximum number of x64 runtime function entries
    pub max_runtime_functions: usize,

    /// Maximum number of TLS callbacks followed
    pub max_tls_callbacks: usize,

    /// Maximum number of entries decoded in the root resource directory
    pub max_resource_entries: usize,

    /// Maximum length of any NUL-terminated name (terminator excluded)
    pub max_string_length: usize,

    /// Map RVAs below `SizeOfHeaders` onto the identical file offset when no section
    /// covers them
    pub header_region_fallback: bool,

    /// Name of the section created to hold a rebuilt import table
    pub import_section_name: &'static str,

    /// Characteristics of the section created to hold a rebuilt import table
    pub import_section_characteristics: SectionCharacteristics,
}

impl Default for PeConfig {
    fn default() -> Self {
        Self {
            max_import_descriptors: 4096,
            max_thunks_per_descriptor: 65_536,
            max_exports: 65_536,
            max_relocation_blocks: 65_536,
            max_debug_entries: 64,
            max_runtime_functions: 1_048_576,
            max_tls_callbacks: 1024,
            max_resource_entries: 4096,
            max_string_length: 4096,
            header_region_fallback: true,
            import_section_name: ".pimp",
            import_section_characteristics: SectionCharacteristics::DATA_RW,
        }
    }
}

impl PeConfig {
    /// Tight limits and no header-region fallback.
    ///
    /// Intended for untrusted input where anything out of the ordinary should surface as
    /// a directory failure.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_import_descriptors: 1024,
            max_thunks_per_descriptor: 16_384,
            max_exports: 16_384,
            max_relocation_blocks: 16_384,
            max_debug_entries: 32,
            max_runtime_functions: 262_144,
            max_tls_callbacks: 256,
            max_resource_entries: 1024,
            max_string_length: 512,
            header_region_fallback: false,
            ..Self::default()
        }
    }

    /// Raised limits for very large images.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_import_descriptors: 65_536,
            max_thunks_per_descriptor: 1_048_576,
            max_exports: 1_048_576,
            max_relocation_blocks: 1_048_576,
            max_debug_entries: 1024,
            max_runtime_functions: 16_777_216,
            max_tls_callbacks: 65_536,
            max_resource_entries: 65_536,
            max_string_length: 65_536,
            header_region_fallback: true,
            ..Self::default()
        }
    }
}
