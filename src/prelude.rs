//! # pescope Prelude
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//!
//! let pe = PeFile::from_file("tests/samples/app.exe".as_ref())?;
//! if let Some(text) = pe.section_by_name(".text")? {
//!     assert!(text.flags().contains(SectionCharacteristics::MEM_EXECUTE));
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

// Core
pub use crate::{Error, Result};

pub use crate::{is_pe_file, DirectoryFailure, ParseOutcome, PeConfig, PeFile};

// Low-level access
pub use crate::{file::io::PeIO, Parser, RawBuffer};

// Headers
pub use crate::file::headers::{
    DataDirectory, DataDirectoryType, DosHeader, FileHeader, Headers, OptionalHeader, Section,
    SectionHeader,
};

pub use crate::file::{FileCharacteristics, SectionCharacteristics};

// Directories
pub use crate::directories::{
    clr::Cor20Header,
    debug::{CodeViewPdb70, DebugDirectoryEntry, DebugType},
    exception::{RuntimeFunction, UnwindInfo},
    exports::{ExportDirectory, ExportedFunction},
    imports::{ImportDescriptor, ImportName, ImportedFunction},
    relocations::{RelocationBlock, RelocationEntry, RelocationType},
    resources::ResourceDirectory,
    security::WinCertificate,
    tls::TlsDirectory,
};

// Edits
pub use crate::mutation::{ImportLayout, ImportRequest};
