//! Result of a best-effort parse.

use crate::{file::headers::DataDirectoryType, Error, PeFile};

/// A data directory that failed to decode while the rest of the image parsed.
#[derive(Debug)]
pub struct DirectoryFailure {
    /// The directory slot that failed
    pub directory: DataDirectoryType,
    /// Why it failed
    pub error: Error,
}

/// Verdict of [`crate::PeFile::try_parse`].
#[derive(Debug)]
pub enum ParseOutcome {
    /// Headers, section table and every present directory decoded
    Parsed(PeFile),
    /// Headers and section table decoded, some directories did not
    Partial {
        /// The usable image
        file: PeFile,
        /// One entry per directory that failed
        failures: Vec<DirectoryFailure>,
    },
    /// The header chain itself is invalid
    Invalid(Error),
}

impl ParseOutcome {
    /// Returns `true` unless the header chain was invalid.
    #[must_use]
    pub fn is_parseable(&self) -> bool {
        !matches!(self, ParseOutcome::Invalid(_))
    }

    /// Returns `true` only if every present directory decoded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }

    /// The parsed file, if any, discarding failure details.
    #[must_use]
    pub fn into_file(self) -> Option<PeFile> {
        match self {
            ParseOutcome::Parsed(file) | ParseOutcome::Partial { file, .. } => Some(file),
            ParseOutcome::Invalid(_) => None,
        }
    }

    /// Directory failures; empty for [`ParseOutcome::Parsed`] and [`ParseOutcome::Invalid`].
    #[must_use]
    pub fn failures(&self) -> &[DirectoryFailure] {
        match self {
            ParseOutcome::Partial { failures, .. } => failures,
            _ => &[],
        }
    }
}
