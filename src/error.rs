use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

macro_rules! precondition_error {
    ($msg:expr) => {
        crate::Error::Precondition($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Precondition(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into four groups that callers usually treat differently:
///
/// ## Fatal parse errors
/// - [`Error::Malformed`] - Bad magic, truncated header region or an inconsistent field
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::NotSupported`] - A structure this library does not decode for the image's machine
///
/// ## Address translation
/// - [`Error::NotMapped`] - An RVA that no section covers
/// - [`Error::OffsetNotMapped`] - A file offset that no section's raw data covers
///
/// Higher layers usually read these as "directory absent" while parsing, but a mutation
/// that needs the mapping fails with them.
///
/// ## Mutation
/// - [`Error::Precondition`] - A structural edit was rejected before any byte was written
///
/// ## Internal consistency
/// - [`Error::OutOfBounds`] - A buffer access outside the current length. While parsing
///   this means truncated input, during a mutation it indicates an offset arithmetic bug.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, PeFile};
/// use std::path::Path;
///
/// match PeFile::from_file(Path::new("app.exe")) {
///     Ok(pe) => println!("{} sections", pe.sections()?.len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted on the underlying buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The relative virtual address is not covered by any section.
    #[error("RVA 0x{address:X} is not mapped by any section")]
    NotMapped {
        /// The RVA that could not be translated
        address: u64,
    },

    /// The file offset does not fall inside the raw data of any section.
    #[error("File offset 0x{offset:X} is not mapped by any section")]
    OffsetNotMapped {
        /// The offset that could not be translated
        offset: usize,
    },

    /// A structural edit was rejected because one of its preconditions does not hold.
    ///
    /// The buffer is left byte-for-byte unchanged when this error is returned.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// This structure is not supported for the current image.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to lock a memoised view.
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` for the address-not-mapped kinds, which parsers treat as "absent".
    #[must_use]
    pub fn is_not_mapped(&self) -> bool {
        matches!(self, Error::NotMapped { .. } | Error::OffsetNotMapped { .. })
    }
}
