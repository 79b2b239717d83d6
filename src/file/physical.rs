//! Memory-mapped source for images loaded from disk.
//!
//! [`crate::file::physical::Physical`] maps a file read-only and exposes it through the
//! [`crate::file::Backend`] trait. [`crate::PeFile::from_file`] uses it as the initial source
//! and then copies the mapped bytes into an owned [`crate::file::RawBuffer`], because every
//! structural edit needs a growable store.
//!
//! # Examples
//!
//! ```rust,ignore
//! use pescope::file::{Backend, Physical};
//! use std::path::Path;
//!
//! let physical = Physical::new(Path::new("app.exe"))?;
//! let len = physical.len();
//! let owned = Box::new(physical).into_data();
//! assert_eq!(owned.len(), len);
//! # Ok::<(), pescope::Error>(())
//! ```

use super::Backend;
use crate::{
    Error::{Error, FileError},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A read-only, memory-mapped view of a file on disk.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Map the file at `path` read-only.
    ///
    /// # Arguments
    /// * `path` - Path to the image on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        Self::from_std_file(&file)
    }

    /// Map an already opened file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Error`] if memory mapping fails.
    pub fn from_std_file(file: &fs::File) -> Result<Physical> {
        // The file must not be truncated by another process while mapped
        let mmap = unsafe { Mmap::map(file) }.map_err(|error| Error(error.to_string()))?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn into_data(self: Box<Self>) -> Vec<u8> {
        self.data.as_ref().to_vec()
    }
}
