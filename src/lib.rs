// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory
#![allow(clippy::too_many_arguments)]

//! # pescope
//!
//! Parse and structurally edit Windows Portable Executable (PE32 and PE32+) images.
//!
//! The whole image lives in one mutable byte buffer. Header accessors read and write
//! straight through to that buffer, and every derived view (section table, imports,
//! exports, relocations and the rest) is decoded on demand and memoised against the
//! buffer's generation counter, so a view never outlives the bytes it was decoded from.
//!
//! ## Features
//!
//! - **Header access** - DOS, COFF and optional headers, data directories, section table
//! - **Address translation** - RVA, VA and file offset conversion over the section table
//! - **Data directories** - imports, exports, relocations, resources, TLS, load config,
//!   bound and delay imports, debug (CodeView), exception (x64 unwind), certificates, CLR
//! - **Structural edits** - add or remove a section, inject new imports, each either fully
//!   applied or not applied at all
//! - **Hashing** - MD5 and SHA-1 of the image, import hash
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//!
//! let mut pe = PeFile::from_file("tests/samples/app.exe".as_ref())?;
//! for section in pe.sections()?.iter() {
//!     println!("{:<8} va=0x{:08X} raw=0x{:X}", section.name_str(), section.virtual_address, section.size_of_raw_data);
//! }
//!
//! pe.add_imports(&[ImportRequest::new("ws2_32.dll", ["WSAStartup", "socket"])])?;
//! std::fs::write("app.patched.exe", pe.data())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Damaged images
//!
//! [`PeFile::from_mem`] only requires valid headers. [`PeFile::try_parse`] additionally
//! decodes every directory and reports the ones that failed instead of giving up:
//!
//! ```rust,no_run
//! use pescope::{ParseOutcome, PeFile};
//!
//! let data = std::fs::read("tests/samples/damaged.exe")?;
//! match PeFile::try_parse(data) {
//!     ParseOutcome::Parsed(pe) => println!("{} sections", pe.sections()?.len()),
//!     ParseOutcome::Partial { failures, .. } => {
//!         for failure in failures {
//!             println!("{:?}: {}", failure.directory, failure.error);
//!         }
//!     }
//!     ParseOutcome::Invalid(error) => println!("not a PE image: {error}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

pub(crate) mod utils;

/// Shared fixtures for unit tests
#[cfg(test)]
pub(crate) mod test;

pub mod file;

pub mod directories;

pub mod mutation;

pub mod hash;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust,no_run
/// use pescope::prelude::*;
///
/// let pe = PeFile::from_file("tests/samples/app.exe".as_ref())?;
/// println!("entry point 0x{:X}", pe.entry_point()?);
/// # Ok::<(), pescope::Error>(())
/// ```
pub mod prelude;

/// `pescope` Result type
pub type Result<T> = std::result::Result<T, Error>;

/// `pescope` Error type
///
/// ```rust,no_run
/// use pescope::{Error, PeFile};
///
/// match PeFile::from_file(std::path::Path::new("tests/samples/crafted.exe")) {
///     Ok(pe) => println!("{} bytes", pe.len()),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Main entry point, see [`file::PeFile`].
pub use file::{is_pe_file, PeFile};

/// Bounds-checked little-endian reader over a byte slice.
pub use file::parser::Parser;

pub use file::{DirectoryFailure, ParseOutcome, PeConfig, RawBuffer};

pub use mutation::ImportRequest;
