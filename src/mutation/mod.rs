//! Structural edits: adding and removing sections, injecting imports.
//!
//! Each edit has non-local effects. Removing raw data shifts every later section, growing
//! the image changes `SizeOfImage`, and moving the import table repoints a data directory.
//! The functions here receive the buffer, the header handles and the section table
//! decoded before the edit, validate every precondition, and then write.
//!
//! They are meant to run inside [`crate::file::RawBuffer::transactional`], which is how
//! [`crate::PeFile`] calls them. A failure halfway through then leaves the image exactly
//! as it was.

mod imports;
mod sections;

pub use imports::{add_imports, ImportLayout, ImportRequest, ModuleLayout};
pub use sections::{add_section, remove_section};
