//! PE image facade and the low-level building blocks it is made of.
//!
//! [`PeFile`] owns the image bytes in a [`RawBuffer`] and exposes everything else as views
//! over it: live header handles, a memoised section table, and memoised decoders for the
//! data directories. The three structural edits ([`PeFile::add_section`],
//! [`PeFile::remove_section`], [`PeFile::add_imports`]) run through the same buffer, so
//! every memoised view recomputes after an edit.
//!
//! # Key Components
//!
//! - [`crate::file::buffer::RawBuffer`] - owned, bounds-checked byte store with a generation counter
//! - [`crate::file::headers`] - DOS, file, optional and section header handles
//! - [`crate::file::address`] - RVA and file offset translation
//! - [`crate::file::cache::Memo`] - generation-keyed memoisation
//! - [`crate::file::physical::Physical`] - memory-mapped source for [`PeFile::from_file`]
//! - [`crate::file::Backend`] - trait over initial byte sources
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::PeFile;
//! use std::path::Path;
//!
//! let file = PeFile::from_file(Path::new("app.exe"))?;
//! println!("Image base: 0x{:x}", file.image_base()?);
//! for section in file.sections()?.iter() {
//!     println!("{:8} RVA 0x{:08x}", section.name_str(), section.virtual_address);
//! }
//! for function in file.imports()?.iter() {
//!     println!("{} {:?}", function.dll, function.import);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Memoised views sit behind `RwLock`s, so a `&PeFile` can be shared across threads for
//! reading. Edits take `&mut self`.

pub mod address;
pub mod buffer;
pub mod cache;
pub mod characteristics;
pub mod config;
pub mod headers;
pub mod io;
pub mod outcome;
pub mod parser;
pub mod physical;

use std::{fmt, path::Path, sync::Arc};

pub use buffer::RawBuffer;
pub use characteristics::{FileCharacteristics, SectionCharacteristics};
pub use config::PeConfig;
pub use outcome::{DirectoryFailure, ParseOutcome};
pub use physical::Physical;

use crate::{
    directories::{
        boundimport::{self, BoundImportDescriptor},
        clr::Cor20Header,
        debug::{self, DebugDirectoryEntry},
        delayimport::{self, DelayImportDescriptor},
        exception::{self, RuntimeFunction},
        exports::ExportDirectory,
        imports::{self, ImportDescriptor, ImportedFunction},
        loadconfig::LoadConfigDirectory,
        relocations::{self, RelocationBlock},
        resources::ResourceDirectory,
        security::{self, WinCertificate},
        tls::TlsDirectory,
        DirectoryContext,
    },
    file::{
        cache::Memo,
        headers::{DataDirectory, DataDirectoryType, Headers, Section},
        io::PeIO,
    },
    hash,
    mutation::{self, ImportRequest},
    Error, Result,
};

/// Source of the initial image bytes.
///
/// Implemented by the memory-mapped [`Physical`] source and by [`RawBuffer`] itself. The
/// facade consumes a backend once through [`Backend::into_data`]; every later access goes
/// through the owned buffer.
pub trait Backend: Send + Sync {
    /// Returns the length of the data.
    fn len(&self) -> usize;

    /// Consume the source and return an owned copy of its bytes.
    fn into_data(self: Box<Self>) -> Vec<u8>;
}

/// Returns `true` if `data` starts with the `MZ` DOS signature.
///
/// This is only a cheap sniff: a buffer consisting of nothing but `MZ` qualifies, while
/// [`PeFile::try_parse`] decides whether the image is actually parseable.
#[must_use]
pub fn is_pe_file(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == b'M' && data[1] == b'Z'
}

/// A parsed PE image that can be inspected and structurally edited.
///
/// Header handles are validated once at construction. The section table and all data
/// directories are decoded lazily and memoised against the buffer generation; a failure
/// in one directory never affects another.
pub struct PeFile {
    buffer: RawBuffer,
    headers: Headers,
    config: PeConfig,
    sections: Memo<Vec<Section>>,
    import_descriptors: Memo<Vec<ImportDescriptor>>,
    imports: Memo<Vec<ImportedFunction>>,
    exports: Memo<Option<Arc<ExportDirectory>>>,
    relocations: Memo<Vec<RelocationBlock>>,
    resources: Memo<Option<Arc<ResourceDirectory>>>,
    tls: Memo<Option<Arc<TlsDirectory>>>,
    load_config: Memo<Option<Arc<LoadConfigDirectory>>>,
    bound_imports: Memo<Vec<BoundImportDescriptor>>,
    delay_imports: Memo<Vec<DelayImportDescriptor>>,
    debug: Memo<Vec<DebugDirectoryEntry>>,
    exceptions: Memo<Vec<RuntimeFunction>>,
    certificates: Memo<Vec<WinCertificate>>,
    clr: Memo<Option<Arc<Cor20Header>>>,
}

impl PeFile {
    /// Parse an image held in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer or [`crate::Error::Malformed`]
    /// if the header chain is invalid.
    pub fn from_mem(data: Vec<u8>) -> Result<PeFile> {
        Self::from_mem_with_config(data, PeConfig::default())
    }

    /// Parse an image held in memory with custom limits.
    ///
    /// # Errors
    /// See [`PeFile::from_mem`].
    pub fn from_mem_with_config(data: Vec<u8>, config: PeConfig) -> Result<PeFile> {
        Self::load(Box::new(RawBuffer::new(data)), config)
    }

    /// Map and parse an image from disk. The bytes are copied into an owned buffer so the
    /// image can be edited.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, or any error of
    /// [`PeFile::from_mem`].
    pub fn from_file(path: &Path) -> Result<PeFile> {
        Self::from_file_with_config(path, PeConfig::default())
    }

    /// Map and parse an image from disk with custom limits.
    ///
    /// # Errors
    /// See [`PeFile::from_file`].
    pub fn from_file_with_config(path: &Path, config: PeConfig) -> Result<PeFile> {
        Self::load(Box::new(Physical::new(path)?), config)
    }

    fn load(source: Box<dyn Backend>, config: PeConfig) -> Result<PeFile> {
        if source.len() == 0 {
            return Err(Error::Empty);
        }

        let buffer = RawBuffer::new(source.into_data());
        let headers = Headers::parse(&buffer)?;

        Ok(PeFile {
            buffer,
            headers,
            config,
            sections: Memo::new(),
            import_descriptors: Memo::new(),
            imports: Memo::new(),
            exports: Memo::new(),
            relocations: Memo::new(),
            resources: Memo::new(),
            tls: Memo::new(),
            load_config: Memo::new(),
            bound_imports: Memo::new(),
            delay_imports: Memo::new(),
            debug: Memo::new(),
            exceptions: Memo::new(),
            certificates: Memo::new(),
            clr: Memo::new(),
        })
    }

    /// Parse an image and every data directory, reporting instead of failing.
    ///
    /// Header or section table problems make the image [`ParseOutcome::Invalid`]. Failures
    /// confined to individual directories yield [`ParseOutcome::Partial`] with the file and
    /// the list of failed directories. Directories the crate does not decode for the
    /// image's machine are not counted as failures.
    #[must_use]
    pub fn try_parse(data: Vec<u8>) -> ParseOutcome {
        Self::try_parse_with_config(data, PeConfig::default())
    }

    /// [`PeFile::try_parse`] with custom limits.
    #[must_use]
    pub fn try_parse_with_config(data: Vec<u8>, config: PeConfig) -> ParseOutcome {
        let file = match Self::from_mem_with_config(data, config) {
            Ok(file) => file,
            Err(error) => return ParseOutcome::Invalid(error),
        };

        if let Err(error) = file.sections() {
            return ParseOutcome::Invalid(error);
        }

        let failures = file.directory_failures();
        if failures.is_empty() {
            ParseOutcome::Parsed(file)
        } else {
            ParseOutcome::Partial { file, failures }
        }
    }

    /// Decode every present data directory and collect the ones that fail.
    #[must_use]
    pub fn directory_failures(&self) -> Vec<DirectoryFailure> {
        let mut failures = Vec::new();
        let mut record = |directory: DataDirectoryType, result: Result<()>| {
            match result {
                Ok(()) | Err(Error::NotSupported) => {}
                Err(error) => {
                    log::warn!("Failed to parse the {:?} directory: {}", directory, error);
                    failures.push(DirectoryFailure { directory, error });
                }
            }
        };

        record(DataDirectoryType::Export, self.exports().map(drop));
        record(DataDirectoryType::Import, self.imports().map(drop));
        record(DataDirectoryType::Resource, self.resources().map(drop));
        record(DataDirectoryType::Exception, self.exceptions().map(drop));
        record(DataDirectoryType::Security, self.certificates().map(drop));
        record(DataDirectoryType::BaseRelocation, self.relocations().map(drop));
        record(DataDirectoryType::Debug, self.debug().map(drop));
        record(DataDirectoryType::Tls, self.tls().map(drop));
        record(DataDirectoryType::LoadConfig, self.load_config().map(drop));
        record(DataDirectoryType::BoundImport, self.bound_imports().map(drop));
        record(DataDirectoryType::DelayImport, self.delay_imports().map(drop));
        record(DataDirectoryType::ClrRuntimeHeader, self.clr().map(drop));

        failures
    }

    /// The image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &RawBuffer {
        &self.buffer
    }

    /// Length of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if the image holds no bytes. Never the case for a parsed image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the file and return the (possibly edited) image bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_inner()
    }

    /// The parsing limits in effect.
    #[must_use]
    pub fn config(&self) -> &PeConfig {
        &self.config
    }

    /// Header handles.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns `true` for PE32+ images.
    #[must_use]
    pub fn is_pe32_plus(&self) -> bool {
        self.headers.is_64()
    }

    /// Preferred load address.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the optional header is truncated.
    pub fn image_base(&self) -> Result<u64> {
        self.headers.optional.image_base(&self.buffer)
    }

    /// RVA of the entry point.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the optional header is truncated.
    pub fn entry_point(&self) -> Result<u32> {
        self.headers.optional.address_of_entry_point(&self.buffer)
    }

    /// Decoded section table of the current buffer state.
    ///
    /// # Errors
    /// Returns an error if the section table cannot be read.
    pub fn sections(&self) -> Result<Arc<Vec<Section>>> {
        self.sections
            .get_or_try_init(self.buffer.generation(), || {
                self.headers.read_sections(&self.buffer)
            })
    }

    /// First section named `name`.
    ///
    /// # Errors
    /// Returns an error if the section table cannot be read.
    pub fn section_by_name(&self, name: &str) -> Result<Option<Section>> {
        Ok(self
            .sections()?
            .iter()
            .find(|section| section.name_str() == name)
            .cloned())
    }

    /// Section whose virtual range contains `rva`.
    ///
    /// # Errors
    /// Returns an error if the section table cannot be read.
    pub fn section_containing_rva(&self, rva: u32) -> Result<Option<Section>> {
        Ok(address::section_for_rva(rva, &self.sections()?).cloned())
    }

    /// Handle to a data directory slot, `None` if the optional header does not declare it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the optional header is truncated.
    pub fn data_directory(&self, kind: DataDirectoryType) -> Result<Option<DataDirectory>> {
        self.headers.optional.data_directory(&self.buffer, kind)
    }

    /// Translate an RVA into a file offset through the current section table.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        address::rva_to_offset(rva, &self.sections()?)
    }

    /// Translate a file offset into an RVA through the current section table.
    ///
    /// # Errors
    /// Returns [`crate::Error::OffsetNotMapped`] if no section's raw data contains `offset`.
    pub fn offset_to_rva(&self, offset: usize) -> Result<u32> {
        address::offset_to_rva(offset, &self.sections()?)
    }

    /// Translate a virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotMapped`] if `va` is below the image base or not mapped.
    pub fn va_to_offset(&self, va: u64) -> Result<usize> {
        self.rva_to_offset(address::va_to_rva(va, self.image_base()?)?)
    }

    /// Read a little-endian value at a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the buffer.
    pub fn read_at<T: PeIO>(&self, offset: usize) -> Result<T> {
        self.buffer.read::<T>(offset)
    }

    fn directory_range(&self, kind: DataDirectoryType) -> Result<Option<(u32, u32)>> {
        let Some(directory) = self.data_directory(kind)? else {
            return Ok(None);
        };

        let rva = directory.virtual_address(&self.buffer)?;
        if rva == 0 {
            return Ok(None);
        }
        Ok(Some((rva, directory.size(&self.buffer)?)))
    }

    fn with_context<T>(&self, f: impl FnOnce(&DirectoryContext<'_>) -> Result<T>) -> Result<T> {
        let sections = self.sections()?;
        let ctx = DirectoryContext {
            buffer: &self.buffer,
            sections: &sections,
            is_64: self.headers.is_64(),
            image_base: self.image_base()?,
            size_of_headers: self.headers.optional.size_of_headers(&self.buffer)?,
            machine: self.headers.file.machine(&self.buffer)?,
            config: &self.config,
        };
        f(&ctx)
    }

    fn directory_list<T, F>(
        &self,
        memo: &Memo<Vec<T>>,
        kind: DataDirectoryType,
        parse: F,
    ) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce(&DirectoryContext<'_>, u32, u32) -> Result<Vec<T>>,
    {
        memo.get_or_try_init(self.buffer.generation(), || {
            match self.directory_range(kind)? {
                Some((rva, size)) => self.with_context(|ctx| parse(ctx, rva, size)),
                None => Ok(Vec::new()),
            }
        })
    }

    fn directory_value<T, F>(
        &self,
        memo: &Memo<Option<Arc<T>>>,
        kind: DataDirectoryType,
        parse: F,
    ) -> Result<Option<Arc<T>>>
    where
        F: FnOnce(&DirectoryContext<'_>, u32, u32) -> Result<T>,
    {
        let value = memo.get_or_try_init(self.buffer.generation(), || {
            match self.directory_range(kind)? {
                Some((rva, size)) => self
                    .with_context(|ctx| parse(ctx, rva, size))
                    .map(|value| Some(Arc::new(value))),
                None => Ok(None),
            }
        })?;
        Ok(Option::clone(&value))
    }

    /// Import descriptors, terminator excluded.
    ///
    /// # Errors
    /// Returns an error if the import directory is present but malformed.
    pub fn import_descriptors(&self) -> Result<Arc<Vec<ImportDescriptor>>> {
        self.directory_list(
            &self.import_descriptors,
            DataDirectoryType::Import,
            |ctx, rva, _| imports::parse_descriptors(ctx, rva),
        )
    }

    /// Every imported symbol, in descriptor and thunk order.
    ///
    /// # Errors
    /// Returns an error if the import directory or a thunk array is malformed.
    pub fn imports(&self) -> Result<Arc<Vec<ImportedFunction>>> {
        self.imports.get_or_try_init(self.buffer.generation(), || {
            let descriptors = self.import_descriptors()?;
            self.with_context(|ctx| imports::parse_functions(ctx, &descriptors))
        })
    }

    /// Export directory.
    ///
    /// # Errors
    /// Returns an error if the export directory is present but malformed.
    pub fn exports(&self) -> Result<Option<Arc<ExportDirectory>>> {
        self.directory_value(&self.exports, DataDirectoryType::Export, ExportDirectory::parse)
    }

    /// Base relocation blocks.
    ///
    /// # Errors
    /// Returns an error if the relocation directory is present but malformed.
    pub fn relocations(&self) -> Result<Arc<Vec<RelocationBlock>>> {
        self.directory_list(
            &self.relocations,
            DataDirectoryType::BaseRelocation,
            relocations::parse,
        )
    }

    /// Root resource directory.
    ///
    /// # Errors
    /// Returns an error if the resource directory is present but malformed.
    pub fn resources(&self) -> Result<Option<Arc<ResourceDirectory>>> {
        self.directory_value(&self.resources, DataDirectoryType::Resource, |ctx, rva, _| {
            ResourceDirectory::parse(ctx, rva)
        })
    }

    /// TLS directory.
    ///
    /// # Errors
    /// Returns an error if the TLS directory is present but malformed.
    pub fn tls(&self) -> Result<Option<Arc<TlsDirectory>>> {
        self.directory_value(&self.tls, DataDirectoryType::Tls, |ctx, rva, _| {
            TlsDirectory::parse(ctx, rva)
        })
    }

    /// Load configuration directory.
    ///
    /// # Errors
    /// Returns an error if the load configuration directory is present but malformed.
    pub fn load_config(&self) -> Result<Option<Arc<LoadConfigDirectory>>> {
        self.directory_value(
            &self.load_config,
            DataDirectoryType::LoadConfig,
            |ctx, rva, _| LoadConfigDirectory::parse(ctx, rva),
        )
    }

    /// Bound import descriptors.
    ///
    /// # Errors
    /// Returns an error if the bound import directory is present but malformed.
    pub fn bound_imports(&self) -> Result<Arc<Vec<BoundImportDescriptor>>> {
        self.directory_list(
            &self.bound_imports,
            DataDirectoryType::BoundImport,
            |ctx, rva, _| boundimport::parse(ctx, rva),
        )
    }

    /// Delay-load import descriptors.
    ///
    /// # Errors
    /// Returns an error if the delay import directory is present but malformed.
    pub fn delay_imports(&self) -> Result<Arc<Vec<DelayImportDescriptor>>> {
        self.directory_list(
            &self.delay_imports,
            DataDirectoryType::DelayImport,
            |ctx, rva, _| delayimport::parse(ctx, rva),
        )
    }

    /// Debug directory entries.
    ///
    /// # Errors
    /// Returns an error if the debug directory is present but malformed.
    pub fn debug(&self) -> Result<Arc<Vec<DebugDirectoryEntry>>> {
        self.directory_list(&self.debug, DataDirectoryType::Debug, debug::parse)
    }

    /// x64 runtime function table.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for other machines when the directory is
    /// present, or an error if it is malformed.
    pub fn exceptions(&self) -> Result<Arc<Vec<RuntimeFunction>>> {
        self.directory_list(&self.exceptions, DataDirectoryType::Exception, exception::parse)
    }

    /// Decode the unwind record of a runtime function.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or is malformed.
    pub fn unwind_info(&self, function: &RuntimeFunction) -> Result<exception::UnwindInfo> {
        self.with_context(|ctx| function.unwind_info(ctx))
    }

    /// Attribute certificates. The directory address is a file offset.
    ///
    /// # Errors
    /// Returns an error if the certificate table is present but malformed.
    pub fn certificates(&self) -> Result<Arc<Vec<WinCertificate>>> {
        self.certificates
            .get_or_try_init(self.buffer.generation(), || {
                match self.directory_range(DataDirectoryType::Security)? {
                    Some((offset, size)) => security::parse(&self.buffer, offset, size),
                    None => Ok(Vec::new()),
                }
            })
    }

    /// CLI header of a managed image.
    ///
    /// # Errors
    /// Returns an error if the CLR directory is present but malformed.
    pub fn clr(&self) -> Result<Option<Arc<Cor20Header>>> {
        self.directory_value(
            &self.clr,
            DataDirectoryType::ClrRuntimeHeader,
            |ctx, rva, _| Cor20Header::parse(ctx, rva),
        )
    }

    /// Raw .NET metadata bytes of a managed image.
    ///
    /// # Errors
    /// Returns an error if the CLR header is malformed or its metadata range is not mapped.
    pub fn clr_metadata(&self) -> Result<Option<&[u8]>> {
        let Some(header) = self.clr()? else {
            return Ok(None);
        };

        let offset = self.with_context(|ctx| ctx.rva_to_offset(header.meta_data_rva))?;
        Ok(Some(
            self.buffer
                .read_bytes(offset, header.meta_data_size as usize)?,
        ))
    }

    /// Discard the memoised section table and decode it again.
    ///
    /// # Errors
    /// Returns an error if the section table cannot be read.
    pub fn reparse_section_headers(&self) -> Result<Arc<Vec<Section>>> {
        self.sections.invalidate()?;
        self.sections()
    }

    /// Discard the memoised import descriptors and decode them again.
    ///
    /// # Errors
    /// Returns an error if the import directory is malformed.
    pub fn reparse_import_descriptors(&self) -> Result<Arc<Vec<ImportDescriptor>>> {
        self.import_descriptors.invalidate()?;
        self.import_descriptors()
    }

    /// Discard the memoised imported symbols and decode them again.
    ///
    /// # Errors
    /// Returns an error if the import directory or a thunk array is malformed.
    pub fn reparse_imported_functions(&self) -> Result<Arc<Vec<ImportedFunction>>> {
        self.imports.invalidate()?;
        self.imports()
    }

    /// Append a zero-filled section of `size` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Precondition`] for an invalid name or size, or when the
    /// section table has no room for another header. The image is unchanged on error.
    pub fn add_section(
        &mut self,
        name: &str,
        size: u32,
        characteristics: SectionCharacteristics,
    ) -> Result<Section> {
        let sections = self.sections()?;
        let headers = self.headers;
        self.buffer.transactional(|buffer| {
            mutation::add_section(buffer, &headers, &sections, name, size, characteristics)
        })
    }

    /// Remove the first section named `name`, optionally deleting its raw data.
    ///
    /// # Errors
    /// Returns [`crate::Error::Precondition`] if no section has that name. The image is
    /// unchanged on error.
    pub fn remove_section(&mut self, name: &str, remove_content: bool) -> Result<Section> {
        let sections = self.sections()?;
        let headers = self.headers;
        self.buffer.transactional(|buffer| {
            mutation::remove_section(buffer, &headers, &sections, name, remove_content)
        })
    }

    /// Add imports from modules the image does not import yet.
    ///
    /// The import table is rebuilt in a new section named after
    /// [`PeConfig::import_section_name`]; returns that section.
    ///
    /// # Errors
    /// Returns [`crate::Error::Precondition`] if a module is already imported, appears
    /// twice, or a request is empty. The image is unchanged on error.
    pub fn add_imports(&mut self, requests: &[ImportRequest]) -> Result<Section> {
        let sections = self.sections()?;
        let existing = self.import_descriptors()?;
        let headers = self.headers;
        let config = self.config;
        self.buffer.transactional(|buffer| {
            mutation::add_imports(buffer, &headers, &sections, &existing, requests, &config)
        })
    }

    /// Lowercase hex MD5 of the image bytes.
    #[must_use]
    pub fn md5(&self) -> String {
        hash::md5_hex(self.buffer.data())
    }

    /// Lowercase hex SHA-1 of the image bytes.
    #[must_use]
    pub fn sha1(&self) -> String {
        hash::sha1_hex(self.buffer.data())
    }

    /// Import hash, `None` if the image imports nothing.
    ///
    /// # Errors
    /// Returns an error if the import directory is malformed.
    pub fn imphash(&self) -> Result<Option<String>> {
        Ok(hash::imphash(&self.imports()?))
    }
}

impl fmt::Debug for PeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeFile")
            .field("len", &self.buffer.len())
            .field("generation", &self.buffer.generation())
            .field("pe32_plus", &self.headers.is_64())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
