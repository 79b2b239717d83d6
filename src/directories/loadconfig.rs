//! Load configuration directory.
//!
//! The structure has grown with nearly every Windows release; its first field is the size
//! the linker emitted. Fields are decoded in order and every field past that size, or past
//! the end of the buffer, is left as `None`.

use crate::{directories::DirectoryContext, file::parser::Parser, Result};

/// Decoded `IMAGE_LOAD_CONFIG_DIRECTORY32` / `IMAGE_LOAD_CONFIG_DIRECTORY64`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadConfigDirectory {
    /// Size of the structure as declared by the linker
    pub size: u32,
    /// Timestamp
    pub time_date_stamp: Option<u32>,
    /// Major version
    pub major_version: Option<u16>,
    /// Minor version
    pub minor_version: Option<u16>,
    /// Global flags to clear
    pub global_flags_clear: Option<u32>,
    /// Global flags to set
    pub global_flags_set: Option<u32>,
    /// Default critical section timeout
    pub critical_section_default_timeout: Option<u32>,
    /// Heap decommit free block threshold
    pub decommit_free_block_threshold: Option<u64>,
    /// Heap decommit total free threshold
    pub decommit_total_free_threshold: Option<u64>,
    /// VA of the lock prefix table (x86 only)
    pub lock_prefix_table: Option<u64>,
    /// Maximum allocation size
    pub maximum_allocation_size: Option<u64>,
    /// Virtual memory threshold
    pub virtual_memory_threshold: Option<u64>,
    /// Process affinity mask
    pub process_affinity_mask: Option<u64>,
    /// Process heap flags
    pub process_heap_flags: Option<u32>,
    /// Service pack version
    pub csd_version: Option<u16>,
    /// Dependent load flags
    pub dependent_load_flags: Option<u16>,
    /// Reserved
    pub edit_list: Option<u64>,
    /// VA of the `/GS` security cookie
    pub security_cookie: Option<u64>,
    /// VA of the safe SEH handler table (x86 only)
    pub se_handler_table: Option<u64>,
    /// Number of safe SEH handlers
    pub se_handler_count: Option<u64>,
    /// VA of the CFG check function pointer
    pub guard_cf_check_function_pointer: Option<u64>,
    /// VA of the CFG dispatch function pointer
    pub guard_cf_dispatch_function_pointer: Option<u64>,
    /// VA of the CFG function table
    pub guard_cf_function_table: Option<u64>,
    /// Number of CFG function table entries
    pub guard_cf_function_count: Option<u64>,
    /// `IMAGE_GUARD_*` flags
    pub guard_flags: Option<u32>,
}

struct Fields<'a> {
    parser: Parser<'a>,
    is_64: bool,
}

impl Fields<'_> {
    fn u16(&mut self) -> Option<u16> {
        self.parser.read_le::<u16>().ok()
    }

    fn u32(&mut self) -> Option<u32> {
        self.parser.read_le::<u32>().ok()
    }

    fn ptr(&mut self) -> Option<u64> {
        self.parser.read_ptr(self.is_64).ok()
    }
}

impl LoadConfigDirectory {
    /// Decode the load configuration at `rva`.
    ///
    /// # Errors
    /// Returns an error if the directory is not mapped or its size field cannot be read.
    pub fn parse(ctx: &DirectoryContext<'_>, rva: u32) -> Result<LoadConfigDirectory> {
        let offset = ctx.rva_to_offset(rva)?;
        let size = ctx.buffer.read::<u32>(offset)?;
        if size < 4 {
            return Err(malformed_error!(
                "Load config directory declares size {}",
                size
            ));
        }

        let available = ctx.buffer.len().saturating_sub(offset).min(size as usize);
        let mut fields = Fields {
            parser: Parser::new(ctx.buffer.read_bytes(offset, available)?),
            is_64: ctx.is_64,
        };
        let _ = fields.u32();

        let mut config = LoadConfigDirectory {
            size,
            time_date_stamp: fields.u32(),
            major_version: fields.u16(),
            minor_version: fields.u16(),
            global_flags_clear: fields.u32(),
            global_flags_set: fields.u32(),
            critical_section_default_timeout: fields.u32(),
            decommit_free_block_threshold: fields.ptr(),
            decommit_total_free_threshold: fields.ptr(),
            lock_prefix_table: fields.ptr(),
            maximum_allocation_size: fields.ptr(),
            virtual_memory_threshold: fields.ptr(),
            ..LoadConfigDirectory::default()
        };

        // PE32 stores the heap flags ahead of the affinity mask
        if ctx.is_64 {
            config.process_affinity_mask = fields.ptr();
            config.process_heap_flags = fields.u32();
        } else {
            config.process_heap_flags = fields.u32();
            config.process_affinity_mask = fields.ptr();
        }

        config.csd_version = fields.u16();
        config.dependent_load_flags = fields.u16();
        config.edit_list = fields.ptr();
        config.security_cookie = fields.ptr();
        config.se_handler_table = fields.ptr();
        config.se_handler_count = fields.ptr();
        config.guard_cf_check_function_pointer = fields.ptr();
        config.guard_cf_dispatch_function_pointer = fields.ptr();
        config.guard_cf_function_table = fields.ptr();
        config.guard_cf_function_count = fields.ptr();
        config.guard_flags = fields.u32();

        Ok(config)
    }
}
