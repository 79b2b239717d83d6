#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::{ImportRequest, PeFile};

fuzz_target!(|data: &[u8]| {
    let Some(mut pe) = PeFile::try_parse(data.to_vec()).into_file() else {
        return;
    };

    let _ = pe.imphash();
    if let Ok(sections) = pe.sections() {
        for section in sections.iter() {
            let _ = pe.rva_to_offset(section.virtual_address);
        }
    }

    let _ = pe.add_imports(&[ImportRequest::new("fuzz.dll", ["Fuzz"])]);
    let _ = pe.remove_section(".reloc", true);
    let _ = pe.directory_failures();
});
