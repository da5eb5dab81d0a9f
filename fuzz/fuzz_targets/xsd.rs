#![no_main]
use libfuzzer_sys::fuzz_target;
use xsdform::{FormOptions, FormSession};

fuzz_target!(|data: &[u8]| {
    if let Ok(xsd) = std::str::from_utf8(data)
        && let Ok(schema) = xsdform::xsd::parse_xsd(xsd)
    {
        let _ = FormSession::generate(&schema, FormOptions::default().with_max_depth(16));
    }
});
