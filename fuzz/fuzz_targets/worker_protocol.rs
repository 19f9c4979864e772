#![no_main]

use flowscope_graph::handle_json;
use libfuzzer_sys::fuzz_target;

// Any input gets a JSON object back, never a panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(request) = std::str::from_utf8(data) {
        let response = handle_json(request);
        assert!(response.starts_with('{') && response.ends_with('}'));
    }
});
