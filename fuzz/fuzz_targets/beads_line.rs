#![no_main]

use libfuzzer_sys::fuzz_target;
use stringer_types::Bead;

fuzz_target!(|data: &[u8]| {
    // Parsing an arbitrary JSONL line must never panic; it either yields
    // a bead or a clean error.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<Bead>(text);
    }
});
