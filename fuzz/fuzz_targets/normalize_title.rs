#![no_main]

use libfuzzer_sys::fuzz_target;
use stringer::beads::normalize_title;

fuzz_target!(|title: String| {
    let normalized = normalize_title(&title);

    // Invariants:
    // 1. Output carries no surrounding whitespace
    assert_eq!(normalized, normalized.trim());

    // 2. Deterministic
    assert_eq!(normalized, normalize_title(&title));
});
