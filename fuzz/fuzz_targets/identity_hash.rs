#![no_main]

use libfuzzer_sys::fuzz_target;
use stringer::identity::hash_identity;

fuzz_target!(|data: (String, String, String, u32, String)| {
    let (source, kind, path, line, title) = data;

    let hash = hash_identity(&source, &kind, &path, line, &title);

    // Invariants:
    // 1. Always 8 lowercase hex characters
    assert_eq!(hash.len(), 8);
    assert!(hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));

    // 2. Deterministic
    assert_eq!(hash, hash_identity(&source, &kind, &path, line, &title));
});
