#![no_main]

use libfuzzer_sys::fuzz_target;
use stringer::validate::validate_signal;
use stringer_types::RawSignal;

fuzz_target!(|data: (String, String, String, u32, String, f64)| {
    let (source, kind, file_path, line, title, confidence) = data;
    let signal = RawSignal {
        source,
        kind,
        file_path,
        line,
        title,
        confidence,
        ..Default::default()
    };

    // Validation never panics and always names a known field.
    for error in validate_signal(&signal) {
        assert!(matches!(
            error.field,
            "title" | "source" | "file_path" | "confidence"
        ));
    }
});
