use std::path::Path;

use thiserror::Error;

use stringer_types::RawSignal;

/// One well-formedness violation, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a signal against the well-formedness rules. All rules are checked
/// independently; an empty result means the signal is valid.
pub fn validate_signal(signal: &RawSignal) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if signal.title.trim().is_empty() {
        errors.push(ValidationError::new("title", "must not be empty"));
    }
    if signal.source.trim().is_empty() {
        errors.push(ValidationError::new("source", "must not be empty"));
    }
    if !signal.file_path.is_empty() && Path::new(&signal.file_path).is_absolute() {
        errors.push(ValidationError::new(
            "file_path",
            "must be a relative path, got absolute path",
        ));
    }
    if !(0.0..=1.0).contains(&signal.confidence) {
        errors.push(ValidationError::new(
            "confidence",
            format!("must be between 0.0 and 1.0, got {}", signal.confidence),
        ));
    }

    errors
}
