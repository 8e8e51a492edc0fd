use sha2::{Digest, Sha256};

use stringer_types::RawSignal;

/// Default prefix for generated output IDs.
pub const DEFAULT_ID_PREFIX: &str = "str-";

/// Content-addressed identity hash of a signal: the first 4 bytes of
/// SHA-256 over the null-separated identity tuple, as 8 lowercase hex
/// characters.
///
/// The null separator prevents field-boundary collisions: `("ab", "c")`
/// and `("a", "bc")` hash differently. Payload fields (description,
/// confidence, tags, ...) never participate.
pub fn signal_hash(signal: &RawSignal) -> String {
    hash_identity(
        &signal.source,
        &signal.kind,
        &signal.file_path,
        signal.line,
        &signal.title,
    )
}

/// Hash an identity tuple directly.
pub fn hash_identity(source: &str, kind: &str, file_path: &str, line: u32, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(file_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(line.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

/// Output ID with the default `str-` prefix.
pub fn output_id(signal: &RawSignal) -> String {
    output_id_with_prefix(signal, DEFAULT_ID_PREFIX)
}

/// Output ID form: `<prefix><hex>`, or `<prefix><workspace>-<hex>` for a
/// signal belonging to a non-empty workspace.
///
/// Workspace scoping is an ID-form choice only. The hash is computed from
/// the identity tuple alone, so dedup stays stable across workspace
/// renames.
pub fn output_id_with_prefix(signal: &RawSignal, prefix: &str) -> String {
    let hash = signal_hash(signal);
    if signal.workspace.is_empty() {
        format!("{prefix}{hash}")
    } else {
        format!("{prefix}{}-{hash}", signal.workspace)
    }
}
