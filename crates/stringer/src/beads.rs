use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use stringer_types::{Bead, RawSignal};

use crate::identity;

/// Conventional location of the existing backlog, relative to the repo root.
pub const BEADS_FILE: &str = ".beads/issues.jsonl";

/// Ceiling on one JSONL line. Anything larger is rejected rather than
/// buffered without bound.
const MAX_LINE_LEN: usize = 4 * 1024 * 1024;

/// Marker prefixes stripped once during title normalization.
const MARKER_PREFIXES: &[&str] = &["todo:", "fixme:", "hack:", "xxx:", "bug:", "optimize:"];

pub fn beads_path(repo_root: &Path) -> PathBuf {
    repo_root.join(BEADS_FILE)
}

/// Read the existing backlog. A missing file yields an empty list; an
/// unparseable line is a hard error naming the line number. Blank lines
/// are skipped, unknown fields ignored.
pub fn load_beads(path: &Path) -> Result<Vec<Bead>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file =
        File::open(path).with_context(|| format!("failed to open beads file {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut beads = Vec::new();
    let mut line = String::new();
    let mut lineno = 0usize;

    loop {
        line.clear();
        // Bound the buffer: a line that exhausts the cap without hitting a
        // newline is rejected rather than read to completion.
        let read = (&mut reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_line(&mut line)
            .with_context(|| format!("failed to read beads file {}", path.display()))?;
        if read == 0 {
            break;
        }
        lineno += 1;
        if line.len() > MAX_LINE_LEN {
            bail!(
                "line {lineno} in {} exceeds {MAX_LINE_LEN} bytes",
                path.display()
            );
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let bead: Bead = serde_json::from_str(trimmed).with_context(|| {
            format!("failed to parse bead JSON at {}:{lineno}", path.display())
        })?;
        beads.push(bead);
    }

    Ok(beads)
}

/// Normalize a title for tier-3 matching: lowercase, trim, strip one
/// leading marker prefix, trim again.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    for prefix in MARKER_PREFIXES {
        if let Some(rest) = lowered.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    lowered
}

/// Drop incoming signals whose content is already represented in the
/// existing backlog, open or closed.
///
/// Three tiers, checked in order over sets precomputed in one pass:
/// 1. the signal's would-be output ID equals an existing ID verbatim;
/// 2. the signal's 8-hex hash equals the hex suffix of a `str-<hex>` ID;
/// 3. the normalized titles are equal.
pub fn filter_existing(signals: Vec<RawSignal>, beads: &[Bead]) -> Vec<RawSignal> {
    if beads.is_empty() {
        return signals;
    }

    let mut ids: HashSet<&str> = HashSet::new();
    let mut hashes: HashSet<String> = HashSet::new();
    let mut titles: HashSet<String> = HashSet::new();
    for bead in beads {
        ids.insert(bead.id.as_str());
        if let Some(hex) = bead.id.strip_prefix(identity::DEFAULT_ID_PREFIX)
            && hex.len() == 8
            && hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            hashes.insert(hex.to_ascii_lowercase());
        }
        titles.insert(normalize_title(&bead.title));
    }

    signals
        .into_iter()
        .filter(|signal| {
            if ids.contains(identity::output_id(signal).as_str()) {
                return false;
            }
            if hashes.contains(identity::signal_hash(signal).as_str()) {
                return false;
            }
            !titles.contains(normalize_title(&signal.title).as_str())
        })
        .collect()
}
