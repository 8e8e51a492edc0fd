use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;

use stringer_types::{DiffResult, MovedSignal, RawSignal, ScanState, SignalMeta};

use crate::git;

/// Current scan-state schema version.
pub const SCAN_STATE_VERSION: &str = "stringer.scan-state.v1";

/// Resolution recorded on a removed signal whose file is gone from disk.
pub const RESOLUTION_FILE_DELETED: &str = "file_deleted";

/// Build a snapshot of a completed scan: per-signal identity records,
/// the sorted collector names, and a best-effort git HEAD.
pub fn build_state(repo_root: &Path, collectors: &[String], signals: &[RawSignal]) -> ScanState {
    let mut names = collectors.to_vec();
    names.sort();
    ScanState {
        version: SCAN_STATE_VERSION.to_string(),
        collectors: names,
        signals: signals.iter().map(SignalMeta::from).collect(),
        total_count: signals.len(),
        git_head: git::head_commit(repo_root).unwrap_or_default(),
        built_at: Utc::now(),
    }
}

/// Whether `file_path` no longer exists under `repo_root`. Only a clean
/// NotFound counts; any other filesystem error is treated as "still
/// there" so flaky I/O cannot fabricate resolutions.
fn file_is_gone(repo_root: &Path, file_path: &str) -> bool {
    if file_path.is_empty() {
        return false;
    }
    matches!(
        std::fs::metadata(repo_root.join(file_path)),
        Err(ref e) if e.kind() == io::ErrorKind::NotFound
    )
}

/// Compare two snapshots.
///
/// Membership in Added/Removed uses the full identity tuple. Pairs that
/// share `(source, kind, title)` but differ in location are reported as
/// Moved and omitted from both other sets. Removed entries whose file no
/// longer exists on disk carry the `file_deleted` resolution.
pub fn diff_states(prior: &ScanState, current: &ScanState, repo_root: &Path) -> DiffResult {
    let prior_ids: HashSet<_> = prior.signals.iter().map(|m| m.identity()).collect();
    let current_ids: HashSet<_> = current.signals.iter().map(|m| m.identity()).collect();

    let new_metas: Vec<&SignalMeta> = current
        .signals
        .iter()
        .filter(|m| !prior_ids.contains(&m.identity()))
        .collect();
    let gone_metas: Vec<&SignalMeta> = prior
        .signals
        .iter()
        .filter(|m| !current_ids.contains(&m.identity()))
        .collect();

    let mut gone_by_key: BTreeMap<(&str, &str, &str), Vec<&SignalMeta>> = BTreeMap::new();
    for &meta in &gone_metas {
        gone_by_key.entry(meta.move_key()).or_default().push(meta);
    }

    let mut diff = DiffResult::default();

    for meta in new_metas {
        if let Some(candidates) = gone_by_key.get_mut(&meta.move_key())
            && !candidates.is_empty()
        {
            let from = candidates.remove(0);
            diff.moved.push(MovedSignal {
                from: from.clone(),
                to: meta.clone(),
            });
            continue;
        }
        diff.added.push(meta.clone());
    }

    for meta in gone_metas {
        let unmatched = gone_by_key
            .get(&meta.move_key())
            .is_some_and(|v| v.iter().any(|kept| std::ptr::eq(*kept, meta)));
        if unmatched {
            let mut removed = meta.clone();
            if file_is_gone(repo_root, &removed.file_path) {
                removed.resolution = RESOLUTION_FILE_DELETED.to_string();
            }
            diff.removed.push(removed);
        }
    }

    diff
}

fn location(meta: &SignalMeta) -> String {
    if meta.file_path.is_empty() {
        "-".to_string()
    } else if meta.line > 0 {
        format!("{}:{}", meta.file_path, meta.line)
    } else {
        meta.file_path.clone()
    }
}

/// Write the human-readable diff summary. Every write is checked; the
/// first failure is returned immediately.
pub fn format_diff(diff: &DiffResult, writer: &mut dyn Write) -> io::Result<()> {
    writeln!(writer, "Changes since last scan")?;
    writeln!(writer, "+ {} new signal(s)", diff.added.len())?;
    writeln!(writer, "- {} resolved signal(s)", diff.removed.len())?;
    writeln!(writer, "~ {} moved signal(s)", diff.moved.len())?;

    if !diff.added.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "New:")?;
        for meta in &diff.added {
            writeln!(writer, "  + {} ({})", meta.title, location(meta))?;
        }
    }

    if !diff.removed.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Resolved:")?;
        for meta in &diff.removed {
            if meta.resolution.is_empty() {
                writeln!(writer, "  - {} ({})", meta.title, location(meta))?;
            } else {
                writeln!(
                    writer,
                    "  - {} ({}) [{}]",
                    meta.title,
                    location(meta),
                    meta.resolution
                )?;
            }
        }
    }

    if !diff.moved.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Moved:")?;
        for moved in &diff.moved {
            writeln!(writer, "  ~ {}", moved.to.title)?;
            writeln!(writer, "    From: {}", location(&moved.from))?;
            writeln!(writer, "    To: {}", location(&moved.to))?;
        }
    }

    Ok(())
}
