use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use stringer_types::{CollectorOpts, RawSignal};

use crate::cancel::CancelToken;
use crate::collector::Collector;

use super::build_excludes;

/// Files larger than this are assumed generated and skipped.
const MAX_FILE_SIZE: u64 = 512 * 1024;

/// Comment markers and their base confidence, most urgent first. The
/// first marker found on a line wins.
const MARKERS: &[(&str, f64)] = &[
    ("FIXME", 0.7),
    ("BUG", 0.7),
    ("HACK", 0.6),
    ("XXX", 0.6),
    ("TODO", 0.5),
    ("OPTIMIZE", 0.4),
];

/// Summary published for the `todo-age` report section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoMetrics {
    pub total: usize,
    pub files_scanned: usize,
    pub marker_counts: BTreeMap<String, usize>,
}

/// Scans the source tree for TODO-style comment markers.
#[derive(Debug, Default)]
pub struct TodoCollector {
    metrics: Mutex<Option<TodoMetrics>>,
}

impl TodoCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One extracted marker: kind, base confidence, author, title.
struct Marker {
    kind: &'static str,
    confidence: f64,
    author: String,
    title: String,
}

/// Find the first marker on a line. A marker counts only at a word
/// boundary: not preceded or followed by an alphanumeric, so an
/// identifier like `TODONE` never shadows a real `TODO` later on the
/// same line. `TODO(alice)` attributes the author.
fn find_marker(line: &str) -> Option<Marker> {
    for (marker, confidence) in MARKERS {
        for (pos, _) in line.match_indices(marker) {
            let before_ok = pos == 0
                || !line.as_bytes()[pos - 1].is_ascii_alphanumeric();
            let after = line.as_bytes().get(pos + marker.len());
            let after_ok = after.is_none_or(|b| !b.is_ascii_alphanumeric());
            if !before_ok || !after_ok {
                continue;
            }

            let mut rest = &line[pos + marker.len()..];
            let mut author = String::new();
            if let Some(inner) = rest.strip_prefix('(')
                && let Some(close) = inner.find(')')
            {
                author = inner[..close].trim().to_string();
                rest = &inner[close + 1..];
            }
            let title = rest.trim_start_matches(':').trim();
            let title = if title.is_empty() {
                (*marker).to_string()
            } else {
                title.to_string()
            };

            return Some(Marker {
                kind: marker,
                confidence: *confidence,
                author,
                title,
            });
        }
    }
    None
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

impl Collector for TodoCollector {
    fn name(&self) -> &str {
        "todos"
    }

    fn collect(
        &self,
        cancel: &CancelToken,
        repo: &Path,
        opts: &CollectorOpts,
    ) -> Result<Vec<RawSignal>> {
        let excludes = build_excludes(&opts.exclude_patterns)?;
        let mut signals = Vec::new();
        let mut metrics = TodoMetrics::default();

        let walker = WalkDir::new(repo)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            if cancel.is_cancelled() {
                bail!("todos collection cancelled");
            }
            let entry = match entry {
                Ok(entry) => entry,
                // Unreadable directories are skipped, not fatal.
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(repo)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if excludes.is_match(rel.as_str()) {
                continue;
            }
            if entry.metadata().map(|m| m.len() > MAX_FILE_SIZE).unwrap_or(true) {
                continue;
            }

            let Ok(bytes) = fs::read(entry.path()) else {
                continue;
            };
            if bytes.contains(&0) {
                continue;
            }
            let content = String::from_utf8_lossy(&bytes);
            metrics.files_scanned += 1;

            for (idx, line) in content.lines().enumerate() {
                let Some(marker) = find_marker(line) else {
                    continue;
                };
                let kind = marker.kind.to_lowercase();
                *metrics.marker_counts.entry(kind.clone()).or_default() += 1;
                metrics.total += 1;
                signals.push(RawSignal {
                    source: "todos".to_string(),
                    kind,
                    file_path: rel.clone(),
                    line: (idx + 1) as u32,
                    title: marker.title,
                    author: marker.author,
                    confidence: marker.confidence,
                    ..Default::default()
                });
            }
        }

        *self.metrics.lock().unwrap() = Some(metrics);
        Ok(signals)
    }

    fn metrics(&self) -> Option<serde_json::Value> {
        let metrics = self.metrics.lock().unwrap();
        metrics
            .as_ref()
            .and_then(|m| serde_json::to_value(m).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collect_from(dir: &Path) -> (Vec<RawSignal>, TodoMetrics) {
        let collector = TodoCollector::new();
        let signals = collector
            .collect(&CancelToken::new(), dir, &CollectorOpts::default())
            .expect("collect");
        let metrics: TodoMetrics =
            serde_json::from_value(collector.metrics().expect("metrics")).expect("shape");
        (signals, metrics)
    }

    #[test]
    fn finds_markers_with_line_numbers() {
        let td = tempdir().expect("tempdir");
        fs::write(
            td.path().join("main.rs"),
            "fn main() {}\n// TODO: wire up the frobnicator\n// FIXME overflow here\n",
        )
        .expect("write");

        let (signals, metrics) = collect_from(td.path());
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].kind, "todo");
        assert_eq!(signals[0].line, 2);
        assert_eq!(signals[0].title, "wire up the frobnicator");
        assert_eq!(signals[0].confidence, 0.5);
        assert_eq!(signals[1].kind, "fixme");
        assert_eq!(signals[1].title, "overflow here");
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.marker_counts["todo"], 1);
    }

    #[test]
    fn attribution_from_parenthesized_author() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.rs"), "// TODO(alice): rotate keys\n").expect("write");

        let (signals, _) = collect_from(td.path());
        assert_eq!(signals[0].author, "alice");
        assert_eq!(signals[0].title, "rotate keys");
    }

    #[test]
    fn marker_requires_word_boundary() {
        let td = tempdir().expect("tempdir");
        fs::write(
            td.path().join("a.rs"),
            "let mastodont = 3; // not a marker\nlet xxx_list = 1; // XXXs\n",
        )
        .expect("write");

        let (signals, _) = collect_from(td.path());
        assert!(signals.is_empty(), "got {signals:?}");
    }

    #[test]
    fn bare_marker_uses_marker_as_title() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.rs"), "// TODO\n").expect("write");

        let (signals, _) = collect_from(td.path());
        assert_eq!(signals[0].title, "TODO");
    }

    #[test]
    fn exclude_patterns_skip_files() {
        let td = tempdir().expect("tempdir");
        fs::create_dir_all(td.path().join("vendor")).expect("mkdir");
        fs::write(td.path().join("vendor/dep.rs"), "// TODO: vendored\n").expect("write");
        fs::write(td.path().join("mine.rs"), "// TODO: mine\n").expect("write");

        let collector = TodoCollector::new();
        let opts = CollectorOpts {
            exclude_patterns: vec!["vendor/**".to_string()],
            ..Default::default()
        };
        let signals = collector
            .collect(&CancelToken::new(), td.path(), &opts)
            .expect("collect");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].title, "mine");
    }

    #[test]
    fn hidden_and_binary_files_are_skipped() {
        let td = tempdir().expect("tempdir");
        fs::create_dir_all(td.path().join(".git")).expect("mkdir");
        fs::write(td.path().join(".git/config"), "# TODO: not code\n").expect("write");
        fs::write(td.path().join("blob.bin"), b"TODO\x00binary").expect("write");
        fs::write(td.path().join("real.rs"), "// TODO: real\n").expect("write");

        let (signals, metrics) = collect_from(td.path());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].file_path, "real.rs");
        assert_eq!(metrics.files_scanned, 1);
    }

    #[test]
    fn cancelled_token_aborts_collection() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.rs"), "// TODO: x\n").expect("write");

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = TodoCollector::new()
            .collect(&cancel, td.path(), &CollectorOpts::default())
            .expect_err("cancelled");
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn marker_priority_prefers_fixme_over_todo() {
        assert_eq!(find_marker("// FIXME and TODO").unwrap().kind, "FIXME");
    }

    #[test]
    fn prefixed_identifier_does_not_shadow_a_later_marker() {
        let marker =
            find_marker("const TODONE: bool = true; // TODO: implement").expect("marker");
        assert_eq!(marker.kind, "TODO");
        assert_eq!(marker.title, "implement");

        let marker = find_marker("let bugs = 0; // BUG: off by one").expect("marker");
        assert_eq!(marker.kind, "BUG");
        assert_eq!(marker.title, "off by one");

        // A line with only embedded occurrences still yields nothing.
        assert!(find_marker("const TODONE: bool = true;").is_none());
    }

    #[test]
    fn invalid_exclude_pattern_is_an_error() {
        let td = tempdir().expect("tempdir");
        let opts = CollectorOpts {
            exclude_patterns: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(
            TodoCollector::new()
                .collect(&CancelToken::new(), td.path(), &opts)
                .is_err()
        );
    }
}
