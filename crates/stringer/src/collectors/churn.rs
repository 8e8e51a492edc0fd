use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use globset::GlobSet;
use serde::{Deserialize, Serialize};

use stringer_types::{CollectorOpts, RawSignal};

use crate::cancel::CancelToken;
use crate::collector::Collector;
use crate::git::git_program;

use super::build_excludes;

/// How many files the published metrics keep.
const TOP_FILES: usize = 10;

/// Summary published for the `churn` report section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurnMetrics {
    pub commits_scanned: usize,
    pub files_tracked: usize,
    pub top_files: Vec<ChurnFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnFile {
    pub path: String,
    pub commits: usize,
}

/// Counts per-file touches in recent git history and flags hotspots.
#[derive(Debug)]
pub struct ChurnCollector {
    window_days: u32,
    threshold: usize,
    metrics: Mutex<Option<ChurnMetrics>>,
}

impl Default for ChurnCollector {
    fn default() -> Self {
        Self {
            window_days: 90,
            threshold: 3,
            metrics: Mutex::new(None),
        }
    }
}

impl ChurnCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window_days: u32, threshold: usize) -> Self {
        Self {
            window_days,
            threshold,
            ..Default::default()
        }
    }

    /// Turn the per-file tallies into hotspot signals and metrics. Files
    /// are ranked by descending count, ties broken by path.
    fn rank(
        &self,
        commits: usize,
        counts: BTreeMap<String, usize>,
    ) -> (Vec<RawSignal>, ChurnMetrics) {
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut signals = Vec::new();
        for (path, count) in &ranked {
            if *count < self.threshold {
                continue;
            }
            signals.push(RawSignal {
                source: "churn".to_string(),
                kind: "churn".to_string(),
                file_path: path.clone(),
                line: 0,
                title: format!(
                    "High churn: {path} ({count} changes in {}d)",
                    self.window_days
                ),
                confidence: (0.4 + 0.05 * *count as f64).min(0.9),
                ..Default::default()
            });
        }

        let metrics = ChurnMetrics {
            commits_scanned: commits,
            files_tracked: ranked.len(),
            top_files: ranked
                .iter()
                .take(TOP_FILES)
                .map(|(path, count)| ChurnFile {
                    path: path.clone(),
                    commits: *count,
                })
                .collect(),
        };

        (signals, metrics)
    }
}

/// Tally `git log --name-only --pretty=format:%H` output: commit hash
/// lines bump the commit count, everything else is a touched file.
fn tally_log(
    stdout: &str,
    excludes: &GlobSet,
    cancel: &CancelToken,
) -> Result<(usize, BTreeMap<String, usize>)> {
    let mut commits = 0usize;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for line in stdout.lines() {
        if cancel.is_cancelled() {
            bail!("churn collection cancelled");
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.len() == 40 && line.bytes().all(|b| b.is_ascii_hexdigit()) {
            commits += 1;
            continue;
        }
        if excludes.is_match(line) {
            continue;
        }
        *counts.entry(line.to_string()).or_default() += 1;
    }

    Ok((commits, counts))
}

impl Collector for ChurnCollector {
    fn name(&self) -> &str {
        "churn"
    }

    fn collect(
        &self,
        cancel: &CancelToken,
        repo: &Path,
        opts: &CollectorOpts,
    ) -> Result<Vec<RawSignal>> {
        let excludes = build_excludes(&opts.exclude_patterns)?;

        let output = Command::new(git_program())
            .arg("log")
            .arg(format!("--since={} days ago", self.window_days))
            .arg("--name-only")
            .arg("--pretty=format:%H")
            .current_dir(repo)
            .output()
            .context("failed to run git log; is git installed?")?;

        if !output.status.success() {
            bail!(
                "git log failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (commits, counts) = tally_log(&stdout, &excludes, cancel)?;

        let (signals, metrics) = self.rank(commits, counts);
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
