//! Configuration file support for stringer (`.stringer.toml`)
//!
//! Project-specific defaults live in a `.stringer.toml` at the repo root.
//! CLI flags override anything set here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use stringer_types::{CollectorOpts, ErrorMode, ScanConfig, opt_duration};

use crate::format::LabelConvention;

pub const CONFIG_FILE: &str = ".stringer.toml";

/// Nested scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanSection {
    /// Collector names to run; empty means all registered.
    #[serde(default)]
    pub collectors: Vec<String>,

    /// Cap on emitted signals; 0 disables the cap.
    #[serde(default)]
    pub max_issues: usize,

    /// Glob patterns excluded from every collector.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Nested output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Encoder name: beads, json, tasks, markdown, sarif, html, html-dir.
    #[serde(default = "default_format")]
    pub format: String,

    /// Label convention for the beads encoder: kebab or snake.
    #[serde(default = "default_labels")]
    pub labels: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: default_format(),
            labels: default_labels(),
        }
    }
}

fn default_format() -> String {
    "beads".to_string()
}

fn default_labels() -> String {
    "kebab".to_string()
}

/// Per-collector overrides, `[collector.<name>]` in the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectorSection {
    /// Wall-clock budget for one collect call.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_duration")]
    pub timeout: Option<Duration>,

    /// warn, skip, or fail.
    #[serde(default)]
    pub error_mode: ErrorMode,

    /// Glob patterns excluded from this collector's walk.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl From<CollectorSection> for CollectorOpts {
    fn from(section: CollectorSection) -> Self {
        CollectorOpts {
            timeout: section.timeout,
            error_mode: section.error_mode,
            exclude_patterns: section.exclude,
        }
    }
}

/// The whole `.stringer.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub scan: ScanSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub collector: BTreeMap<String, CollectorSection>,
}

impl FileConfig {
    /// Assemble the pipeline's [`ScanConfig`] for a repository.
    pub fn to_scan_config(&self, repo_path: PathBuf) -> ScanConfig {
        ScanConfig {
            repo_path,
            collectors: self.scan.collectors.clone(),
            max_issues: self.scan.max_issues,
            exclude_patterns: self.scan.exclude.clone(),
            collector_opts: self
                .collector
                .iter()
                .map(|(name, section)| (name.clone(), section.clone().into()))
                .collect(),
        }
    }

    /// Label convention for the beads encoder.
    pub fn label_convention(&self) -> LabelConvention {
        if self.output.labels.eq_ignore_ascii_case("snake") {
            LabelConvention::Snake
        } else {
            LabelConvention::Kebab
        }
    }
}

/// Load `.stringer.toml` from the repo root. A missing file yields the
/// defaults; a malformed file is an error.
pub fn load_config(repo_root: &Path) -> Result<FileConfig> {
    let path = repo_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let td = tempdir().expect("tempdir");
        let config = load_config(td.path()).expect("load");
        assert!(config.scan.collectors.is_empty());
        assert_eq!(config.scan.max_issues, 0);
        assert_eq!(config.output.format, "beads");
        assert_eq!(config.label_convention(), LabelConvention::Kebab);
    }

    #[test]
    fn full_file_parses() {
        let td = tempdir().expect("tempdir");
        fs::write(
            td.path().join(CONFIG_FILE),
            r#"
[scan]
collectors = ["todos", "churn"]
max_issues = 50
exclude = ["vendor/**"]

[output]
format = "markdown"
labels = "snake"

[collector.todos]
timeout = "30s"
error_mode = "fail"
exclude = ["testdata/**"]
"#,
        )
        .expect("write");

        let config = load_config(td.path()).expect("load");
        assert_eq!(config.scan.collectors, vec!["todos".to_string(), "churn".to_string()]);
        assert_eq!(config.scan.max_issues, 50);
        assert_eq!(config.output.format, "markdown");
        assert_eq!(config.label_convention(), LabelConvention::Snake);

        let scan = config.to_scan_config(td.path().to_path_buf());
        assert_eq!(scan.exclude_patterns, vec!["vendor/**".to_string()]);
        let todos = &scan.collector_opts["todos"];
        assert_eq!(todos.timeout, Some(Duration::from_secs(30)));
        assert_eq!(todos.error_mode, ErrorMode::Fail);
        assert_eq!(todos.exclude_patterns, vec!["testdata/**".to_string()]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join(CONFIG_FILE), "[scan\nbroken").expect("write");
        assert!(load_config(td.path()).is_err());
    }

    #[test]
    fn unknown_label_convention_falls_back_to_kebab() {
        let config = FileConfig {
            output: OutputSection {
                format: "beads".into(),
                labels: "camel".into(),
            },
            ..Default::default()
        };
        assert_eq!(config.label_convention(), LabelConvention::Kebab);
    }
}
