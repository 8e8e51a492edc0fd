//! Pluggable report sections: each consumes the structured metrics a
//! collector published into [`ScanResult::metrics`] and renders one
//! human-readable block. Sections that cannot find their inputs are
//! skipped, not failed.

use std::io::Write;
use std::sync::{LazyLock, RwLock};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use stringer_types::ScanResult;

use crate::collectors::churn::ChurnMetrics;
use crate::collectors::todos::TodoMetrics;

/// The fixed catalog of section names stringer knows about. Only the
/// registry protocol is mandated; concrete analyses ship with their
/// collectors.
pub const SECTION_CATALOG: &[&str] = &[
    "lottery-risk",
    "churn",
    "todo-age",
    "coverage",
    "complexity",
    "hotspots",
    "git-hygiene",
    "trends",
    "recommendations",
    "module-summary",
];

/// Section analysis error. `MetricsNotAvailable` is a sentinel, rendered
/// as `status: skipped`; everything else is a real failure.
#[derive(Debug, Error)]
pub enum SectionError {
    #[error("metrics not available: {0}")]
    MetricsNotAvailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One report section. `analyze` must be idempotent: calling it again
/// resets any counters built from prior input.
pub trait Section: Send {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn analyze(&mut self, result: &ScanResult) -> Result<(), SectionError>;
    fn render(&self, writer: &mut dyn Write) -> Result<()>;
}

type SectionFactory = fn() -> Box<dyn Section>;

static REGISTRY: LazyLock<RwLock<Vec<(String, SectionFactory)>>> =
    LazyLock::new(|| RwLock::new(Vec::new()));

/// Register a section factory process-wide. Registration order is
/// retained for deterministic listing; a duplicate name panics.
pub fn register(factory: SectionFactory) {
    let name = factory().name().to_string();
    let duplicate = {
        let mut registry = REGISTRY.write().unwrap();
        if registry.iter().any(|(existing, _)| *existing == name) {
            true
        } else {
            registry.push((name.clone(), factory));
            false
        }
    };
    if duplicate {
        panic!("report section {name:?} is already registered");
    }
}

/// Fresh instances of every registered section, in registration order.
pub fn sections() -> Vec<Box<dyn Section>> {
    REGISTRY
        .read()
        .unwrap()
        .iter()
        .map(|(_, factory)| factory())
        .collect()
}

/// Registered `(name, description)` pairs in registration order.
pub fn list() -> Vec<(String, String)> {
    sections()
        .iter()
        .map(|s| (s.name().to_string(), s.description().to_string()))
        .collect()
}

/// Snapshot the registry contents so a test can restore them afterwards.
/// Production code never calls this.
#[doc(hidden)]
pub fn snapshot() -> Vec<(String, SectionFactory)> {
    REGISTRY.read().unwrap().clone()
}

/// Replace the registry contents with a previously taken snapshot.
/// Production code never calls this.
#[doc(hidden)]
pub fn restore(entries: Vec<(String, SectionFactory)>) {
    *REGISTRY.write().unwrap() = entries;
}

static INSTALLED: std::sync::OnceLock<()> = std::sync::OnceLock::new();

/// Register the built-in sections. Idempotent.
pub fn install() {
    INSTALLED.get_or_init(|| {
        register(|| Box::new(ChurnSection::default()));
        register(|| Box::new(TodoAgeSection::default()));
    });
}

/// Analyze and render every section as text. A section whose metrics are
/// missing is surfaced as skipped; any other analysis error aborts.
pub fn render_text(
    sections: &mut [Box<dyn Section>],
    result: &ScanResult,
    writer: &mut dyn Write,
) -> Result<()> {
    for section in sections {
        match section.analyze(result) {
            Ok(()) => {
                writeln!(writer, "## {}", section.name()).context("write section heading")?;
                section.render(writer)?;
                writeln!(writer).context("write section separator")?;
            }
            Err(SectionError::MetricsNotAvailable(key)) => {
                writeln!(writer, "## {} (skipped: {key})", section.name())
                    .context("write skipped section")?;
                writeln!(writer).context("write section separator")?;
            }
            Err(SectionError::Other(err)) => return Err(err),
        }
    }
    Ok(())
}

/// One section's outcome in the JSON rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub name: String,
    pub description: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Analyze and render every section into JSON-ready reports.
pub fn render_json(
    sections: &mut [Box<dyn Section>],
    result: &ScanResult,
) -> Result<Vec<SectionReport>> {
    let mut reports = Vec::new();
    for section in sections {
        let report = match section.analyze(result) {
            Ok(()) => {
                let mut buf = Vec::new();
                section.render(&mut buf)?;
                SectionReport {
                    name: section.name().to_string(),
                    description: section.description().to_string(),
                    status: "ok",
                    content: Some(String::from_utf8_lossy(&buf).into_owned()),
                }
            }
            Err(SectionError::MetricsNotAvailable(_)) => SectionReport {
                name: section.name().to_string(),
                description: section.description().to_string(),
                status: "skipped",
                content: None,
            },
            Err(SectionError::Other(err)) => return Err(err),
        };
        reports.push(report);
    }
    Ok(reports)
}

/// Churn hotspot summary fed by the `churn` collector's metrics.
#[derive(Debug, Default)]
pub struct ChurnSection {
    metrics: Option<ChurnMetrics>,
}

impl Section for ChurnSection {
    fn name(&self) -> &str {
        "churn"
    }

    fn description(&self) -> &str {
        "Files changing most often in the recent history window"
    }

    fn analyze(&mut self, result: &ScanResult) -> Result<(), SectionError> {
        self.metrics = None;
        let value = result
            .metrics
            .get("churn")
            .ok_or_else(|| SectionError::MetricsNotAvailable("churn".into()))?;
        let metrics: ChurnMetrics = serde_json::from_value(value.clone())
            .context("churn metrics have unexpected shape")?;
        self.metrics = Some(metrics);
        Ok(())
    }

    fn render(&self, writer: &mut dyn Write) -> Result<()> {
        let Some(metrics) = &self.metrics else {
            return Ok(());
        };
        writeln!(
            writer,
            "{} commit(s) scanned, {} file(s) tracked.",
            metrics.commits_scanned, metrics.files_tracked
        )
        .context("write churn summary")?;
        for file in &metrics.top_files {
            writeln!(writer, "  {} ({} commit(s))", file.path, file.commits)
                .context("write churn file")?;
        }
        Ok(())
    }
}

/// TODO marker summary fed by the `todos` collector's metrics.
#[derive(Debug, Default)]
pub struct TodoAgeSection {
    metrics: Option<TodoMetrics>,
}

impl Section for TodoAgeSection {
    fn name(&self) -> &str {
        "todo-age"
    }

    fn description(&self) -> &str {
        "Outstanding TODO-style markers by kind"
    }

    fn analyze(&mut self, result: &ScanResult) -> Result<(), SectionError> {
        self.metrics = None;
        let value = result
            .metrics
            .get("todos")
            .ok_or_else(|| SectionError::MetricsNotAvailable("todos".into()))?;
        let metrics: TodoMetrics = serde_json::from_value(value.clone())
            .context("todos metrics have unexpected shape")?;
        self.metrics = Some(metrics);
        Ok(())
    }

    fn render(&self, writer: &mut dyn Write) -> Result<()> {
        let Some(metrics) = &self.metrics else {
            return Ok(());
        };
        writeln!(
            writer,
            "{} marker(s) across {} file(s).",
            metrics.total, metrics.files_scanned
        )
        .context("write todo summary")?;
        for (marker, count) in &metrics.marker_counts {
            writeln!(writer, "  {marker}: {count}").context("write marker count")?;
        }
        Ok(())
    }
}
