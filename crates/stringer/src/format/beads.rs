use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use stringer_types::RawSignal;

use crate::identity;

use super::Formatter;

/// Naming convention for the generated marker label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelConvention {
    /// `stringer-generated`
    #[default]
    Kebab,
    /// `stringer_generated`
    Snake,
}

impl LabelConvention {
    fn generated_label(self) -> &'static str {
        match self {
            LabelConvention::Kebab => "stringer-generated",
            LabelConvention::Snake => "stringer_generated",
        }
    }
}

/// JSONL issue encoder: one JSON object per signal, one per line, no
/// enclosing array. Empty input produces empty output.
#[derive(Debug, Clone, Default)]
pub struct BeadsFormatter {
    pub convention: LabelConvention,
}

#[derive(Serialize)]
struct BeadRecord {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(rename = "type")]
    issue_type: &'static str,
    priority: u8,
    status: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    created_at: String,
    created_by: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    closed_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    close_reason: String,
}

fn issue_type(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        "bug" | "fixme" | "github-bug" => "bug",
        "todo" => "task",
        "hack" | "xxx" | "optimize" | "low-lottery-risk" => "chore",
        k if k.starts_with("github-") => "task",
        _ => "task",
    }
}

fn close_reason(kind: &str) -> &'static str {
    match kind {
        "github-merged-pr" => "merged",
        "github-closed-pr" => "closed",
        "github-closed-issue" => "completed",
        _ => "resolved",
    }
}

fn format_instant(instant: Option<DateTime<Utc>>) -> String {
    match instant {
        Some(t) => t.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => String::new(),
    }
}

fn location_line(signal: &RawSignal) -> Option<String> {
    if signal.file_path.is_empty() {
        return None;
    }
    if signal.line > 0 {
        Some(format!("Location: {}:{}", signal.file_path, signal.line))
    } else {
        Some(format!("Location: {}", signal.file_path))
    }
}

impl BeadsFormatter {
    fn record(&self, signal: &RawSignal) -> BeadRecord {
        let mut description_parts = Vec::new();
        if !signal.description.is_empty() {
            description_parts.push(signal.description.clone());
        }
        if let Some(location) = location_line(signal) {
            description_parts.push(location);
        }

        let mut labels = signal.tags.clone();
        labels.push(self.convention.generated_label().to_string());
        if !signal.source.is_empty() {
            labels.push(signal.source.clone());
        }
        if !signal.workspace.is_empty() {
            labels.push(format!("workspace:{}", signal.workspace));
        }

        let pre_closed = signal.is_pre_closed();
        let created_by = if signal.author.is_empty() {
            "stringer".to_string()
        } else {
            signal.author.clone()
        };

        BeadRecord {
            id: identity::output_id(signal),
            title: signal.title.clone(),
            description: description_parts.join("\n\n"),
            issue_type: issue_type(&signal.kind),
            priority: signal.effective_priority(),
            status: if pre_closed { "closed" } else { "open" },
            created_at: format_instant(signal.timestamp),
            created_by,
            labels,
            closed_at: if pre_closed {
                format_instant(signal.closed_at)
            } else {
                String::new()
            },
            close_reason: if pre_closed {
                close_reason(&signal.kind).to_string()
            } else {
                String::new()
            },
        }
    }
}

impl Formatter for BeadsFormatter {
    fn name(&self) -> &str {
        "beads"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        for signal in signals {
            let record = self.record(signal);
            let line = serde_json::to_string(&record).context("failed to serialize bead record")?;
            writeln!(writer, "{line}").context("write bead line")?;
        }
        Ok(())
    }
}
