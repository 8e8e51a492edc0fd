use std::io::Write;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use stringer_types::RawSignal;

use crate::identity;

use super::Formatter;

/// Task-list encoder: signals as actionable task records wrapped in a
/// `{tasks, metadata}` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct TasksFormatter;

#[derive(Serialize)]
struct TaskRecord {
    id: String,
    subject: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(rename = "activeForm")]
    active_form: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

#[derive(Serialize)]
struct TasksEnvelope {
    tasks: Vec<TaskRecord>,
    metadata: EnvelopeMetadata,
}

#[derive(Serialize)]
struct EnvelopeMetadata {
    total_count: usize,
    generated_at: String,
}

fn subject_keyword(kind: &str) -> Option<&'static str> {
    match kind {
        "todo" => Some("TODO"),
        "bug" | "fixme" => Some("BUG"),
        "hack" | "xxx" => Some("HACK"),
        _ => None,
    }
}

/// True when `title` already begins with `keyword` at a word boundary:
/// the exact keyword followed by a non-alphanumeric byte (or nothing).
fn begins_with_keyword(title: &str, keyword: &str) -> bool {
    // `get` rejects both short titles and a keyword length that lands
    // inside a multibyte character.
    let Some(head) = title.get(..keyword.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    match title.as_bytes().get(keyword.len()) {
        None => true,
        Some(b) => !b.is_ascii_alphanumeric(),
    }
}

fn subject(signal: &RawSignal) -> String {
    match subject_keyword(&signal.kind) {
        Some(keyword) if !begins_with_keyword(&signal.title, keyword) => {
            format!("{keyword}: {}", signal.title)
        }
        _ => signal.title.clone(),
    }
}

fn active_form(signal: &RawSignal) -> String {
    match signal.kind.as_str() {
        "bug" | "fixme" => format!("Fixing {}", signal.title),
        "todo" | "hack" | "xxx" => format!("Addressing {}", signal.title),
        _ => format!("Investigating {}", signal.title),
    }
}

fn description(signal: &RawSignal) -> String {
    let mut lines = Vec::new();
    if !signal.description.is_empty() {
        lines.push(signal.description.clone());
    }
    if !signal.source.is_empty() {
        lines.push(format!("Source: {} collector", signal.source));
    }
    if !signal.file_path.is_empty() {
        if signal.line > 0 {
            lines.push(format!("File: {}:{}", signal.file_path, signal.line));
        } else {
            lines.push(format!("File: {}", signal.file_path));
        }
    }
    if !signal.author.is_empty() {
        lines.push(format!("Author: {}", signal.author));
    }
    lines.push(format!("Confidence: {:.0}%", signal.confidence * 100.0));
    lines.push(format!("Priority: P{}", signal.effective_priority()));
    if !signal.tags.is_empty() {
        lines.push(format!("Tags: {}", signal.tags.join(", ")));
    }
    lines.join("\n")
}

fn metadata(signal: &RawSignal) -> Option<Value> {
    let mut map = Map::new();
    map.insert("source".into(), json!(signal.source));
    map.insert("kind".into(), json!(signal.kind));
    if !signal.file_path.is_empty() {
        map.insert("file".into(), json!(signal.file_path));
    }
    if signal.line > 0 {
        map.insert("line".into(), json!(signal.line));
    }
    map.insert("confidence".into(), json!(signal.confidence));
    if !signal.workspace.is_empty() {
        map.insert("workspace".into(), json!(signal.workspace));
    }
    if !signal.tags.is_empty() {
        map.insert("tags".into(), json!(signal.tags));
    }
    Some(Value::Object(map))
}

impl Formatter for TasksFormatter {
    fn name(&self) -> &str {
        "tasks"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        let tasks: Vec<TaskRecord> = signals
            .iter()
            .map(|signal| TaskRecord {
                id: identity::output_id(signal),
                subject: subject(signal),
                description: description(signal),
                active_form: active_form(signal),
                status: if signal.closed_at.is_some() {
                    "completed"
                } else {
                    "pending"
                },
                metadata: metadata(signal),
            })
            .collect();

        let envelope = TasksEnvelope {
            metadata: EnvelopeMetadata {
                total_count: tasks.len(),
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            tasks,
        };

        serde_json::to_writer_pretty(&mut *writer, &envelope)
            .context("failed to serialize task envelope")?;
        writer.write_all(b"\n").context("write trailing newline")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signal(kind: &str, title: &str) -> RawSignal {
        RawSignal {
            source: "todos".into(),
            kind: kind.into(),
            file_path: "main.go".into(),
            line: 10,
            title: title.into(),
            confidence: 0.5,
            ..Default::default()
        }
    }

    fn encode(signals: &[RawSignal]) -> serde_json::Value {
        let mut buf = Vec::new();
        TasksFormatter.format(signals, &mut buf).expect("format");
        serde_json::from_slice(&buf).expect("valid JSON")
    }

    #[test]
    fn subject_is_prefixed_by_kind() {
        let parsed = encode(&[signal("todo", "add rate limiting")]);
        assert_eq!(parsed["tasks"][0]["subject"], "TODO: add rate limiting");

        let parsed = encode(&[signal("fixme", "overflow")]);
        assert_eq!(parsed["tasks"][0]["subject"], "BUG: overflow");

        let parsed = encode(&[signal("xxx", "sketchy cast")]);
        assert_eq!(parsed["tasks"][0]["subject"], "HACK: sketchy cast");
    }

    #[test]
    fn existing_keyword_is_not_doubled() {
        let parsed = encode(&[signal("todo", "TODO: already tagged")]);
        assert_eq!(parsed["tasks"][0]["subject"], "TODO: already tagged");

        let parsed = encode(&[signal("todo", "todo: lowercase tag")]);
        assert_eq!(parsed["tasks"][0]["subject"], "todo: lowercase tag");
    }

    #[test]
    fn keyword_requires_word_boundary() {
        // "TODOs" is a word, not the keyword: prefix applies.
        let parsed = encode(&[signal("todo", "TODOs are piling up")]);
        assert_eq!(parsed["tasks"][0]["subject"], "TODO: TODOs are piling up");
    }

    #[test]
    fn bare_keyword_title_counts_as_boundary() {
        let parsed = encode(&[signal("todo", "TODO")]);
        assert_eq!(parsed["tasks"][0]["subject"], "TODO");
    }

    #[test]
    fn multibyte_title_shorter_than_keyword_boundary_is_prefixed() {
        // "café" is five bytes; byte four sits inside the 'é'. The
        // boundary probe must not panic there.
        let parsed = encode(&[signal("todo", "café")]);
        assert_eq!(parsed["tasks"][0]["subject"], "TODO: café");

        let parsed = encode(&[signal("fixme", "héllo world")]);
        assert_eq!(parsed["tasks"][0]["subject"], "BUG: héllo world");
    }

    #[test]
    fn active_form_by_kind() {
        assert_eq!(
            encode(&[signal("fixme", "X")])["tasks"][0]["activeForm"],
            "Fixing X"
        );
        assert_eq!(
            encode(&[signal("todo", "X")])["tasks"][0]["activeForm"],
            "Addressing X"
        );
        assert_eq!(
            encode(&[signal("churn", "X")])["tasks"][0]["activeForm"],
            "Investigating X"
        );
    }

    #[test]
    fn description_lists_context_one_per_line() {
        let mut s = signal("todo", "X");
        s.description = "context".into();
        s.author = "ada".into();
        s.tags = vec!["debt".into(), "api".into()];
        let parsed = encode(&[s]);
        let description = parsed["tasks"][0]["description"].as_str().unwrap();
        let lines: Vec<&str> = description.lines().collect();
        assert_eq!(
            lines,
            vec![
                "context",
                "Source: todos collector",
                "File: main.go:10",
                "Author: ada",
                "Confidence: 50%",
                "Priority: P3",
                "Tags: debt, api",
            ]
        );
    }

    #[test]
    fn status_tracks_closed_at() {
        let parsed = encode(&[signal("todo", "X")]);
        assert_eq!(parsed["tasks"][0]["status"], "pending");

        let mut s = signal("todo", "X");
        s.closed_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let parsed = encode(&[s]);
        assert_eq!(parsed["tasks"][0]["status"], "completed");
    }

    #[test]
    fn metadata_contains_present_fields_only() {
        let mut s = signal("todo", "X");
        s.file_path = String::new();
        s.line = 0;
        let parsed = encode(&[s]);
        let metadata = parsed["tasks"][0]["metadata"].as_object().unwrap();
        assert!(metadata.contains_key("source"));
        assert!(metadata.contains_key("kind"));
        assert!(!metadata.contains_key("file"));
        assert!(!metadata.contains_key("line"));
    }

    #[test]
    fn envelope_counts_tasks() {
        let parsed = encode(&[signal("todo", "a"), signal("todo", "b")]);
        assert_eq!(parsed["metadata"]["total_count"], 2);
        assert_eq!(parsed["tasks"].as_array().unwrap().len(), 2);
    }
}
