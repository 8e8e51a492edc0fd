use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use stringer_types::RawSignal;

use super::Formatter;

/// Envelope JSON encoder: the full signal records plus scan metadata in a
/// single object. Pretty-printed by default; the `compact` flag forces
/// single-line output (the CLI sets it when stdout is a pipe). Always
/// terminated with a newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    pub compact: bool,
}

impl JsonFormatter {
    pub fn compact() -> Self {
        Self { compact: true }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    signals: &'a [RawSignal],
    metadata: Metadata,
}

#[derive(Serialize)]
struct Metadata {
    total_count: usize,
    collectors: Vec<String>,
    generated_at: String,
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        let collectors: BTreeSet<&str> = signals
            .iter()
            .filter(|s| !s.source.is_empty())
            .map(|s| s.source.as_str())
            .collect();

        let envelope = Envelope {
            signals,
            metadata: Metadata {
                total_count: signals.len(),
                collectors: collectors.into_iter().map(String::from).collect(),
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        };

        if self.compact {
            serde_json::to_writer(&mut *writer, &envelope)
        } else {
            serde_json::to_writer_pretty(&mut *writer, &envelope)
        }
        .context("failed to serialize signal envelope")?;
        writer.write_all(b"\n").context("write trailing newline")?;
        Ok(())
    }
}
