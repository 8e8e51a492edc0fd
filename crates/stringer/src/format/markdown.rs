use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use anyhow::{Context, Result};

use stringer_types::RawSignal;

use super::Formatter;

/// Markdown report encoder: heading, summary, priority table, and one
/// section per collector. When signals span more than one workspace the
/// collector sections nest under per-workspace headings. Empty input
/// produces empty output.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

fn location(signal: &RawSignal) -> Option<String> {
    if signal.file_path.is_empty() {
        return None;
    }
    if signal.line > 0 {
        Some(format!("{}:{}", signal.file_path, signal.line))
    } else {
        Some(signal.file_path.clone())
    }
}

fn bullet(signal: &RawSignal) -> String {
    match location(signal) {
        Some(loc) => format!(
            "- **{}** — `{}` (confidence: {:.2})",
            signal.title, loc, signal.confidence
        ),
        None => format!("- **{}** (confidence: {:.2})", signal.title, signal.confidence),
    }
}

fn write_collector_sections(
    signals: &[&RawSignal],
    heading: &str,
    writer: &mut dyn Write,
) -> Result<()> {
    // Collector sections sorted alphabetically; signals within a
    // collector retain input order.
    let mut by_collector: BTreeMap<&str, Vec<&RawSignal>> = BTreeMap::new();
    for &signal in signals {
        by_collector.entry(signal.source.as_str()).or_default().push(signal);
    }

    for (collector, entries) in by_collector {
        writeln!(writer, "{heading} {collector}").context("write collector heading")?;
        writeln!(writer).context("write separator")?;
        for signal in entries {
            writeln!(writer, "{}", bullet(signal)).context("write signal bullet")?;
        }
        writeln!(writer).context("write separator")?;
    }
    Ok(())
}

impl Formatter for MarkdownFormatter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        if signals.is_empty() {
            return Ok(());
        }

        let collectors: BTreeSet<&str> = signals
            .iter()
            .filter(|s| !s.source.is_empty())
            .map(|s| s.source.as_str())
            .collect();

        writeln!(writer, "# Stringer Scan Report").context("write heading")?;
        writeln!(writer).context("write separator")?;
        writeln!(
            writer,
            "{} signal(s) across {} collector(s).",
            signals.len(),
            collectors.len()
        )
        .context("write summary")?;
        writeln!(writer).context("write separator")?;

        let mut priority_counts = [0usize; 4];
        for signal in signals {
            let p = signal.effective_priority().clamp(1, 4) as usize;
            priority_counts[p - 1] += 1;
        }
        writeln!(writer, "| Priority | Count |").context("write table")?;
        writeln!(writer, "|----------|-------|").context("write table")?;
        for (idx, count) in priority_counts.iter().enumerate() {
            writeln!(writer, "| P{} | {} |", idx + 1, count).context("write table")?;
        }
        writeln!(writer).context("write separator")?;

        let workspaces: BTreeSet<&str> = signals.iter().map(|s| s.workspace.as_str()).collect();
        if workspaces.len() > 1 {
            let mut by_workspace: BTreeMap<&str, Vec<&RawSignal>> = BTreeMap::new();
            for signal in signals {
                by_workspace.entry(signal.workspace.as_str()).or_default().push(signal);
            }
            for (workspace, entries) in by_workspace {
                let label = if workspace.is_empty() { "(default)" } else { workspace };
                writeln!(writer, "## {label}").context("write workspace heading")?;
                writeln!(writer).context("write separator")?;
                write_collector_sections(&entries, "###", writer)?;
            }
        } else {
            let all: Vec<&RawSignal> = signals.iter().collect();
            write_collector_sections(&all, "##", writer)?;
        }

        Ok(())
    }
}
