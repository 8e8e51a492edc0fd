use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use stringer_types::RawSignal;

use super::Formatter;

const TOP_FILES: usize = 20;

/// Kinds bucketed into the TODO-age chart.
const TODO_KINDS: &[&str] = &["todo", "fixme", "hack", "xxx", "bug", "optimize"];

/// Age bucket labels, youngest first.
pub const AGE_BUCKET_LABELS: [&str; 5] = ["< 1w", "1-4w", "1-3m", "3-12m", "> 1y"];

/// Everything the dashboard template consumes, precomputed from the
/// signal list so rendering stays dumb.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardData {
    pub total: usize,
    /// Signal counts for P1..P4.
    pub priority_counts: [usize; 4],
    /// Signal counts per collector.
    pub collector_counts: BTreeMap<String, usize>,
    /// Top churn files by descending signal count.
    pub top_churn_files: Vec<FileCount>,
    /// Top lottery-risk directories by descending confidence.
    pub top_lottery_dirs: Vec<DirRisk>,
    /// TODO-age bucket counts: < 1w, 1-4w, 1-3m, 3-12m, > 1y.
    pub todo_age_buckets: [usize; 5],
}

#[derive(Debug, Clone, Serialize)]
pub struct FileCount {
    pub path: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirRisk {
    pub directory: String,
    pub confidence: f64,
}

/// Directory of a repo-relative path, or the path itself when it has no
/// directory component.
fn directory_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => path,
    }
}

fn age_bucket(age_days: i64) -> usize {
    if age_days < 7 {
        0
    } else if age_days < 28 {
        1
    } else if age_days < 90 {
        2
    } else if age_days < 365 {
        3
    } else {
        4
    }
}

/// Precompute the dashboard data from a signal list. `now` is passed in
/// so the age buckets stay testable.
pub fn dashboard_data(signals: &[RawSignal], now: DateTime<Utc>) -> DashboardData {
    let mut data = DashboardData {
        total: signals.len(),
        ..Default::default()
    };

    let mut churn_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut lottery_risk: BTreeMap<&str, f64> = BTreeMap::new();

    for signal in signals {
        let p = signal.effective_priority().clamp(1, 4) as usize;
        data.priority_counts[p - 1] += 1;

        if !signal.source.is_empty() {
            *data.collector_counts.entry(signal.source.clone()).or_default() += 1;
        }

        if signal.kind == "churn" && !signal.file_path.is_empty() {
            *churn_counts.entry(signal.file_path.as_str()).or_default() += 1;
        }

        if signal.kind == "low-lottery-risk" && !signal.file_path.is_empty() {
            let dir = directory_of(&signal.file_path);
            let entry = lottery_risk.entry(dir).or_default();
            if signal.confidence > *entry {
                *entry = signal.confidence;
            }
        }

        if TODO_KINDS.contains(&signal.kind.as_str())
            && let Some(ts) = signal.timestamp
        {
            let age_days = (now - ts).num_days();
            data.todo_age_buckets[age_bucket(age_days.max(0))] += 1;
        }
    }

    let mut churn: Vec<FileCount> = churn_counts
        .into_iter()
        .map(|(path, count)| FileCount {
            path: path.to_string(),
            count,
        })
        .collect();
    churn.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
    churn.truncate(TOP_FILES);
    data.top_churn_files = churn;

    let mut lottery: Vec<DirRisk> = lottery_risk
        .into_iter()
        .map(|(directory, confidence)| DirRisk {
            directory: directory.to_string(),
            confidence,
        })
        .collect();
    lottery.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.directory.cmp(&b.directory))
    });
    lottery.truncate(TOP_FILES);
    data.top_lottery_dirs = lottery;

    data
}

/// HTML-escape user-supplied text before interpolation.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render(data: &DashboardData, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "<!DOCTYPE html>").context("write html")?;
    writeln!(writer, "<html lang=\"en\">").context("write html")?;
    writeln!(writer, "<head>").context("write html")?;
    writeln!(writer, "<meta charset=\"utf-8\">").context("write html")?;
    writeln!(writer, "<title>Stringer Dashboard</title>").context("write html")?;
    writeln!(
        writer,
        "<style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:4px 8px;text-align:left}}</style>"
    )
    .context("write html")?;
    writeln!(writer, "</head>").context("write html")?;
    writeln!(writer, "<body>").context("write html")?;
    writeln!(writer, "<h1>Stringer Dashboard</h1>").context("write html")?;
    writeln!(writer, "<p>{} signal(s)</p>", data.total).context("write html")?;

    writeln!(writer, "<h2>Priority distribution</h2>").context("write html")?;
    writeln!(writer, "<table><tr><th>Priority</th><th>Count</th></tr>").context("write html")?;
    for (idx, count) in data.priority_counts.iter().enumerate() {
        writeln!(writer, "<tr><td>P{}</td><td>{}</td></tr>", idx + 1, count)
            .context("write html")?;
    }
    writeln!(writer, "</table>").context("write html")?;

    writeln!(writer, "<h2>Signals per collector</h2>").context("write html")?;
    writeln!(writer, "<table><tr><th>Collector</th><th>Count</th></tr>").context("write html")?;
    for (collector, count) in &data.collector_counts {
        writeln!(
            writer,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(collector),
            count
        )
        .context("write html")?;
    }
    writeln!(writer, "</table>").context("write html")?;

    if !data.top_churn_files.is_empty() {
        writeln!(writer, "<h2>Top churn files</h2>").context("write html")?;
        writeln!(writer, "<table><tr><th>File</th><th>Signals</th></tr>").context("write html")?;
        for entry in &data.top_churn_files {
            writeln!(
                writer,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&entry.path),
                entry.count
            )
            .context("write html")?;
        }
        writeln!(writer, "</table>").context("write html")?;
    }

    if !data.top_lottery_dirs.is_empty() {
        writeln!(writer, "<h2>Lottery-risk directories</h2>").context("write html")?;
        writeln!(writer, "<table><tr><th>Directory</th><th>Confidence</th></tr>")
            .context("write html")?;
        for entry in &data.top_lottery_dirs {
            writeln!(
                writer,
                "<tr><td>{}</td><td>{:.2}</td></tr>",
                escape(&entry.directory),
                entry.confidence
            )
            .context("write html")?;
        }
        writeln!(writer, "</table>").context("write html")?;
    }

    writeln!(writer, "<h2>TODO age</h2>").context("write html")?;
    writeln!(writer, "<table><tr><th>Age</th><th>Count</th></tr>").context("write html")?;
    for (label, count) in AGE_BUCKET_LABELS.iter().zip(data.todo_age_buckets.iter()) {
        writeln!(writer, "<tr><td>{}</td><td>{}</td></tr>", escape(label), count)
            .context("write html")?;
    }
    writeln!(writer, "</table>").context("write html")?;

    writeln!(writer, "<h2>Signals</h2>").context("write html")?;
    writeln!(
        writer,
        "<table><tr><th>Title</th><th>Kind</th><th>Location</th><th>Confidence</th></tr>"
    )
    .context("write html")?;
    for signal in signals {
        let location = if signal.file_path.is_empty() {
            String::new()
        } else if signal.line > 0 {
            format!("{}:{}", signal.file_path, signal.line)
        } else {
            signal.file_path.clone()
        };
        writeln!(
            writer,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            escape(&signal.title),
            escape(&signal.kind),
            escape(&location),
            signal.confidence
        )
        .context("write html")?;
    }
    writeln!(writer, "</table>").context("write html")?;

    writeln!(writer, "</body>").context("write html")?;
    writeln!(writer, "</html>").context("write html")?;
    Ok(())
}

/// Single-file HTML dashboard encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFormatter;

impl Formatter for HtmlFormatter {
    fn name(&self) -> &str {
        "html"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        let data = dashboard_data(signals, Utc::now());
        render(&data, signals, writer)
    }
}

/// Directory-emitting HTML encoder: `index.html` plus the precomputed
/// dashboard data as `data.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDirFormatter;

impl Formatter for HtmlDirFormatter {
    fn name(&self) -> &str {
        "html-dir"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        HtmlFormatter.format(signals, writer)
    }

    fn format_dir(&self, signals: &[RawSignal], dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output dir {}", dir.display()))?;

        let data = dashboard_data(signals, Utc::now());

        let index_path = dir.join("index.html");
        let mut index = Vec::new();
        render(&data, signals, &mut index)?;
        fs::write(&index_path, index)
            .with_context(|| format!("failed to write {}", index_path.display()))?;

        let data_path = dir.join("data.json");
        let json = serde_json::to_vec_pretty(&data).context("failed to serialize dashboard data")?;
        fs::write(&data_path, json)
            .with_context(|| format!("failed to write {}", data_path.display()))?;

        Ok(())
    }
}
