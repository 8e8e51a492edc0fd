use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use stringer_types::RawSignal;

use crate::identity;

use super::Formatter;

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
const SARIF_VERSION: &str = "2.1.0";
const FINGERPRINT_KEY: &str = "stringer/v1";

/// SARIF 2.1.0 encoder: one run named `stringer`, one rule per distinct
/// signal kind, one result per signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SarifFormatter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLog {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<Run>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Run {
    tool: Tool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct Tool {
    driver: Driver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Driver {
    name: &'static str,
    rules: Vec<Rule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Rule {
    id: String,
    short_description: Message,
}

#[derive(Serialize)]
struct Message {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    rule_index: usize,
    level: &'static str,
    message: Message,
    rank: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    locations: Vec<Location>,
    partial_fingerprints: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    physical_location: PhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhysicalLocation {
    artifact_location: ArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
}

#[derive(Serialize)]
struct ArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Region {
    start_line: u32,
}

fn level_for_priority(priority: u8) -> &'static str {
    match priority {
        1 => "error",
        2 => "warning",
        3 => "note",
        _ => "none",
    }
}

fn location_for(signal: &RawSignal) -> Vec<Location> {
    if signal.file_path.is_empty() {
        return Vec::new();
    }
    vec![Location {
        physical_location: PhysicalLocation {
            artifact_location: ArtifactLocation {
                uri: signal.file_path.clone(),
            },
            region: if signal.line > 0 {
                Some(Region {
                    start_line: signal.line,
                })
            } else {
                None
            },
        },
    }]
}

impl Formatter for SarifFormatter {
    fn name(&self) -> &str {
        "sarif"
    }

    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()> {
        // One rule per distinct kind, sorted; results reference rules by index.
        let kinds: Vec<&str> = signals
            .iter()
            .map(|s| s.kind.as_str())
            .collect::<std::collections::BTreeSet<&str>>()
            .into_iter()
            .collect();
        let rule_index: BTreeMap<&str, usize> =
            kinds.iter().enumerate().map(|(idx, kind)| (*kind, idx)).collect();

        let rules: Vec<Rule> = kinds
            .iter()
            .map(|kind| Rule {
                id: (*kind).to_string(),
                short_description: Message {
                    text: format!("{kind} signal"),
                },
            })
            .collect();

        let results: Vec<SarifResult> = signals
            .iter()
            .map(|signal| SarifResult {
                rule_id: signal.kind.clone(),
                rule_index: rule_index[signal.kind.as_str()],
                level: level_for_priority(signal.effective_priority()),
                message: Message {
                    text: signal.title.clone(),
                },
                rank: signal.confidence * 100.0,
                locations: location_for(signal),
                partial_fingerprints: BTreeMap::from([(
                    FINGERPRINT_KEY,
                    identity::signal_hash(signal),
                )]),
            })
            .collect();

        let log = SarifLog {
            schema: SARIF_SCHEMA,
            version: SARIF_VERSION,
            runs: vec![Run {
                tool: Tool {
                    driver: Driver {
                        name: "stringer",
                        rules,
                    },
                },
                results,
            }],
        };

        serde_json::to_writer_pretty(&mut *writer, &log)
            .context("failed to serialize SARIF log")?;
        writer.write_all(b"\n").context("write trailing newline")?;
        Ok(())
    }
}
