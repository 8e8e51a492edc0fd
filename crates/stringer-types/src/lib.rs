//! # Types
//!
//! Core domain types for stringer: signals, collector options, scan
//! configuration, per-collector results, and scan-state snapshots.
//!
//! The fundamental unit is the [`RawSignal`] — one extracted observation
//! about a repository (an unresolved TODO, a churn hotspot, a revert).
//! Everything downstream of a collector consumes or transforms signals:
//! - [`ScanConfig`] - Input configuration for one scan
//! - [`CollectorOpts`] - Per-collector runtime knobs
//! - [`CollectorResult`] - Faithful log of one collector's run
//! - [`ScanResult`] - Aggregate of a completed scan
//! - [`ScanState`] / [`SignalMeta`] - Compact persisted snapshot for diffing
//! - [`Bead`] - An existing backlog record used for reopen-prevention
//!
//! ## Serialization
//!
//! Most types implement `Serialize` and `Deserialize` from `serde` for
//! persistence to disk. Durations are serialized as milliseconds and
//! accepted as either milliseconds or humantime strings.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel tag marking a signal as work that is already completed.
/// Encoders emit `status: "closed"` for signals carrying it.
pub const PRE_CLOSED_TAG: &str = "pre-closed";

/// Deserialize a Duration from either a string (human-readable) or u64 (milliseconds)
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationHelper {
        String(String),
        U64(u64),
    }

    match DurationHelper::deserialize(deserializer)? {
        DurationHelper::String(s) => humantime::parse_duration(&s)
            .map_err(|e| serde::de::Error::custom(format!("invalid duration: {}", e))),
        DurationHelper::U64(ms) => Ok(Duration::from_millis(ms)),
    }
}

/// Serialize a Duration as milliseconds (u64) so it roundtrips with deserialize_duration
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Duration helpers for `Option<Duration>` fields (`None` = no timeout).
pub mod opt_duration {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            String(String),
            U64(u64),
        }

        match Option::<Helper>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Helper::String(s)) => humantime::parse_duration(&s)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid duration: {}", e))),
            Some(Helper::U64(ms)) => Ok(Some(Duration::from_millis(ms))),
        }
    }

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }
}

/// One extracted observation about a repository — the pipeline's unit of work.
///
/// Identity is the tuple `(source, kind, file_path, line, title)`; every
/// other field is payload and does not participate in the content hash.
/// A signal is created by a collector and mutated only during the boost
/// phase (confidence may increase) and dedup merge (confidence may be
/// raised by a later duplicate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    /// Name of the collector that produced this signal. Mandatory.
    pub source: String,
    /// Signal kind, e.g. `todo`, `fixme`, `churn`, `revert`,
    /// `low-lottery-risk`, `vulnerable-dependency`.
    pub kind: String,
    /// Repo-relative path, or empty when the signal has no location.
    /// Never absolute.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    /// 1-based line number; 0 means "not applicable".
    #[serde(default)]
    pub line: u32,
    /// Short description. Non-empty after trimming.
    pub title: String,
    /// Optional longer context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Optional author attribution.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// When the underlying observation was made; `None` means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Collector confidence in [0.0, 1.0].
    pub confidence: f64,
    /// Free-form tags. May contain sentinel tags such as [`PRE_CLOSED_TAG`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// When the work was completed; `None` while still open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Explicit priority 1..=4. When present it overrides the
    /// confidence-derived priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// External IDs this signal blocks. Carried through opaquely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<String>,
    /// External IDs this signal depends on. Carried through opaquely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Monorepo workspace name; empty when not workspace-scoped.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace: String,
}

impl RawSignal {
    /// Effective priority: the explicit override when set, otherwise the
    /// confidence-derived mapping of [`priority_for_confidence`].
    pub fn effective_priority(&self) -> u8 {
        match self.priority {
            Some(p) => p,
            None => priority_for_confidence(self.confidence),
        }
    }

    /// Whether the signal carries the [`PRE_CLOSED_TAG`] sentinel.
    pub fn is_pre_closed(&self) -> bool {
        self.tags.iter().any(|t| t == PRE_CLOSED_TAG)
    }
}

/// Map a confidence value to a priority bucket.
///
/// | Confidence | Priority |
/// |---|---|
/// | >= 0.8 | 1 (critical) |
/// | >= 0.6 | 2 (high) |
/// | >= 0.4 | 3 (medium) |
/// | < 0.4 | 4 (low) |
pub fn priority_for_confidence(confidence: f64) -> u8 {
    if confidence >= 0.8 {
        1
    } else if confidence >= 0.6 {
        2
    } else if confidence >= 0.4 {
        3
    } else {
        4
    }
}

/// How a collector error affects the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Error is logged and attached to the collector's result; scan continues.
    #[default]
    Warn,
    /// Error is attached but not logged; scan continues.
    Skip,
    /// Error aborts the scan. Partial results are still returned.
    Fail,
}

/// Per-collector runtime options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorOpts {
    /// Wall-clock budget for one `collect` call. `None` means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_duration")]
    pub timeout: Option<Duration>,
    /// How an error from this collector affects the scan.
    #[serde(default)]
    pub error_mode: ErrorMode,
    /// Glob patterns excluded from this collector's walk. Global patterns
    /// from [`ScanConfig::exclude_patterns`] are prepended at run time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,
}

/// Input configuration for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root of the repository to scan.
    pub repo_path: PathBuf,
    /// Collector names to run. Empty means "all registered, sorted by name".
    #[serde(default)]
    pub collectors: Vec<String>,
    /// Cap on the emitted signal list; 0 disables both the cap and the
    /// priority sort.
    #[serde(default)]
    pub max_issues: usize,
    /// Glob patterns excluded from every collector, applied before any
    /// per-collector patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,
    /// Per-collector option overrides, keyed by collector name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collector_opts: BTreeMap<String, CollectorOpts>,
}

impl ScanConfig {
    /// Options for one collector: the configured override, or defaults.
    pub fn opts_for(&self, collector: &str) -> CollectorOpts {
        self.collector_opts.get(collector).cloned().unwrap_or_default()
    }
}

/// Faithful log of one collector's run. `signals` includes entries later
/// rejected by validation; the aggregate list in [`ScanResult`] does not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorResult {
    /// Collector name.
    pub collector: String,
    /// Every signal the collector produced, in production order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<RawSignal>,
    /// Wall time around the `collect` call, including timeout expiry.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub duration: Duration,
    /// Collector error, when one occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured metrics published by the collector, when it completed
    /// without error and implements the metrics capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

/// Aggregate outcome of a completed scan. Immutable once returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Validated, deduplicated, boosted, ordered, capped signal list.
    pub signals: Vec<RawSignal>,
    /// Per-collector results in the order the collectors were supplied.
    pub results: Vec<CollectorResult>,
    /// Total wall time of the scan.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub duration: Duration,
    /// Collector name → metrics, for collectors that completed without
    /// error and supplied metrics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, serde_json::Value>,
}

/// Compact identity record of one signal inside a persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalMeta {
    pub source: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    #[serde(default)]
    pub line: u32,
    pub title: String,
    /// Why the signal disappeared, when known (e.g. `file_deleted`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resolution: String,
}

impl SignalMeta {
    /// Full identity tuple, used for Added/Removed membership.
    pub fn identity(&self) -> (&str, &str, &str, u32, &str) {
        (
            &self.source,
            &self.kind,
            &self.file_path,
            self.line,
            &self.title,
        )
    }

    /// Location-independent key used to detect moves.
    pub fn move_key(&self) -> (&str, &str, &str) {
        (&self.source, &self.kind, &self.title)
    }
}

impl From<&RawSignal> for SignalMeta {
    fn from(s: &RawSignal) -> Self {
        Self {
            source: s.source.clone(),
            kind: s.kind.clone(),
            file_path: s.file_path.clone(),
            line: s.line,
            title: s.title.clone(),
            resolution: String::new(),
        }
    }
}

/// Persisted snapshot of one scan, used to compute diffs on the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanState {
    /// Schema version tag.
    pub version: String,
    /// Collector names used for the scan, sorted.
    pub collectors: Vec<String>,
    /// Per-signal identity records.
    pub signals: Vec<SignalMeta>,
    /// Total signal count at snapshot time.
    pub total_count: usize,
    /// Git HEAD at snapshot time; empty when not resolvable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_head: String,
    /// When the snapshot was built.
    pub built_at: DateTime<Utc>,
}

/// A moved signal: same `(source, kind, title)`, different location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovedSignal {
    pub from: SignalMeta,
    pub to: SignalMeta,
}

/// Difference between two scan snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffResult {
    /// Present in current, absent from prior.
    pub added: Vec<SignalMeta>,
    /// Present in prior, absent from current.
    pub removed: Vec<SignalMeta>,
    /// Same identity up to location, different `(file_path, line)`.
    pub moved: Vec<MovedSignal>,
}

impl DiffResult {
    /// True when the two snapshots describe identical signal sets.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.moved.is_empty()
    }
}

/// An existing backlog record, read from `.beads/issues.jsonl`.
/// Unknown fields are ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bead {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: Option<i64>,
}

impl Bead {
    /// Whether the record describes completed work. Closed beads still
    /// match incoming signals, preventing re-opening resolved work.
    pub fn is_closed(&self) -> bool {
        self.status.eq_ignore_ascii_case("closed")
    }
}
