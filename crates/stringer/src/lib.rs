//! # Stringer
//!
//! A backlog extractor for source-controlled repositories.
//!
//! Stringer scans a repository for *signals* — small, content-addressed
//! records describing latent work: unresolved TODO comments, churn
//! hotspots, reverts, risk concentrations. Between extraction and output
//! sits a pipeline that validates, deduplicates, boosts, orders, and caps
//! what the collectors found, then hands the result to one of several
//! equivalent output encoders.
//!
//! ## Pipeline
//!
//! The core flow is **collect → validate → dedup → boost → order → emit**:
//!
//! 1. [`pipeline::Pipeline::run`] fans the configured collectors out onto
//!    parallel threads with cooperative cancellation and per-collector
//!    timeouts, then aggregates results in input order.
//! 2. Signals failing validation are dropped from the aggregate list but
//!    stay in their collector's own result log.
//! 3. Duplicates (same identity hash) collapse to the first occurrence,
//!    keeping the highest confidence seen.
//! 4. Co-located trigger kinds (churn, vulnerable-dependency,
//!    low-lottery-risk) boost their file's other signals.
//! 5. With a cap configured, signals are stably ordered by priority and
//!    truncated.
//! 6. An encoder from [`format`] writes the result; [`beads`] can first
//!    drop signals already tracked in an existing backlog.
//!
//! ## Identity
//!
//! A signal's identity is the tuple `(source, kind, file_path, line,
//! title)`. Its content-addressed ID is the first 32 bits of SHA-256 over
//! the null-separated tuple, rendered as 8 hex characters with a `str-`
//! prefix. Dedup, output IDs, and SARIF fingerprints all share this hash.
//!
//! ## Modules
//!
//! - [`pipeline`] — Parallel orchestrator: fan-out, aggregation, error modes
//! - [`collector`] — Collector contract and process-wide registry
//! - [`collectors`] — Built-in collectors (todos, churn)
//! - [`validate`] — Per-signal well-formedness rules
//! - [`identity`] — Content-addressed hashing and output IDs
//! - [`dedup`] — In-scan deduplication
//! - [`boost`] — Co-location boost, priority ordering, capping
//! - [`beads`] — Existing-backlog reader and reopen-prevention filter
//! - [`format`] — Output encoders (beads, json, tasks, markdown, sarif, html)
//! - [`report`] — Report-section registry and built-in sections
//! - [`scanstate`] — Snapshot building and diffing between runs
//! - [`state`] — Snapshot persistence
//! - [`config`] — `.stringer.toml` loading
//! - [`cancel`] — Cooperative cancellation tokens
//! - [`git`] — Best-effort git helpers

/// Existing-backlog reader and reopen-prevention filter.
pub mod beads;

/// Co-location boost, priority ordering, capping.
pub mod boost;

/// Cooperative cancellation tokens with optional deadlines.
pub mod cancel;

/// Collector contract and process-wide registry.
pub mod collector;

/// Built-in collectors.
pub mod collectors;

/// Configuration file (`.stringer.toml`) loading.
pub mod config;

/// In-scan deduplication.
pub mod dedup;

/// Output encoders and their registry.
pub mod format;

/// Best-effort git helpers.
pub mod git;

/// Content-addressed hashing and output IDs.
pub mod identity;

/// Parallel orchestrator: fan-out, aggregation, error modes.
pub mod pipeline;

/// Report-section registry and built-in sections.
pub mod report;

/// Snapshot building and diffing between runs.
pub mod scanstate;

/// Snapshot persistence.
pub mod state;

/// Per-signal well-formedness rules.
pub mod validate;

/// Re-exported domain types.
pub use stringer_types as types;

/// Property-based tests for pipeline invariants.
#[cfg(test)]
mod property_tests;
