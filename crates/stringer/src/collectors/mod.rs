//! Built-in collectors.

pub mod churn;
pub mod todos;

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::collector;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Register the built-in collectors with the process-wide registry.
/// Idempotent; call once from the binary entrypoint.
pub fn install() {
    INSTALLED.get_or_init(|| {
        collector::register(Arc::new(todos::TodoCollector::new()));
        collector::register(Arc::new(churn::ChurnCollector::new()));
    });
}

/// Compile exclude patterns into a matcher. An invalid pattern is a
/// collector error, surfaced through the configured error mode.
pub(crate) fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern {pattern:?}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to compile exclude patterns")
}
