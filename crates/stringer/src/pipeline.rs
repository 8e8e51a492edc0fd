use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use thiserror::Error;

use stringer_types::{CollectorOpts, CollectorResult, ErrorMode, RawSignal, ScanConfig, ScanResult};

use crate::boost;
use crate::cancel::CancelToken;
use crate::collector::{self, Collector};
use crate::dedup;
use crate::validate;

/// Progress sink for a scan. The CLI writes to stderr; tests collect.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Reporter that discards everything.
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&mut self, _msg: &str) {}
    fn warn(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// A fail-mode collector error. The scan still aggregated whatever the
/// other collectors produced; that partial result rides along.
#[derive(Debug, Error)]
#[error("collector {collector} failed: {error}")]
pub struct CollectorFailure {
    pub collector: String,
    pub error: anyhow::Error,
    pub partial: Box<ScanResult>,
}

/// Runs configured collectors in parallel, then validates, deduplicates,
/// boosts, orders, and caps their combined output.
pub struct Pipeline {
    config: ScanConfig,
    collectors: Vec<Arc<dyn Collector>>,
}

impl Pipeline {
    /// Resolve the config's collector list against the process-wide
    /// registry. An empty list means "all registered, sorted by name";
    /// an unknown name is a construction-time error.
    pub fn new(config: ScanConfig) -> Result<Self> {
        let names = if config.collectors.is_empty() {
            collector::list()
        } else {
            config.collectors.clone()
        };

        let mut collectors = Vec::with_capacity(names.len());
        for name in &names {
            let c = collector::get(name)
                .ok_or_else(|| anyhow!("unknown collector {name:?} (registered: {})", collector::list().join(", ")))?;
            collectors.push(c);
        }

        Ok(Self { config, collectors })
    }

    /// Bypass the registry and run an explicit collector set.
    pub fn with_collectors(config: ScanConfig, collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self { config, collectors }
    }

    /// Names of the collectors this pipeline will run, in input order.
    pub fn collector_names(&self) -> Vec<String> {
        self.collectors.iter().map(|c| c.name().to_string()).collect()
    }

    /// Run the scan. One thread per collector; per-collector results land
    /// at the collector's input index regardless of completion order.
    pub fn run(
        &self,
        cancel: &CancelToken,
        reporter: &mut dyn Reporter,
    ) -> Result<ScanResult, CollectorFailure> {
        let start = Instant::now();
        let count = self.collectors.len();

        // Per-collector options with global excludes prepended, prepared
        // up front so aggregation can consult error modes by index.
        let prepared: Vec<CollectorOpts> = self
            .collectors
            .iter()
            .map(|c| {
                let mut opts = self.config.opts_for(c.name());
                let mut patterns = self.config.exclude_patterns.clone();
                patterns.extend(std::mem::take(&mut opts.exclude_patterns));
                opts.exclude_patterns = patterns;
                opts
            })
            .collect();

        let mut slots: Vec<Option<CollectorResult>> = (0..count).map(|_| None).collect();
        let mut first_failure: Option<(String, anyhow::Error)> = None;

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, Result<Vec<RawSignal>>, Duration)>();

            for (idx, c) in self.collectors.iter().enumerate() {
                let tx = tx.clone();
                let collector = Arc::clone(c);
                let repo = self.config.repo_path.clone();
                let opts = prepared[idx].clone();
                let child = cancel.child_with_timeout(opts.timeout);
                scope.spawn(move || {
                    let started = Instant::now();
                    let outcome = collector.collect(&child, &repo, &opts);
                    let _ = tx.send((idx, outcome, started.elapsed()));
                });
            }
            drop(tx);

            // Aggregate in completion order; the slot index restores input
            // order. The first fail-mode error observed here wins.
            for (idx, outcome, duration) in rx {
                let name = self.collectors[idx].name().to_string();
                let mut result = CollectorResult {
                    collector: name.clone(),
                    duration,
                    ..Default::default()
                };

                match outcome {
                    Ok(signals) => {
                        result.signals = signals;
                        result.metrics = self.collectors[idx].metrics();
                    }
                    Err(err) => {
                        result.error = Some(format!("{err:#}"));
                        match prepared[idx].error_mode {
                            ErrorMode::Warn => {
                                reporter.warn(&format!("collector {name} failed: {err:#}"));
                            }
                            ErrorMode::Skip => {}
                            ErrorMode::Fail => {
                                if first_failure.is_none() {
                                    first_failure = Some((name.clone(), err));
                                }
                            }
                        }
                    }
                }

                slots[idx] = Some(result);
            }
        });

        let results: Vec<CollectorResult> = slots
            .into_iter()
            .map(|slot| slot.expect("every collector reports exactly once"))
            .collect();

        // Aggregate metrics for collectors that completed without error
        // and supplied a value.
        let mut metrics = std::collections::BTreeMap::new();
        for result in &results {
            if result.error.is_none()
                && let Some(m) = &result.metrics
            {
                metrics.insert(result.collector.clone(), m.clone());
            }
        }

        // Canonical ordering: input collector order, each collector's
        // validated signals in production order. Rejected signals stay in
        // the collector's own log.
        let mut signals: Vec<RawSignal> = Vec::new();
        for result in &results {
            for signal in &result.signals {
                let errors = validate::validate_signal(signal);
                if errors.is_empty() {
                    signals.push(signal.clone());
                } else {
                    let detail: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    reporter.warn(&format!(
                        "{}: dropping invalid signal {:?}: {}",
                        result.collector,
                        signal.title,
                        detail.join("; ")
                    ));
                }
            }
        }

        let mut signals = dedup::dedup_signals(signals);
        boost::apply_colocation_boost(&mut signals);
        if self.config.max_issues > 0 {
            boost::sort_and_cap(&mut signals, self.config.max_issues);
        }

        let scan = ScanResult {
            signals,
            results,
            duration: start.elapsed(),
            metrics,
        };

        match first_failure {
            Some((collector, error)) => Err(CollectorFailure {
                collector,
                error,
                partial: Box::new(scan),
            }),
            None => Ok(scan),
        }
    }
}
