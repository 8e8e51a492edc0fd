use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use anyhow::Result;

use stringer_types::{CollectorOpts, RawSignal};

use crate::cancel::CancelToken;

/// A signal producer. Implementations scan some aspect of a repository
/// (source tree, git history, external APIs) and return the signals they
/// find, in a stable order.
pub trait Collector: Send + Sync {
    /// Short, stable, unique lowercase name.
    fn name(&self) -> &str;

    /// Produce signals for the repository rooted at `repo`. Implementations
    /// must honor `cancel` at suspension points and return promptly once it
    /// fires.
    fn collect(
        &self,
        cancel: &CancelToken,
        repo: &Path,
        opts: &CollectorOpts,
    ) -> Result<Vec<RawSignal>>;

    /// Structured summary of the last run, consumed only by report
    /// sections. `None` means the collector does not publish metrics;
    /// absence is not an error.
    fn metrics(&self) -> Option<serde_json::Value> {
        None
    }
}

static REGISTRY: LazyLock<RwLock<BTreeMap<String, Arc<dyn Collector>>>> =
    LazyLock::new(|| RwLock::new(BTreeMap::new()));

/// Register a collector process-wide. Registration happens at process
/// initialization; a duplicate name is a programmer error and panics.
pub fn register(collector: Arc<dyn Collector>) {
    let name = collector.name().to_string();
    let duplicate = {
        let mut registry = REGISTRY.write().unwrap();
        if registry.contains_key(&name) {
            true
        } else {
            registry.insert(name.clone(), collector);
            false
        }
    };
    // Panic outside the critical section so the lock is never poisoned.
    if duplicate {
        panic!("collector {name:?} is already registered");
    }
}

/// Look up a collector by name.
pub fn get(name: &str) -> Option<Arc<dyn Collector>> {
    REGISTRY.read().unwrap().get(name).cloned()
}

/// Names of all registered collectors, sorted.
pub fn list() -> Vec<String> {
    REGISTRY.read().unwrap().keys().cloned().collect()
}

/// Snapshot the registry contents so a test can restore them afterwards.
/// Production code never calls this.
#[doc(hidden)]
pub fn snapshot() -> Vec<(String, Arc<dyn Collector>)> {
    REGISTRY
        .read()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), Arc::clone(v)))
        .collect()
}

/// Replace the registry contents with a previously taken snapshot.
/// Production code never calls this.
#[doc(hidden)]
pub fn restore(entries: Vec<(String, Arc<dyn Collector>)>) {
    let mut registry = REGISTRY.write().unwrap();
    registry.clear();
    registry.extend(entries);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct NamedCollector(&'static str);

    impl Collector for NamedCollector {
        fn name(&self) -> &str {
            self.0
        }

        fn collect(
            &self,
            _cancel: &CancelToken,
            _repo: &Path,
            _opts: &CollectorOpts,
        ) -> Result<Vec<RawSignal>> {
            Ok(Vec::new())
        }
    }

    struct MetricCollector;

    impl Collector for MetricCollector {
        fn name(&self) -> &str {
            "with-metrics"
        }

        fn collect(
            &self,
            _cancel: &CancelToken,
            _repo: &Path,
            _opts: &CollectorOpts,
        ) -> Result<Vec<RawSignal>> {
            Ok(Vec::new())
        }

        fn metrics(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({"count": 1}))
        }
    }

    #[test]
    #[serial(collector_registry)]
    fn register_get_list_roundtrip() {
        let saved = snapshot();
        restore(Vec::new());

        register(Arc::new(NamedCollector("beta")));
        register(Arc::new(NamedCollector("alpha")));

        assert_eq!(list(), vec!["alpha".to_string(), "beta".to_string()]);
        assert!(get("alpha").is_some());
        assert!(get("missing").is_none());

        restore(saved);
    }

    #[test]
    #[serial(collector_registry)]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let saved = snapshot();
        restore(Vec::new());

        register(Arc::new(NamedCollector("dup")));
        let result = std::panic::catch_unwind(|| {
            register(Arc::new(NamedCollector("dup")));
        });

        restore(saved);
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }

    #[test]
    fn metrics_capability_defaults_to_none() {
        let plain = NamedCollector("plain");
        assert!(plain.metrics().is_none());
        assert!(MetricCollector.metrics().is_some());
    }
}
