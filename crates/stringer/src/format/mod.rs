//! Output encoders: each takes a slice of signals and writes one formatted
//! representation. Encoders are looked up by name in a process-wide
//! registry seeded with the built-ins.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use anyhow::{Result, bail};

use stringer_types::RawSignal;

pub mod beads;
pub mod html;
pub mod json;
pub mod markdown;
pub mod sarif;
pub mod tasks;

pub use beads::{BeadsFormatter, LabelConvention};
pub use html::{HtmlDirFormatter, HtmlFormatter};
pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use sarif::SarifFormatter;
pub use tasks::TasksFormatter;

/// A signal serializer.
pub trait Formatter: Send + Sync {
    /// Short, stable, unique lowercase name.
    fn name(&self) -> &str;

    /// Write the formatted representation of `signals` to `writer`.
    fn format(&self, signals: &[RawSignal], writer: &mut dyn Write) -> Result<()>;

    /// Directory-emitting capability. Encoders that render to multiple
    /// files override this; everything else reports unsupported.
    fn format_dir(&self, _signals: &[RawSignal], _dir: &Path) -> Result<()> {
        bail!("formatter {:?} does not support directory output", self.name())
    }
}

impl fmt::Debug for dyn Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter").field("name", &self.name()).finish()
    }
}

static REGISTRY: LazyLock<RwLock<BTreeMap<String, Arc<dyn Formatter>>>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, Arc<dyn Formatter>> = BTreeMap::new();
    for formatter in builtin_formatters() {
        map.insert(formatter.name().to_string(), formatter);
    }
    RwLock::new(map)
});

/// The encoders shipped with stringer, in no particular order.
pub fn builtin_formatters() -> Vec<Arc<dyn Formatter>> {
    vec![
        Arc::new(BeadsFormatter::default()),
        Arc::new(JsonFormatter::default()),
        Arc::new(TasksFormatter),
        Arc::new(MarkdownFormatter),
        Arc::new(SarifFormatter),
        Arc::new(HtmlFormatter),
        Arc::new(HtmlDirFormatter),
    ]
}

/// Register an additional encoder process-wide. A duplicate name is a
/// programmer error and panics.
pub fn register(formatter: Arc<dyn Formatter>) {
    let name = formatter.name().to_string();
    let duplicate = {
        let mut registry = REGISTRY.write().unwrap();
        if registry.contains_key(&name) {
            true
        } else {
            registry.insert(name.clone(), formatter);
            false
        }
    };
    if duplicate {
        panic!("formatter {name:?} is already registered");
    }
}

/// Look up an encoder by name. The error for an unknown name lists the
/// available encoders in sorted order.
pub fn get_formatter(name: &str) -> Result<Arc<dyn Formatter>> {
    let registry = REGISTRY.read().unwrap();
    match registry.get(name) {
        Some(formatter) => Ok(Arc::clone(formatter)),
        None => {
            let available: Vec<&str> = registry.keys().map(String::as_str).collect();
            bail!(
                "unknown format {name:?} (available: {})",
                available.join(", ")
            )
        }
    }
}

/// Names of all registered encoders, sorted.
pub fn list() -> Vec<String> {
    REGISTRY.read().unwrap().keys().cloned().collect()
}
