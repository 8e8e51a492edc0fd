use std::collections::{BTreeMap, BTreeSet};

use stringer_types::RawSignal;

/// Co-location boost rules: the presence of a trigger kind on a file
/// raises the confidence of every *other* signal on that file.
const BOOST_RULES: &[(&str, f64)] = &[
    ("churn", 0.10),
    ("vulnerable-dependency", 0.05),
    ("low-lottery-risk", 0.05),
];

/// Apply the cross-signal co-location boost.
///
/// The file -> kinds index is built once before any mutation, so a boosted
/// confidence can never create new eligibility (non-cascading). A signal
/// is never boosted by its own kind, and the result is clamped to 1.0.
pub fn apply_colocation_boost(signals: &mut [RawSignal]) {
    let mut kinds_by_path: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for signal in signals.iter() {
        if signal.file_path.is_empty() {
            continue;
        }
        kinds_by_path
            .entry(signal.file_path.clone())
            .or_default()
            .insert(signal.kind.clone());
    }

    for signal in signals.iter_mut() {
        if signal.file_path.is_empty() {
            continue;
        }
        let Some(kinds) = kinds_by_path.get(&signal.file_path) else {
            continue;
        };
        let mut bonus = 0.0;
        for (trigger, offset) in BOOST_RULES {
            if *trigger == signal.kind {
                continue;
            }
            if kinds.contains(*trigger) {
                bonus += offset;
            }
        }
        if bonus > 0.0 {
            signal.confidence = (signal.confidence + bonus).min(1.0);
        }
    }
}

/// Stable sort by effective priority (1 before 4), then truncate. Signals
/// of equal priority keep their prior relative order.
pub fn sort_and_cap(signals: &mut Vec<RawSignal>, max_issues: usize) {
    signals.sort_by_key(|s| s.effective_priority());
    signals.truncate(max_issues);
}
