use std::collections::HashMap;

use stringer_types::RawSignal;

use crate::identity;

/// Collapse duplicate signals within one scan.
///
/// Single pass over the aggregate list: the first occurrence of each
/// identity hash is kept in place; later duplicates are dropped after
/// raising the kept signal's confidence to the maximum of the two. Every
/// other field of the kept signal is preserved.
pub fn dedup_signals(signals: Vec<RawSignal>) -> Vec<RawSignal> {
    let mut kept: Vec<RawSignal> = Vec::with_capacity(signals.len());
    let mut first_index: HashMap<String, usize> = HashMap::new();

    for signal in signals {
        let hash = identity::signal_hash(&signal);
        match first_index.get(&hash) {
            Some(&idx) => {
                if signal.confidence > kept[idx].confidence {
                    kept[idx].confidence = signal.confidence;
                }
            }
            None => {
                first_index.insert(hash, kept.len());
                kept.push(signal);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(title: &str, confidence: f64) -> RawSignal {
        RawSignal {
            source: "todos".into(),
            kind: "todo".into(),
            file_path: "main.go".into(),
            line: 10,
            title: title.into(),
            confidence,
            ..Default::default()
        }
    }

    #[test]
    fn first_occurrence_wins_and_confidence_is_raised() {
        let mut a1 = signal("A", 0.5);
        a1.description = "first".into();
        let mut a2 = signal("A", 0.9);
        a2.description = "second".into();
        let b = signal("B", 0.4);
        let a3 = signal("A", 0.3);

        let out = dedup_signals(vec![a1, a2, b, a3]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "A");
        assert_eq!(out[0].confidence, 0.9);
        // Payload of the first occurrence is preserved.
        assert_eq!(out[0].description, "first");
        assert_eq!(out[1].title, "B");
    }

    #[test]
    fn lower_confidence_duplicate_does_not_lower_kept() {
        let out = dedup_signals(vec![signal("A", 0.8), signal("A", 0.2)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.8);
    }

    #[test]
    fn distinct_identities_are_untouched() {
        let mut other = signal("A", 0.5);
        other.line = 11;
        let out = dedup_signals(vec![signal("A", 0.5), other]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn order_of_kept_signals_is_preserved() {
        let out = dedup_signals(vec![
            signal("C", 0.1),
            signal("A", 0.2),
            signal("C", 0.9),
            signal("B", 0.3),
        ]);
        let titles: Vec<&str> = out.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(dedup_signals(Vec::new()).is_empty());
    }
}
