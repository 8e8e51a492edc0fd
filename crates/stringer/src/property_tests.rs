//! Property-based tests for stringer invariants.
//!
//! These verify properties that should hold for all inputs:
//! - Identity hashing is deterministic and well-formed
//! - Dedup never grows the list and is idempotent
//! - Boost keeps confidence within bounds
//! - Validation verdicts are stable

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use stringer_types::{RawSignal, priority_for_confidence};

    use crate::boost::apply_colocation_boost;
    use crate::dedup::dedup_signals;
    use crate::identity::{hash_identity, output_id, signal_hash};
    use crate::validate::validate_signal;

    fn short_string() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ._/-]{0,24}"
    }

    /// Empty, or a repo-relative path that can never start with `/`.
    fn relative_path() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[a-zA-Z0-9._-]{1,12}(/[a-zA-Z0-9._-]{1,8}){0,2}",
        ]
    }

    fn arb_signal() -> impl Strategy<Value = RawSignal> {
        (
            "[a-z]{1,12}",
            "[a-z-]{1,16}",
            relative_path(),
            0u32..500,
            "[a-zA-Z0-9 ]{1,32}",
            0.0f64..=1.0,
        )
            .prop_map(|(source, kind, file_path, line, title, confidence)| RawSignal {
                source,
                kind,
                file_path,
                line,
                title,
                confidence,
                ..Default::default()
            })
    }

    proptest! {
        /// Property: the hash is a pure function of the identity tuple
        #[test]
        fn hash_is_deterministic(signal in arb_signal()) {
            prop_assert_eq!(signal_hash(&signal), signal_hash(&signal.clone()));
        }

        /// Property: every hash is exactly 8 lowercase hex characters
        #[test]
        fn hash_format_holds(
            source in short_string(),
            kind in short_string(),
            path in short_string(),
            line in any::<u32>(),
            title in short_string(),
        ) {
            let hash = hash_identity(&source, &kind, &path, line, &title);
            prop_assert_eq!(hash.len(), 8);
            prop_assert!(hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }

        /// Property: payload fields never affect the hash or the ID
        #[test]
        fn payload_is_identity_neutral(
            signal in arb_signal(),
            description in short_string(),
            author in short_string(),
            confidence in 0.0f64..=1.0,
        ) {
            let mut decorated = signal.clone();
            decorated.description = description;
            decorated.author = author;
            decorated.confidence = confidence;
            decorated.tags = vec!["extra".to_string()];
            prop_assert_eq!(signal_hash(&signal), signal_hash(&decorated));
        }

        /// Property: the output ID is the prefixed hash
        #[test]
        fn output_id_embeds_hash(signal in arb_signal()) {
            let id = output_id(&signal);
            prop_assert!(id.starts_with("str-"));
            prop_assert!(id.ends_with(&signal_hash(&signal)));
        }

        /// Property: dedup never grows the list and keeps relative order
        #[test]
        fn dedup_shrinks_or_preserves(signals in prop::collection::vec(arb_signal(), 0..24)) {
            let out = dedup_signals(signals.clone());
            prop_assert!(out.len() <= signals.len());

            // Idempotence: a second pass changes nothing.
            let again = dedup_signals(out.clone());
            prop_assert_eq!(out.len(), again.len());
        }

        /// Property: dedup output contains no duplicate hashes
        #[test]
        fn dedup_output_is_unique(signals in prop::collection::vec(arb_signal(), 0..24)) {
            let out = dedup_signals(signals);
            let mut hashes: Vec<String> = out.iter().map(signal_hash).collect();
            hashes.sort();
            hashes.dedup();
            prop_assert_eq!(hashes.len(), out.len());
        }

        /// Property: boost keeps confidence within [0, 1] and never lowers it
        #[test]
        fn boost_stays_bounded(signals in prop::collection::vec(arb_signal(), 0..24)) {
            let before: Vec<f64> = signals.iter().map(|s| s.confidence).collect();
            let mut boosted = signals;
            apply_colocation_boost(&mut boosted);
            for (signal, prior) in boosted.iter().zip(before) {
                prop_assert!(signal.confidence >= prior);
                prop_assert!(signal.confidence <= 1.0);
            }
        }

        /// Property: priority buckets cover exactly 1..=4
        #[test]
        fn priority_always_in_range(confidence in -1.0f64..2.0) {
            let priority = priority_for_confidence(confidence);
            prop_assert!((1..=4).contains(&priority));
        }

        /// Property: signals within bounds validate cleanly
        #[test]
        fn well_formed_signals_validate(signal in arb_signal()) {
            // arb_signal only generates relative paths and bounded
            // confidence; only an all-whitespace title can trip it.
            let errors = validate_signal(&signal);
            if signal.title.trim().is_empty() {
                prop_assert_eq!(errors.len(), 1);
            } else {
                prop_assert!(errors.is_empty());
            }
        }

        /// Property: out-of-range confidence always fails validation
        #[test]
        fn out_of_range_confidence_fails(
            signal in arb_signal(),
            excess in prop_oneof![1.0001f64..10.0, -10.0f64..-0.0001],
        ) {
            let mut bad = signal;
            bad.confidence = excess;
            let errors = validate_signal(&bad);
            prop_assert!(errors.iter().any(|e| e.field == "confidence"));
        }
    }
}
