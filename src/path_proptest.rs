//! Property-based tests for path validation and the collection helpers.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::collections::{
        first_unique, first_unique_hashed, first_unique_pairwise, last_unique,
        last_unique_hashed, last_unique_pairwise, shard,
    };
    use crate::refs::parse_src_reference;
    use crate::validate::{clean, validate_path, validate_safe_path};
    use proptest::prelude::*;

    // ============================================================================
    // validator property tests
    // ============================================================================

    proptest! {
        /// Property: validating an already-validated path is the identity.
        #[test]
        fn validate_is_idempotent(input in "[a-zA-Z0-9_./-]{1,40}") {
            if let Ok(once) = validate_safe_path(&[&input]) {
                let twice = validate_safe_path(&[&once]).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        /// Property: an accepted path never lexically escapes its root.
        #[test]
        fn validate_never_returns_escaping_path(input in "[a-zA-Z0-9_./-]{0,40}") {
            if let Ok(out) = validate_safe_path(&[&input]) {
                prop_assert!(out != "..");
                prop_assert!(!out.starts_with("../"), "escaped: {:?} -> {:?}", input, out);
                prop_assert!(!out.starts_with('/'), "absolute: {:?} -> {:?}", input, out);
            }
        }

        /// Property: anything under "../" is rejected however it is spelled.
        #[test]
        fn validate_rejects_parent_prefixes(rest in "[a-zA-Z0-9_./-]{0,20}") {
            let input = format!("../{}", rest);
            if clean(&input).starts_with("..") {
                prop_assert!(validate_safe_path(&[&input]).is_err());
            }
        }

        /// Property: absolute components are always rejected.
        #[test]
        fn validate_rejects_absolute(rest in "[a-zA-Z0-9_/-]{0,20}") {
            let input = format!("/{}", rest);
            prop_assert!(validate_safe_path(&[&input]).is_err());
        }

        /// Property: the strict validator rejects every component containing
        /// the build-variable sentinel.
        #[test]
        fn validate_path_rejects_sentinel(
            prefix in "[a-zA-Z0-9_/-]{0,10}",
            suffix in "[a-zA-Z0-9_/-]{0,10}",
        ) {
            let input = format!("{}${}", prefix, suffix);
            prop_assert!(validate_path(&[&input]).is_err());
        }

        /// Property: cleaning is deterministic and idempotent.
        #[test]
        fn clean_is_idempotent(input in "[a-zA-Z0-9_./-]{0,40}") {
            let once = clean(&input);
            prop_assert_eq!(clean(&once), once);
        }
    }

    // ============================================================================
    // dedup property tests
    // ============================================================================

    /// Input sizes straddling the implementation-switch threshold.
    fn threshold_sizes() -> impl Strategy<Value = usize> {
        prop_oneof![
            Just(1usize),
            Just(127usize),
            Just(128usize),
            Just(129usize),
            Just(1000usize),
        ]
    }

    proptest! {
        /// Property: the pairwise and hashed first-unique implementations
        /// agree for all inputs, including across the size threshold.
        #[test]
        fn first_unique_impls_agree(
            size in threshold_sizes(),
            modulus in 1u32..40,
            seed in any::<u32>(),
        ) {
            // Engineered duplicate patterns: values cycle with a stride so
            // duplicates appear both near and far apart.
            let list: Vec<u32> = (0..size as u32)
                .map(|i| (i.wrapping_mul(seed | 1)) % modulus)
                .collect();
            let pairwise = first_unique_pairwise(list.clone());
            let hashed = first_unique_hashed(list.clone());
            prop_assert_eq!(&pairwise, &hashed);
            prop_assert_eq!(first_unique(list), pairwise);
        }

        /// Property: first-unique keeps the first occurrence of each value,
        /// in the order first occurrences appear.
        #[test]
        fn first_unique_keeps_first_occurrences(list in prop::collection::vec(0u32..20, 0..200)) {
            let out = first_unique(list.clone());
            let mut expected = Vec::new();
            for item in &list {
                if !expected.contains(item) {
                    expected.push(*item);
                }
            }
            prop_assert_eq!(out, expected);
        }

        /// Property: the pairwise and hashed last-unique implementations
        /// agree for all inputs.
        #[test]
        fn last_unique_impls_agree(
            size in threshold_sizes(),
            modulus in 1u32..40,
        ) {
            let list: Vec<u32> = (0..size as u32).map(|i| i % modulus).collect();
            let pairwise = last_unique_pairwise(list.clone());
            let hashed = last_unique_hashed(list.clone());
            prop_assert_eq!(&pairwise, &hashed);
            prop_assert_eq!(last_unique(list), pairwise);
        }

        /// Property: last-unique keeps the last occurrence of each value and
        /// the survivors' original relative order.
        #[test]
        fn last_unique_keeps_last_occurrences(list in prop::collection::vec(0u32..20, 0..200)) {
            let out = last_unique(list.clone());
            let mut expected: Vec<u32> = Vec::new();
            for (index, item) in list.iter().enumerate() {
                if !list[index + 1..].contains(item) {
                    expected.push(*item);
                }
            }
            prop_assert_eq!(out, expected);
        }
    }

    // ============================================================================
    // shard property tests
    // ============================================================================

    proptest! {
        /// Property: concatenating the shards reproduces the input exactly,
        /// and every shard except possibly the last has exactly k elements.
        #[test]
        fn shard_round_trips(
            list in prop::collection::vec(any::<u32>(), 0..100),
            k in 1usize..20,
        ) {
            let shards = shard(&list, k);
            let flat: Vec<u32> = shards.iter().flatten().copied().collect();
            prop_assert_eq!(&flat, &list);
            if list.is_empty() {
                prop_assert!(shards.is_empty());
            } else {
                for chunk in &shards[..shards.len() - 1] {
                    prop_assert_eq!(chunk.len(), k);
                }
                prop_assert!(!shards[shards.len() - 1].is_empty());
                prop_assert!(shards[shards.len() - 1].len() <= k);
            }
        }
    }

    // ============================================================================
    // reference parsing property tests
    // ============================================================================

    proptest! {
        /// Property: ":name" parses to (name, "").
        #[test]
        fn reference_without_tag_parses(name in "[a-zA-Z0-9_.-]{1,20}") {
            let reference = format!(":{}", name);
            prop_assert_eq!(parse_src_reference(&reference), Some((name.as_str(), "")));
        }

        /// Property: ":name{tag}" parses to (name, tag).
        #[test]
        fn reference_with_tag_parses(
            name in "[a-zA-Z0-9_.-]{1,20}",
            tag in "[a-zA-Z0-9_.-]{0,20}",
        ) {
            let reference = format!(":{}{{{}}}", name, tag);
            prop_assert_eq!(
                parse_src_reference(&reference),
                Some((name.as_str(), tag.as_str()))
            );
        }

        /// Property: anything without a leading colon is a literal path.
        #[test]
        fn non_reference_is_literal(path in "[a-zA-Z0-9_./-]{1,30}") {
            prop_assert_eq!(parse_src_reference(&path), None);
        }
    }
}
