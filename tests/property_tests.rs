//! Property-based tests for proxim invariants.
//!
//! These hold regardless of input:
//! - metrics are non-negative, symmetric, and zero on identical vectors
//! - signatures are idempotent and survive a dump/load round trip
//! - search never exceeds the cap, never crosses the threshold, and
//!   never returns an id twice

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use proxim::{
    Config, Cosine, Euclidean, Hasher, HasherConfig, InMemoryStore, LshConfig, LshIndex, Metric,
    Record,
};

prop_compose! {
    fn arb_vector(dim: usize)(vec in prop::collection::vec(-10.0f64..10.0, dim)) -> Vec<f64> {
        vec
    }
}

mod metric_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn euclidean_non_negative(a in arb_vector(16), b in arb_vector(16)) {
            let d = Euclidean.distance(&a, &b).unwrap();
            prop_assert!(d >= 0.0, "distance must be non-negative, got {}", d);
        }

        #[test]
        fn euclidean_symmetric(a in arb_vector(16), b in arb_vector(16)) {
            let d_ab = Euclidean.distance(&a, &b).unwrap();
            let d_ba = Euclidean.distance(&b, &a).unwrap();
            prop_assert!((d_ab - d_ba).abs() < 1e-12, "{} vs {}", d_ab, d_ba);
        }

        #[test]
        fn euclidean_self_is_zero(a in arb_vector(16)) {
            let d = Euclidean.distance(&a, &a).unwrap();
            prop_assert!(d.abs() < 1e-12, "distance to self should be 0, got {}", d);
        }

        #[test]
        fn cosine_in_range(a in arb_vector(16), b in arb_vector(16)) {
            let d = Cosine.distance(&a, &b).unwrap();
            prop_assert!((0.0..=2.0).contains(&d), "cosine distance out of range: {}", d);
        }

        #[test]
        fn cosine_symmetric(a in arb_vector(16), b in arb_vector(16)) {
            let d_ab = Cosine.distance(&a, &b).unwrap();
            let d_ba = Cosine.distance(&b, &a).unwrap();
            prop_assert!((d_ab - d_ba).abs() < 1e-12, "{} vs {}", d_ab, d_ba);
        }

        #[test]
        fn cosine_self_is_zero(a in arb_vector(16)) {
            let d = Cosine.distance(&a, &a).unwrap();
            prop_assert!(d.abs() < 1e-12, "distance to self should be 0, got {}", d);
        }
    }
}

mod hasher_props {
    use super::*;

    fn seeded_hasher(seed: u64) -> Hasher {
        let mut hasher = Hasher::new(HasherConfig {
            dimension: 8,
            permutations: 4,
            planes_per_permutation: 16,
        })
        .unwrap()
        .with_seed(seed);
        hasher.generate(&[0.0; 8], &[1.0; 8]).unwrap();
        hasher
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn signatures_are_idempotent(seed in any::<u64>(), v in arb_vector(8)) {
            let hasher = seeded_hasher(seed);
            prop_assert_eq!(
                hasher.signatures(&v).unwrap(),
                hasher.signatures(&v).unwrap()
            );
        }

        #[test]
        fn dump_load_preserves_signatures(seed in any::<u64>(), v in arb_vector(8)) {
            let hasher = seeded_hasher(seed);
            let restored = Hasher::load(&hasher.dump().unwrap()).unwrap();
            prop_assert_eq!(
                restored.signatures(&v).unwrap(),
                hasher.signatures(&v).unwrap()
            );
        }
    }
}

mod search_props {
    use super::*;

    const DIM: usize = 8;

    fn build_index(distance_threshold: f64, max_nn: usize) -> LshIndex {
        LshIndex::new(
            Config {
                lsh: LshConfig {
                    distance_threshold,
                    max_nn,
                    batch_size: 5,
                },
                hasher: HasherConfig {
                    dimension: DIM,
                    permutations: 6,
                    planes_per_permutation: 4,
                },
                mean: vec![0.0; DIM],
                std: vec![1.0; DIM],
                seed: Some(42),
            },
            Arc::new(InMemoryStore::new()),
            Arc::new(Euclidean),
        )
        .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn search_honors_threshold_cap_and_uniqueness(
            corpus in prop::collection::vec(arb_vector(DIM), 1..40),
            query in arb_vector(DIM),
            distance_threshold in 0.0f64..20.0,
            max_nn in 0usize..12,
        ) {
            let index = build_index(distance_threshold, max_nn);
            let records: Vec<Record> = corpus
                .into_iter()
                .enumerate()
                .map(|(i, vec)| Record { id: format!("r{i}"), vec })
                .collect();
            index.train(&records).unwrap();

            let hits = index.search(&query).unwrap();

            prop_assert!(hits.len() <= max_nn, "cap violated: {} > {}", hits.len(), max_nn);

            let mut ids = HashSet::new();
            for hit in &hits {
                let d = Euclidean.distance(&query, &hit.vec).unwrap();
                prop_assert!(
                    d <= distance_threshold,
                    "threshold violated for {}: {} > {}",
                    hit.id, d, distance_threshold
                );
                prop_assert!(ids.insert(hit.id.clone()), "duplicate id {}", hit.id);
            }
        }

        #[test]
        fn retrain_never_leaks_previous_ids(
            first in prop::collection::vec(arb_vector(DIM), 1..20),
            second in prop::collection::vec(arb_vector(DIM), 1..20),
            query in arb_vector(DIM),
        ) {
            let index = build_index(100.0, 50);
            let first: Vec<Record> = first
                .into_iter()
                .enumerate()
                .map(|(i, vec)| Record { id: format!("old{i}"), vec })
                .collect();
            index.train(&first).unwrap();

            let second: Vec<Record> = second
                .into_iter()
                .enumerate()
                .map(|(i, vec)| Record { id: format!("new{i}"), vec })
                .collect();
            index.train(&second).unwrap();

            let hits = index.search(&query).unwrap();
            for hit in &hits {
                prop_assert!(
                    hit.id.starts_with("new"),
                    "stale id {} survived retrain",
                    hit.id
                );
            }
        }
    }
}
