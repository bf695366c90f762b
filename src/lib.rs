//! proxim: random-hyperplane LSH for approximate nearest neighbor search.
//!
//! Given a corpus of identified dense vectors, an [`LshIndex`] answers
//! "which corpus vectors lie within a distance threshold of this query"
//! in sublinear expected time, trading exactness for speed.
//!
//! # Components
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Metric`] | pluggable distance over equal-length `f64` vectors |
//! | [`Store`] | buckets of ids per `(permutation, signature)` plus an id → vector table |
//! | [`Hasher`] | N families of P random hyperplanes; maps a vector to N packed bit-signatures |
//! | [`LshIndex`] | composes the above; `train` / `search` / hasher dump & load |
//!
//! Training normalizes each vector by the dataset moments, hashes it
//! under every permutation, and files its id into the matching buckets.
//! A search hashes the query the same way, probes its buckets in
//! ascending permutation order, and distance-filters the candidates.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use proxim::{Config, Euclidean, HasherConfig, InMemoryStore, LshConfig, LshIndex, Record};
//!
//! let config = Config {
//!     lsh: LshConfig { distance_threshold: 0.5, max_nn: 10, batch_size: 250 },
//!     hasher: HasherConfig { dimension: 2, permutations: 4, planes_per_permutation: 8 },
//!     mean: vec![0.0, 0.0],
//!     std: vec![1.0, 1.0],
//!     seed: Some(42),
//! };
//! let index = LshIndex::new(config, Arc::new(InMemoryStore::new()), Arc::new(Euclidean))?;
//!
//! index.train(&[Record { id: "a".into(), vec: vec![1.0, 0.0] }])?;
//! let hits = index.search(&[1.0, 0.0])?;
//! assert_eq!(hits[0].id, "a");
//! # Ok::<(), proxim::LshError>(())
//! ```
//!
//! # Concurrency
//!
//! Searches run freely in parallel; training fans out over rayon workers.
//! A train overlapping a search is a caller-side race: serialize the two
//! externally, or accept best-effort results (see [`LshIndex::train`]).

pub mod error;
pub mod hasher;
pub mod index;
pub mod metric;
pub mod store;

pub use error::{LshError, Result};
pub use hasher::{Hasher, HasherConfig, Signature};
pub use index::{Config, LshConfig, LshIndex, Record};
pub use metric::{Cosine, Euclidean, Metric};
pub use store::{BucketIter, InMemoryStore, Store};
