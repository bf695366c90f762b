//! The LSH index: the train/search protocol over a hasher, a store, and
//! a metric.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{LshError, Result};
use crate::hasher::{Hasher, HasherConfig};
use crate::metric::Metric;
use crate::store::Store;

/// An identified vector. Identity is the `id`; two records in one index
/// never share one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub vec: Vec<f64>,
}

/// Runtime knobs for the index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LshConfig {
    /// Accept a candidate iff its distance from the query is at most this.
    pub distance_threshold: f64,
    /// Hard cap on the number of records a search returns.
    pub max_nn: usize,
    /// Records per training worker.
    pub batch_size: usize,
}

impl LshConfig {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LshError::InvalidConfig(
                "batch_size must be greater than 0".to_owned(),
            ));
        }
        if self.distance_threshold.is_nan() {
            return Err(LshError::InvalidConfig(
                "distance_threshold must not be NaN".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to construct an [`LshIndex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Runtime knobs, mutable later via [`LshIndex::reconfigure`].
    pub lsh: LshConfig,
    /// Hasher geometry, fixed for the lifetime of the hasher.
    pub hasher: HasherConfig,
    /// Per-dimension mean of the training corpus.
    pub mean: Vec<f64>,
    /// Per-dimension standard deviation of the training corpus.
    pub std: Vec<f64>,
    /// Optional seed for reproducible plane generation.
    pub seed: Option<u64>,
}

/// Random-hyperplane LSH index.
///
/// Composes a [`Hasher`], a [`Store`], and a [`Metric`]. Designed for
/// many concurrent [`search`](LshIndex::search) callers and occasional
/// [`train`](LshIndex::train) calls.
///
/// A train overlapping a search is undefined: the search may observe the
/// store mid-clear or mid-repopulation. Callers serialize train against
/// search externally or accept best-effort results.
pub struct LshIndex {
    config: RwLock<LshConfig>,
    hasher: RwLock<Arc<Hasher>>,
    store: Arc<dyn Store>,
    metric: Arc<dyn Metric>,
}

impl LshIndex {
    /// Create an index and generate its hasher from the dataset moments.
    pub fn new(config: Config, store: Arc<dyn Store>, metric: Arc<dyn Metric>) -> Result<Self> {
        config.lsh.validate()?;
        let mut hasher = Hasher::new(config.hasher)?;
        if let Some(seed) = config.seed {
            hasher = hasher.with_seed(seed);
        }
        hasher.generate(&config.mean, &config.std)?;
        Ok(Self {
            config: RwLock::new(config.lsh),
            hasher: RwLock::new(Arc::new(hasher)),
            store,
            metric,
        })
    }

    /// Current runtime config.
    pub fn config(&self) -> LshConfig {
        *self.config.read()
    }

    /// Replace the runtime config.
    ///
    /// Trains and searches snapshot the config when they start, so
    /// in-flight calls keep the values they began with.
    pub fn reconfigure(&self, config: LshConfig) -> Result<()> {
        config.validate()?;
        *self.config.write() = config;
        Ok(())
    }

    /// Rebuild the index contents from `records`.
    ///
    /// The store is cleared first, then records are hashed and inserted
    /// by parallel workers, one per contiguous `batch_size` chunk. The
    /// first worker error wins and aborts the remaining batches; the
    /// store is left with whatever progress was made, and the caller is
    /// expected to re-train.
    pub fn train(&self, records: &[Record]) -> Result<()> {
        self.store.clear()?;
        let batch_size = self.config.read().batch_size;
        let hasher = Arc::clone(&*self.hasher.read());
        if records.is_empty() {
            return Ok(());
        }
        debug!(
            records = records.len(),
            batch_size,
            workers = records.len().div_ceil(batch_size),
            "training index"
        );

        records.par_chunks(batch_size).try_for_each(|batch| {
            for record in batch {
                let signatures = hasher.signatures(&record.vec)?;
                self.store.put_vector(&record.id, &record.vec)?;
                for (permutation, signature) in signatures.iter().enumerate() {
                    self.store.put_hash(permutation as u32, *signature, &record.id)?;
                }
            }
            Ok(())
        })
    }

    /// Return up to `max_nn` records within `distance_threshold` of the
    /// query (inclusive).
    ///
    /// Permutations are probed in ascending id order; an absent bucket is
    /// a normal miss and the probe moves on. Results come back in
    /// discovery order with no global sort by distance; callers wanting
    /// top-K by distance sort externally.
    pub fn search(&self, query: &[f64]) -> Result<Vec<Record>> {
        let hasher = Arc::clone(&*self.hasher.read());
        let signatures = hasher.signatures(query)?;
        let (max_nn, distance_threshold) = {
            let config = self.config.read();
            (config.max_nn, config.distance_threshold)
        };

        let mut closest: Vec<Record> = Vec::new();
        if max_nn == 0 {
            return Ok(closest);
        }
        let mut seen: HashSet<String> = HashSet::new();
        for (permutation, signature) in signatures.iter().enumerate() {
            if closest.len() >= max_nn {
                break;
            }
            let Some(bucket) = self.store.bucket(permutation as u32, *signature)? else {
                continue;
            };
            for id in bucket {
                if closest.len() >= max_nn {
                    break;
                }
                if seen.contains(&id) {
                    continue;
                }
                let vector = self.store.vector(&id)?;
                let distance = self.metric.distance(query, &vector)?;
                if distance <= distance_threshold {
                    seen.insert(id.clone());
                    closest.push(Record { id, vec: vector });
                }
            }
        }
        trace!(results = closest.len(), "search complete");
        Ok(closest)
    }

    /// Serialize the hasher. Index config and store contents are not
    /// part of the payload.
    pub fn dump_hasher(&self) -> Result<Vec<u8>> {
        self.hasher.read().dump()
    }

    /// Replace the hasher from a blob produced by
    /// [`dump_hasher`](LshIndex::dump_hasher).
    ///
    /// The blob is fully validated before the swap, so a failed load
    /// leaves the current hasher untouched. A successful load invalidates
    /// any prior training: signatures from the new hasher no longer match
    /// the buckets in the store, and the caller must re-train before
    /// searching.
    pub fn load_hasher(&self, bytes: &[u8]) -> Result<()> {
        let hasher = Hasher::load(bytes)?;
        debug!(config = ?hasher.config(), "hasher replaced");
        *self.hasher.write() = Arc::new(hasher);
        Ok(())
    }
}
