//! Bucketed signature store.
//!
//! The index only talks to storage through [`Store`]: a dictionary from
//! `(permutation, signature)` to the set of ids hashed there, plus a side
//! table from id to raw vector. Backends may shard or lock internally;
//! every operation must be safe under concurrent callers, and training
//! drives many parallel writers.

mod memory;

pub use memory::InMemoryStore;

use crate::error::Result;
use crate::hasher::Signature;

/// Iterator over the ids of one bucket.
///
/// Finite and not restartable. The sequence is fixed for the lifetime of
/// the iterator, but need not be stable across [`Store::bucket`] calls.
pub struct BucketIter {
    ids: std::vec::IntoIter<String>,
}

impl BucketIter {
    /// Wrap a snapshot of bucket ids.
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids: ids.into_iter(),
        }
    }
}

impl Iterator for BucketIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.ids.next()
    }
}

/// Associative backend for the LSH index.
pub trait Store: Send + Sync {
    /// Drop all buckets and vectors.
    fn clear(&self) -> Result<()>;

    /// Upsert the raw vector for `id`.
    fn put_vector(&self, id: &str, vector: &[f64]) -> Result<()>;

    /// Insert `id` into the bucket keyed by `(permutation, signature)`.
    ///
    /// Buckets are sets: repeated inserts of the same triple are no-ops.
    fn put_hash(&self, permutation: u32, signature: Signature, id: &str) -> Result<()>;

    /// Fetch the raw vector for `id`.
    ///
    /// Errors with [`LshError::VectorNotFound`](crate::LshError::VectorNotFound)
    /// when absent; any id reachable through a bucket must resolve.
    fn vector(&self, id: &str) -> Result<Vec<f64>>;

    /// Iterate one bucket.
    ///
    /// `Ok(None)` means the bucket is empty or absent. Searches routinely
    /// probe buckets that were never filled, so a miss is a normal
    /// control signal, not an error.
    fn bucket(&self, permutation: u32, signature: Signature) -> Result<Option<BucketIter>>;
}
