//! In-memory store backend.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use super::{BucketIter, Store};
use crate::error::{LshError, Result};
use crate::hasher::Signature;

/// Thread-safe in-memory [`Store`].
///
/// Vectors and buckets live behind separate locks so vector reads during
/// search do not contend with bucket writes during training. Bucket
/// iteration hands out a snapshot, so a caller never computes distances
/// while a store lock is held.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    vectors: RwLock<HashMap<String, Vec<f64>>>,
    buckets: RwLock<HashMap<u32, HashMap<Signature, HashSet<String>>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    /// Whether the store holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }
}

impl Store for InMemoryStore {
    fn clear(&self) -> Result<()> {
        self.vectors.write().clear();
        self.buckets.write().clear();
        Ok(())
    }

    fn put_vector(&self, id: &str, vector: &[f64]) -> Result<()> {
        self.vectors.write().insert(id.to_owned(), vector.to_vec());
        Ok(())
    }

    fn put_hash(&self, permutation: u32, signature: Signature, id: &str) -> Result<()> {
        self.buckets
            .write()
            .entry(permutation)
            .or_default()
            .entry(signature)
            .or_default()
            .insert(id.to_owned());
        Ok(())
    }

    fn vector(&self, id: &str) -> Result<Vec<f64>> {
        self.vectors
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LshError::VectorNotFound(id.to_owned()))
    }

    fn bucket(&self, permutation: u32, signature: Signature) -> Result<Option<BucketIter>> {
        let buckets = self.buckets.read();
        let ids = match buckets.get(&permutation).and_then(|b| b.get(&signature)) {
            Some(ids) if !ids.is_empty() => ids.iter().cloned().collect(),
            _ => return Ok(None),
        };
        Ok(Some(BucketIter::new(ids)))
    }
}
