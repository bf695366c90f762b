//! Random-hyperplane hasher.
//!
//! A hasher owns N independent hyperplane families ("permutations"). Each
//! family holds P unit normals in ℝ^D plus P bias offsets; a vector's
//! signature under one family packs the sign of `dot(plane, v') - bias`
//! per plane into a single integer, where `v'` is the input normalized by
//! the dataset moments supplied at generation. Vectors that collide in a
//! signature are candidate neighbors under that family.
//!
//! Once generated (or loaded) a hasher is immutable; [`Hasher::signatures`]
//! is pure and callable from any thread.
//!
//! # References
//!
//! - Charikar (2002): "Similarity estimation techniques from rounding
//!   algorithms"
//! - Indyk & Motwani (1998): "Approximate nearest neighbors: towards
//!   removing the curse of dimensionality"

use std::io::Read;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{LshError, Result};

/// Packed sign bits of one permutation applied to one vector.
pub type Signature = u64;

/// Upper bound on planes per permutation; a signature packs into one `u64`.
pub const MAX_PLANES: usize = 64;

/// Magic bytes prefixing a serialized hasher.
const HASHER_MAGIC: &[u8; 4] = b"LSHR";

/// Current hasher blob format version.
const FORMAT_VERSION: u32 = 1;

/// Geometry of a hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// Vector dimensionality (D).
    pub dimension: usize,
    /// Number of independent hyperplane families (N).
    pub permutations: usize,
    /// Hyperplanes, and therefore signature bits, per family (P).
    pub planes_per_permutation: usize,
}

impl HasherConfig {
    fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(LshError::InvalidConfig(
                "dimension must be greater than 0".to_owned(),
            ));
        }
        if self.permutations == 0 {
            return Err(LshError::InvalidConfig(
                "permutations must be greater than 0".to_owned(),
            ));
        }
        if self.planes_per_permutation == 0 || self.planes_per_permutation > MAX_PLANES {
            return Err(LshError::InvalidConfig(format!(
                "planes_per_permutation must be in 1..={MAX_PLANES}, got {}",
                self.planes_per_permutation
            )));
        }
        Ok(())
    }
}

/// One hyperplane family: unit normals plus matching bias offsets.
#[derive(Debug, Clone)]
struct Family {
    /// `planes_per_permutation` rows of `dimension` coordinates each.
    planes: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

/// Immutable random-projection state.
///
/// Construct with [`Hasher::new`] and fill with [`Hasher::generate`], or
/// restore a previously dumped hasher with [`Hasher::load`].
#[derive(Debug, Clone)]
pub struct Hasher {
    config: HasherConfig,
    families: Vec<Family>,
    mean: Vec<f64>,
    std: Vec<f64>,
    seed: Option<u64>,
}

impl Hasher {
    /// Allocate a hasher. Planes are not generated yet; call
    /// [`Hasher::generate`] with the dataset moments before hashing.
    pub fn new(config: HasherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            families: Vec::new(),
            mean: Vec::new(),
            std: Vec::new(),
            seed: None,
        })
    }

    /// Configure a deterministic seed for plane generation.
    ///
    /// When set, repeated `generate(...)` calls with the same moments
    /// produce identical planes and biases.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Geometry this hasher was constructed with.
    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Whether planes have been generated or loaded.
    pub fn is_generated(&self) -> bool {
        !self.families.is_empty()
    }

    /// Sample the hyperplane families and capture the dataset moments
    /// used for runtime normalization.
    ///
    /// Each plane coordinate is drawn i.i.d. from the standard normal
    /// distribution and the plane is normalized to unit length. Biases
    /// are drawn uniformly from `[-1, 1)`: inputs are moment-normalized
    /// before projection, so projections concentrate around zero with
    /// roughly unit variance and a symmetric unit interval keeps each
    /// half-space split balanced.
    pub fn generate(&mut self, mean: &[f64], std: &[f64]) -> Result<()> {
        let dimension = self.config.dimension;
        if mean.len() != dimension || std.len() != dimension {
            return Err(LshError::BadMoments(format!(
                "expected {dimension} mean/std components, got {}/{}",
                mean.len(),
                std.len()
            )));
        }
        if let Some(j) = std.iter().position(|s| !(*s > 0.0)) {
            return Err(LshError::BadMoments(format!(
                "std[{j}] = {} is not positive",
                std[j]
            )));
        }

        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut families = Vec::with_capacity(self.config.permutations);
        for _ in 0..self.config.permutations {
            let mut planes = Vec::with_capacity(self.config.planes_per_permutation);
            let mut biases = Vec::with_capacity(self.config.planes_per_permutation);
            for _ in 0..self.config.planes_per_permutation {
                let mut plane: Vec<f64> =
                    (0..dimension).map(|_| rng.sample(StandardNormal)).collect();
                let norm: f64 = plane.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 1e-12 {
                    for x in plane.iter_mut() {
                        *x /= norm;
                    }
                }
                planes.push(plane);
                biases.push(rng.random_range(-1.0..1.0));
            }
            families.push(Family { planes, biases });
        }

        self.families = families;
        self.mean = mean.to_vec();
        self.std = std.to_vec();
        Ok(())
    }

    /// Compute one signature per permutation, indexed by permutation id.
    ///
    /// The input is normalized component-wise as `(v - mean) / std`, then
    /// bit `h` of permutation `p` is set iff
    /// `dot(planes[p][h], v') - biases[p][h] >= 0`.
    pub fn signatures(&self, vector: &[f64]) -> Result<Vec<Signature>> {
        if !self.is_generated() {
            return Err(LshError::InvalidConfig(
                "hasher has not been generated".to_owned(),
            ));
        }
        if vector.len() != self.config.dimension {
            return Err(LshError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }

        let normalized: Vec<f64> = vector
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect();

        let mut signatures = Vec::with_capacity(self.families.len());
        for family in &self.families {
            let mut signature: Signature = 0;
            for (bit, (plane, bias)) in
                family.planes.iter().zip(family.biases.iter()).enumerate()
            {
                let projection: f64 =
                    plane.iter().zip(normalized.iter()).map(|(p, v)| p * v).sum();
                if projection - bias >= 0.0 {
                    signature |= 1 << bit;
                }
            }
            signatures.push(signature);
        }
        Ok(signatures)
    }

    /// Serialize to a self-describing little-endian blob.
    ///
    /// Layout: magic, format version, `D`/`N`/`P` as `u32`, then
    /// `mean[D]`, `std[D]`, `planes[N][P][D]`, `biases[N][P]` as `f64`.
    pub fn dump(&self) -> Result<Vec<u8>> {
        if !self.is_generated() {
            return Err(LshError::Serialization(
                "hasher has not been generated".to_owned(),
            ));
        }
        let d = self.config.dimension;
        let n = self.config.permutations;
        let p = self.config.planes_per_permutation;

        let mut out = Vec::with_capacity(blob_len(d, n, p));
        out.extend_from_slice(HASHER_MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(d as u32).to_le_bytes());
        out.extend_from_slice(&(n as u32).to_le_bytes());
        out.extend_from_slice(&(p as u32).to_le_bytes());
        for m in &self.mean {
            out.extend_from_slice(&m.to_le_bytes());
        }
        for s in &self.std {
            out.extend_from_slice(&s.to_le_bytes());
        }
        for family in &self.families {
            for plane in &family.planes {
                for x in plane {
                    out.extend_from_slice(&x.to_le_bytes());
                }
            }
        }
        for family in &self.families {
            for b in &family.biases {
                out.extend_from_slice(&b.to_le_bytes());
            }
        }
        Ok(out)
    }

    /// Restore a hasher from a blob produced by [`Hasher::dump`].
    ///
    /// The blob is fully validated and a fresh hasher constructed before
    /// anything is handed back, so a failed load leaves no partial state.
    pub fn load(bytes: &[u8]) -> Result<Hasher> {
        let mut reader = std::io::Cursor::new(bytes);

        let mut magic = [0u8; 4];
        read_exact(&mut reader, &mut magic)?;
        if &magic != HASHER_MAGIC {
            return Err(LshError::Serialization("bad magic bytes".to_owned()));
        }
        let version = read_u32(&mut reader)?;
        if version != FORMAT_VERSION {
            return Err(LshError::Serialization(format!(
                "unsupported format version {version}"
            )));
        }

        let dimension = read_u32(&mut reader)? as usize;
        let permutations = read_u32(&mut reader)? as usize;
        let planes_per_permutation = read_u32(&mut reader)? as usize;
        let config = HasherConfig {
            dimension,
            permutations,
            planes_per_permutation,
        };
        config
            .validate()
            .map_err(|e| LshError::Serialization(e.to_string()))?;

        let mean = read_f64s(&mut reader, dimension)?;
        let std = read_f64s(&mut reader, dimension)?;
        if std.iter().any(|s| !(*s > 0.0)) {
            return Err(LshError::Serialization(
                "blob carries a non-positive std component".to_owned(),
            ));
        }

        let mut families = Vec::with_capacity(permutations);
        for _ in 0..permutations {
            let mut planes = Vec::with_capacity(planes_per_permutation);
            for _ in 0..planes_per_permutation {
                planes.push(read_f64s(&mut reader, dimension)?);
            }
            families.push(Family {
                planes,
                biases: Vec::new(),
            });
        }
        for family in &mut families {
            family.biases = read_f64s(&mut reader, planes_per_permutation)?;
        }

        if reader.position() != bytes.len() as u64 {
            return Err(LshError::Serialization(format!(
                "{} trailing bytes after hasher payload",
                bytes.len() as u64 - reader.position()
            )));
        }

        Ok(Hasher {
            config,
            families,
            mean,
            std,
            seed: None,
        })
    }
}

fn blob_len(d: usize, n: usize, p: usize) -> usize {
    4 + 4 + 3 * 4 + (2 * d + n * p * d + n * p) * 8
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader
        .read_exact(buf)
        .map_err(|_| LshError::Serialization("unexpected end of hasher payload".to_owned()))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64s<R: Read>(reader: &mut R, count: usize) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(count);
    let mut buf = [0u8; 8];
    for _ in 0..count {
        read_exact(reader, &mut buf)?;
        out.push(f64::from_le_bytes(buf));
    }
    Ok(out)
}
