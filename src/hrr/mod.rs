//! Holographic Reduced Representation vector algebra
//!
//! Fixed-dimension, unit-norm real vectors composed via FFT-based
//! circular convolution. `bind` associates a key with a value; `unbind`
//! recovers it (approximately, with crosstalk that grows with bundle
//! cardinality); `bundle` superposes several vectors into one.

use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{FftPlanner, num_complex::Complex};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A normalized real vector of fixed dimension.
pub type Vector = Vec<f32>;

/// Failures from HRR operations.
#[derive(Debug, Error, PartialEq)]
pub enum HrrError {
    #[error("cannot bundle an empty list of vectors")]
    EmptyBundle,
    #[error("vectors have mismatched dimension: {a} vs {b}")]
    DimensionMismatch { a: usize, b: usize },
}

/// L2-normalize a vector in place; a zero vector is left as-is.
fn normalize(v: &mut Vector) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn normalized(mut v: Vector) -> Vector {
    normalize(&mut v);
    v
}

/// A random unit vector drawn from the standard normal distribution.
#[must_use]
pub fn random_vector(dim: usize) -> Vector {
    use rand::Rng;
    use rand_distr::StandardNormal;

    let mut rng = rand::rng();
    let v: Vector = (0..dim).map(|_| rng.sample(StandardNormal)).collect();
    normalized(v)
}

/// A deterministic pseudo-random unit vector seeded by SHA-256 of `seed`.
/// Produces identical output for identical input across runs and
/// processes — the basis for every concept/token/role vector in the
/// system.
#[must_use]
pub fn seeded_vector(seed: &str, dim: usize) -> Vector {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use rand_distr::StandardNormal;

    let digest = Sha256::digest(seed.as_bytes());
    let mut seed_bytes = [0u8; 32];
    seed_bytes.copy_from_slice(&digest);
    let mut rng = StdRng::from_seed(seed_bytes);

    let v: Vector = (0..dim).map(|_| rng.sample(StandardNormal)).collect();
    normalized(v)
}

fn fft_forward(planner: &mut FftPlanner<f32>, mut buf: Vec<Complex32>) -> Vec<Complex32> {
    let fft = planner.plan_fft_forward(buf.len());
    fft.process(&mut buf);
    buf
}

fn fft_inverse(planner: &mut FftPlanner<f32>, mut buf: Vec<Complex32>) -> Vec<Complex32> {
    let fft = planner.plan_fft_inverse(buf.len());
    fft.process(&mut buf);
    buf
}

/// Circular convolution via FFT: `IFFT(FFT(a) . FFT(b)) / n`, then
/// normalized.
///
/// # Errors
/// Returns [`HrrError::DimensionMismatch`] if `a` and `b` differ in length.
pub fn bind(a: &Vector, b: &Vector) -> Result<Vector, HrrError> {
    if a.len() != b.len() {
        return Err(HrrError::DimensionMismatch {
            a: a.len(),
            b: b.len(),
        });
    }
    let n = a.len();
    let mut planner = FftPlanner::<f32>::new();

    let fa = fft_forward(&mut planner, a.iter().map(|&x| Complex::new(x, 0.0)).collect());
    let fb = fft_forward(&mut planner, b.iter().map(|&x| Complex::new(x, 0.0)).collect());

    let product: Vec<Complex32> = fa.iter().zip(fb.iter()).map(|(x, y)| x * y).collect();
    let conv = fft_inverse(&mut planner, product);

    let scale = n as f32;
    let result: Vector = conv.into_iter().map(|c| c.re / scale).collect();
    Ok(normalized(result))
}

/// The approximate involution used to invert a vector for `unbind`:
/// keep the first element, reverse the rest.
#[must_use]
pub fn inverse(v: &Vector) -> Vector {
    if v.is_empty() {
        return v.clone();
    }
    let mut out = Vec::with_capacity(v.len());
    out.push(v[0]);
    out.extend(v[1..].iter().rev());
    out
}

/// Recover (approximately) the vector bound to `b` within `c`.
///
/// # Errors
/// Returns [`HrrError::DimensionMismatch`] if `c` and `b` differ in length.
pub fn unbind(c: &Vector, b: &Vector) -> Result<Vector, HrrError> {
    bind(c, &inverse(b))
}

/// Normalized sum of several vectors.
///
/// # Errors
/// Returns [`HrrError::EmptyBundle`] if `vectors` is empty, or
/// [`HrrError::DimensionMismatch`] if they don't all share one dimension.
pub fn bundle(vectors: &[Vector]) -> Result<Vector, HrrError> {
    let Some(first) = vectors.first() else {
        return Err(HrrError::EmptyBundle);
    };
    let dim = first.len();
    let mut sum = vec![0.0f32; dim];
    for v in vectors {
        if v.len() != dim {
            return Err(HrrError::DimensionMismatch { a: dim, b: v.len() });
        }
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
    }
    Ok(normalized(sum))
}

/// Dot product of the (already unit-norm) vectors.
#[must_use]
pub fn similarity(a: &Vector, b: &Vector) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// A fixed-dimension HRR space. Holds the dimension and nothing else;
/// exists so call sites don't have to thread `dim` through every call.
#[derive(Debug, Clone)]
pub struct HrrSpace {
    dimension: usize,
}

impl HrrSpace {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn random(&self) -> Vector {
        random_vector(self.dimension)
    }

    #[must_use]
    pub fn seeded(&self, seed: &str) -> Vector {
        seeded_vector(seed, self.dimension)
    }
}

impl Default for HrrSpace {
    fn default() -> Self {
        Self::new(512)
    }
}

/// Shared, cheaply-clonable handle to a space, for actors that need to
/// hand the same dimension around without copying it.
pub type SharedSpace = Arc<HrrSpace>;

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 512;

    #[test]
    fn unit_norm_enforced_within_tolerance() {
        let v = random_vector(DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn seeded_vector_is_deterministic() {
        let a = seeded_vector("token_v2_hello", DIM);
        let b = seeded_vector("token_v2_hello", DIM);
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_vector_differs_by_seed() {
        let a = seeded_vector("a", DIM);
        let b = seeded_vector("b", DIM);
        assert_ne!(a, b);
    }

    #[test]
    fn bundle_of_one_is_identity() {
        let v = random_vector(DIM);
        let b = bundle(&[v.clone()]).unwrap();
        for (x, y) in v.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn bundle_of_empty_fails() {
        let result = bundle(&[]);
        assert_eq!(result, Err(HrrError::EmptyBundle));
    }

    #[test]
    fn unbind_after_bind_recovers_similar_vector() {
        let k = random_vector(DIM);
        let v = random_vector(DIM);
        let bound = bind(&k, &v).unwrap();
        let recovered = unbind(&bound, &k).unwrap();
        assert!(similarity(&recovered, &v) > 0.9);
    }

    #[test]
    fn bind_result_is_unit_norm() {
        let a = random_vector(DIM);
        let b = random_vector(DIM);
        let bound = bind(&a, &b).unwrap();
        let norm: f32 = bound.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bundle_unbind_recovers_paired_value_with_crosstalk() {
        let k1 = random_vector(DIM);
        let v1 = random_vector(DIM);
        let k2 = random_vector(DIM);
        let v2 = random_vector(DIM);

        let bundled = bundle(&[bind(&k1, &v1).unwrap(), bind(&k2, &v2).unwrap()]).unwrap();
        let recovered = unbind(&bundled, &k1).unwrap();
        assert!(similarity(&recovered, &v1) > 0.3);
    }

    #[test]
    fn bind_rejects_mismatched_dimensions() {
        let a = random_vector(DIM);
        let b = random_vector(DIM / 2);
        assert!(matches!(bind(&a, &b), Err(HrrError::DimensionMismatch { .. })));
    }

    #[test]
    fn similarity_of_vector_with_itself_is_one() {
        let v = random_vector(DIM);
        assert!((similarity(&v, &v) - 1.0).abs() < 1e-5);
    }
}
