//! Built-in SIMD-dispatched metrics for dense `f64` vectors.
//!
//! The index itself never assumes anything about the distance it is given;
//! these exist so vector workloads do not have to hand-roll the common
//! metrics. All of them accept any `AsRef<[f64]>` payload through the
//! [`VectorMetric`] enum or can be called directly on slices.

use pulp::{Arch, Simd, WithSimd};

use crate::Distance;

/// Ready-made distances over dense vector payloads.
///
/// Every variant is a *distance* (smaller means closer); raw dot product is
/// deliberately absent because the refinement engine orders candidates by
/// ascending value. Use [`dot_product`] directly when a similarity score is
/// wanted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VectorMetric {
    Euclidean,
    SquaredEuclidean,
    Cosine,
}

impl<T: AsRef<[f64]>> Distance<T> for VectorMetric {
    fn distance(&self, a: &T, b: &T) -> f64 {
        match self {
            VectorMetric::Euclidean => euclidean_distance(a.as_ref(), b.as_ref()),
            VectorMetric::SquaredEuclidean => squared_euclidean_distance(a.as_ref(), b.as_ref()),
            VectorMetric::Cosine => cosine_distance(a.as_ref(), b.as_ref()),
        }
    }
}

struct SquaredDifference<'a> {
    first: &'a [f64],
    second: &'a [f64],
}

impl WithSimd for SquaredDifference<'_> {
    type Output = f64;

    #[inline(always)]
    fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
        let (first_head, first_tail) = S::f64s_as_simd(self.first);
        let (second_head, second_tail) = S::f64s_as_simd(self.second);

        let mut sum_of_squares = simd.f64s_splat(0.0);

        for (&chunk_first, &chunk_second) in first_head.iter().zip(second_head) {
            let diff = simd.f64s_sub(chunk_first, chunk_second);
            sum_of_squares = simd.f64s_mul_add(diff, diff, sum_of_squares);
        }

        let mut total = simd.f64s_reduce_sum(sum_of_squares);

        total += first_tail
            .iter()
            .zip(second_tail)
            .map(|(&x, &y)| {
                let diff = x - y;
                diff * diff
            })
            .sum::<f64>();

        total
    }
}

/// Sum of squared per-dimension differences, without the final square root.
///
/// Preserves the ordering of the Euclidean distance at a fraction of the
/// cost, which is all the neighbour graph cares about.
#[tracing::instrument(skip_all)]
pub fn squared_euclidean_distance(first: &[f64], second: &[f64]) -> f64 {
    assert_eq!(
        first.len(),
        second.len(),
        "Vectors must have the same length!"
    );

    let arch = Arch::new();
    arch.dispatch(SquaredDifference { first, second })
}

/// L2 distance between two vectors.
#[tracing::instrument(skip_all)]
pub fn euclidean_distance(first: &[f64], second: &[f64]) -> f64 {
    squared_euclidean_distance(first, second).sqrt()
}

struct DotAndNorms<'a> {
    first: &'a [f64],
    second: &'a [f64],
}

impl WithSimd for DotAndNorms<'_> {
    type Output = (f64, f64, f64);

    #[inline(always)]
    fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
        let (first_head, first_tail) = S::f64s_as_simd(self.first);
        let (second_head, second_tail) = S::f64s_as_simd(self.second);

        let mut dot = simd.f64s_splat(0.0);
        let mut norm_first = simd.f64s_splat(0.0);
        let mut norm_second = simd.f64s_splat(0.0);

        for (&chunk_first, &chunk_second) in first_head.iter().zip(second_head) {
            dot = simd.f64s_mul_add(chunk_first, chunk_second, dot);
            norm_first = simd.f64s_mul_add(chunk_first, chunk_first, norm_first);
            norm_second = simd.f64s_mul_add(chunk_second, chunk_second, norm_second);
        }

        let mut dot = simd.f64s_reduce_sum(dot);
        let mut norm_first = simd.f64s_reduce_sum(norm_first);
        let mut norm_second = simd.f64s_reduce_sum(norm_second);

        for (&x, &y) in first_tail.iter().zip(second_tail) {
            dot += x * y;
            norm_first += x * x;
            norm_second += y * y;
        }

        (dot, norm_first, norm_second)
    }
}

/// Dot product of two vectors. A similarity, not a distance: larger means
/// more aligned.
#[tracing::instrument(skip_all)]
pub fn dot_product(first: &[f64], second: &[f64]) -> f64 {
    assert_eq!(
        first.len(),
        second.len(),
        "Vectors must have the same length!"
    );

    let arch = Arch::new();
    let (dot, _, _) = arch.dispatch(DotAndNorms { first, second });
    dot
}

/// Cosine distance, `1 - cos(angle)`, in `[0, 2]`.
///
/// Dot product and both magnitudes come out of a single fused pass over the
/// operands. A zero-magnitude operand has no direction to compare, so the
/// distance defaults to `1.0` (orthogonal).
#[tracing::instrument(skip_all)]
pub fn cosine_distance(first: &[f64], second: &[f64]) -> f64 {
    assert_eq!(
        first.len(),
        second.len(),
        "Vectors must have the same length!"
    );

    let arch = Arch::new();
    let (dot, norm_first, norm_second) = arch.dispatch(DotAndNorms { first, second });

    let magnitude = norm_first.sqrt() * norm_second.sqrt();
    if magnitude == 0.0 {
        return 1.0;
    }
    1.0 - dot / magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_squared_euclidean(first: &[f64], second: &[f64]) -> f64 {
        first
            .iter()
            .zip(second)
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }

    fn scalar_dot(first: &[f64], second: &[f64]) -> f64 {
        first.iter().zip(second).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn euclidean_matches_hand_computation() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        let expected = (27.0f64).sqrt();
        assert!((euclidean_distance(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_one() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_of_parallel_vectors_is_zero() {
        let a = vec![0.5, 1.5, -2.0];
        let b = vec![1.0, 3.0, -4.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-12);
    }

    #[test]
    fn cosine_of_zero_vector_defaults_to_one() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_distance(&a, &b), 1.0);
    }

    #[test]
    fn simd_dispatch_agrees_with_scalar_on_odd_lengths() {
        // Odd lengths exercise the scalar tail after the SIMD chunks.
        for len in [1usize, 3, 7, 15, 31, 64, 129] {
            let a: Vec<f64> = (0..len).map(|i| (i as f64).sin()).collect();
            let b: Vec<f64> = (0..len).map(|i| (i as f64).cos()).collect();

            let simd = squared_euclidean_distance(&a, &b);
            let scalar = scalar_squared_euclidean(&a, &b);
            assert!(
                (simd - scalar).abs() < 1e-9,
                "squared euclidean mismatch at len {len}: {simd} vs {scalar}"
            );

            let simd = dot_product(&a, &b);
            let scalar = scalar_dot(&a, &b);
            assert!(
                (simd - scalar).abs() < 1e-9,
                "dot mismatch at len {len}: {simd} vs {scalar}"
            );
        }
    }

    #[test]
    fn metric_enum_routes_to_the_slice_functions() {
        let a = vec![1.0, 2.0];
        let b = vec![4.0, 6.0];
        assert_eq!(VectorMetric::SquaredEuclidean.distance(&a, &b), 25.0);
        assert_eq!(VectorMetric::Euclidean.distance(&a, &b), 5.0);
        assert_eq!(
            VectorMetric::Cosine.distance(&a, &b),
            cosine_distance(&a, &b)
        );
    }
}
