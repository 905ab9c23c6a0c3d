//! Nachbar builds an approximate k-nearest-neighbour graph over an arbitrary
//! labelled item set, using nothing but a caller-supplied pairwise distance
//! function. The distance is treated as an opaque callable: no symmetry, no
//! triangle inequality, only determinism on equal inputs is assumed.
//!
//! The index is compiled by iterative neighbours-of-neighbours refinement:
//! every item keeps a bounded heap of its best-known neighbours, random
//! triples `(u, v, w)` with `v` a neighbour of `u` and `w` a neighbour of `v`
//! are probed, and both endpoints adopt the other whenever the new edge beats
//! their current worst neighbour. Refinement stops once an epoch of trials
//! stops producing improvements.
//!
//! ```
//! use nachbar::DescentIndex;
//!
//! # fn main() -> Result<(), nachbar::error::Error> {
//! let items = (1..=100i64).map(|n| (n, n));
//! let index = DescentIndex::new(items, |a: &i64, b: &i64| (a - b).abs() as f64)?;
//!
//! for neighbour in index.k_nearest(&50, 3)? {
//!     println!("{} at distance {}", neighbour.label, neighbour.distance);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

pub mod descent;
pub mod distance;
pub mod error;
pub mod heap;
pub mod sample;

#[cfg(test)]
pub mod tests;

pub use descent::DescentConfig;
pub use descent::index::DescentIndex;
pub use heap::{Neighbour, NeighbourHeap};

/// Hash maps keyed by caller labels use ahash throughout: label lookups sit
/// on the refinement hot path and SipHash buys nothing here.
pub(crate) type LabelMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// A pairwise distance over item payloads.
///
/// Implemented for every `Fn(&V, &V) -> f64`, so a plain closure can be
/// handed to the index. Must return a non-negative value and be
/// deterministic for equal inputs; it need not be symmetric, and the index
/// never calls it twice for the same probe (both edge directions of a probe
/// reuse one evaluation).
pub trait Distance<V> {
    fn distance(&self, a: &V, b: &V) -> f64;
}

impl<V, F> Distance<V> for F
where
    F: Fn(&V, &V) -> f64,
{
    fn distance(&self, a: &V, b: &V) -> f64 {
        self(a, b)
    }
}
