use std::hash::Hash;
use std::num::NonZeroUsize;

use rand::Rng;

use crate::descent::DescentConfig;
use crate::error::Error;
use crate::heap::{Neighbour, NeighbourHeap};
use crate::sample;
use crate::{Distance, LabelMap};

/// Guards the rank-wise ratio against division by zero when the true
/// neighbour sits at distance zero.
const RATIO_EPSILON: f64 = 1e-10;

/// An approximate k-nearest-neighbour graph over labelled items.
///
/// The index owns its item store and a compiled graph: one row of up to `k`
/// `(label, distance)` entries per item, sorted by ascending distance.
/// Compilation seeds a working heap of `2 * k` candidates per item and then
/// runs randomised neighbours-of-neighbours refinement until an epoch of
/// trials stops improving the graph.
///
/// Design rationale:
/// 1. The distance is an injected capability, not a bound on the payload
///    type. Any deterministic `Fn(&V, &V) -> f64` works; no metric laws are
///    assumed or exploited, and asymmetric functions are folded into a
///    symmetric graph (both directions of a probe share one evaluation).
/// 2. Mutating the store marks the index dirty and queries fail with
///    `NotCompiled` until the next `compile` succeeds, so a row can never be
///    served against items it has not seen.
/// 3. Recompiling does not start from scratch: the previous compiled rows
///    seed half of each working heap and fresh random samples the other
///    half, so successive compiles tighten the graph rather than reroll it.
///
/// Example of a compiled row for item `42`:
/// ```text
/// 42 -> [(41, 1.0), (43, 1.0), (40, 2.0), (44, 2.0)]
/// ```
#[derive(Debug)]
pub struct DescentIndex<L, V, D> {
    config: DescentConfig,
    distance: D,
    items: LabelMap<L, V>,
    compiled: LabelMap<L, Vec<Neighbour<L>>>,
    dirty: bool,
}

impl<L, V, D> DescentIndex<L, V, D>
where
    L: Hash + Eq + Clone,
    D: Distance<V>,
{
    /// Build and immediately compile an index with the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// `InsufficientPool` when the store holds fewer than `2 * k + 1` items.
    pub fn new(items: impl IntoIterator<Item = (L, V)>, distance: D) -> Result<Self, Error> {
        Self::new_with_config(items, DescentConfig::default(), distance)
    }

    /// Build and immediately compile an index with an explicit
    /// configuration.
    ///
    /// # Errors
    ///
    /// Everything `compile` can return: `InvalidK`, `InvalidDelta`,
    /// `InsufficientPool`.
    pub fn new_with_config(
        items: impl IntoIterator<Item = (L, V)>,
        config: DescentConfig,
        distance: D,
    ) -> Result<Self, Error> {
        let mut index = Self {
            config,
            distance,
            items: items.into_iter().collect(),
            compiled: LabelMap::default(),
            dirty: true,
        };
        index.compile()?;
        Ok(index)
    }

    /// Insert or replace an item, returning the previous value under the
    /// label if any.
    ///
    /// The index becomes dirty: queries are refused until the next
    /// `compile`. The current compiled rows are retained, both to keep the
    /// failure mode cheap and because the next compile fuses them into its
    /// seeding.
    pub fn insert(&mut self, label: L, value: V) -> Option<V> {
        self.dirty = true;
        self.items.insert(label, value)
    }

    /// Recompile with the configured convergence threshold.
    pub fn compile(&mut self) -> Result<(), Error> {
        self.compile_with(self.config.delta)
    }

    /// Rebuild the neighbour graph, running refinement until the
    /// improvement ratio drops below `delta`, then clear the dirty flag.
    ///
    /// Nothing is mutated until the parameters and pool size have been
    /// validated, so a failed call leaves the previous compiled rows (and
    /// the dirty flag) exactly as they were.
    ///
    /// # Errors
    ///
    /// `InvalidDelta` outside `(0, 1]`, `InvalidK` for a zero `k`, and
    /// `InsufficientPool` when the store cannot supply `2 * k` distinct
    /// neighbours per item.
    #[tracing::instrument(skip_all)]
    pub fn compile_with(&mut self, delta: f64) -> Result<(), Error> {
        if !(delta > 0.0 && delta <= 1.0) {
            return Err(Error::InvalidDelta(delta));
        }
        let capacity = NonZeroUsize::new(self.config.working_capacity()).ok_or(Error::InvalidK)?;
        let n = self.items.len();
        if capacity.get() + 1 > n {
            return Err(Error::InsufficientPool {
                required: capacity.get(),
                available: n.saturating_sub(1),
            });
        }
        let mut rng = rand::thread_rng();

        // Labels are interned to dense positions for the duration of this
        // compile; heaps and sampling work on positions only.
        let (labels, values): (Vec<&L>, Vec<&V>) = self.items.iter().unzip();

        let mut graph = self.seed_working_graph(&labels, &values, capacity, &mut rng);
        self.compiled.clear();
        self.refine(&mut graph, &values, delta, &mut rng);

        let k = self.config.k;
        let mut compiled =
            LabelMap::with_capacity_and_hasher(n, ahash::RandomState::default());
        for (position, heap) in graph.iter_mut().enumerate() {
            let row: Vec<Neighbour<L>> = heap
                .drain_ascending()
                .into_iter()
                .take(k)
                .map(|edge| Neighbour {
                    label: labels[edge.label].clone(),
                    distance: edge.distance,
                })
                .collect();
            compiled.insert(labels[position].clone(), row);
        }
        self.compiled = compiled;
        self.dirty = false;
        Ok(())
    }

    /// The compiled row for `label`, truncated to its first `k` entries.
    ///
    /// An unknown label yields an empty vector rather than an error; only a
    /// dirty index refuses the query.
    ///
    /// # Errors
    ///
    /// `NotCompiled` while the store has uncompiled mutations.
    pub fn k_nearest(&self, label: &L, k: usize) -> Result<Vec<Neighbour<L>>, Error> {
        if self.dirty {
            return Err(Error::NotCompiled);
        }
        Ok(self
            .compiled
            .get(label)
            .map(|row| row[..k.min(row.len())].to_vec())
            .unwrap_or_default())
    }

    /// The compiled row for `label` at the configured `k`.
    ///
    /// # Errors
    ///
    /// `NotCompiled` while the store has uncompiled mutations.
    pub fn nearest(&self, label: &L) -> Result<Vec<Neighbour<L>>, Error> {
        self.k_nearest(label, self.config.k)
    }

    /// Measure compiled-graph quality against exact brute-force search.
    ///
    /// Draws `sample_size` items uniformly with replacement, computes the
    /// exact `k` nearest for each by scanning the whole store, and compares
    /// rank by rank: each rank contributes
    /// `(approximate + eps) / (exact + eps)` and the result is the mean over
    /// ranks and samples. A perfect graph scores exactly `1.0`; for any
    /// non-negative distance the expectation never falls below it.
    ///
    /// # Errors
    ///
    /// `NotCompiled` while dirty; `LengthMismatch` if a compiled row and the
    /// exact search disagree on row length, which indicates a bug rather
    /// than a caller mistake.
    #[tracing::instrument(skip_all)]
    pub fn error_ratio(&self, sample_size: NonZeroUsize) -> Result<f64, Error> {
        if self.dirty {
            return Err(Error::NotCompiled);
        }
        let mut rng = rand::thread_rng();

        // A clean index has a compiled row for every stored item.
        let rows: Vec<(&L, &V, &[Neighbour<L>])> = self
            .items
            .iter()
            .filter_map(|(label, value)| {
                self.compiled
                    .get(label)
                    .map(|row| (label, value, row.as_slice()))
            })
            .collect();

        let mut total = 0.0;
        for _ in 0..sample_size.get() {
            let (query_label, query_value, row) = rows[rng.gen_range(0..rows.len())];
            let exact = self.exact_nearest(query_label, query_value)?;
            if row.len() != exact.len() {
                return Err(Error::LengthMismatch {
                    compiled: row.len(),
                    exact: exact.len(),
                });
            }
            let summed: f64 = row
                .iter()
                .zip(&exact)
                .map(|(approximate, exact)| {
                    (approximate.distance + RATIO_EPSILON) / (exact.distance + RATIO_EPSILON)
                })
                .sum();
            total += summed / row.len() as f64;
        }
        Ok(total / sample_size.get() as f64)
    }

    /// Number of items in the store, compiled or not.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, label: &L) -> bool {
        self.items.contains_key(label)
    }

    pub fn get(&self, label: &L) -> Option<&V> {
        self.items.get(label)
    }

    /// False whenever the store has been mutated since the last successful
    /// compile.
    pub fn is_compiled(&self) -> bool {
        !self.dirty
    }

    pub fn config(&self) -> &DescentConfig {
        &self.config
    }

    /// Build one working heap per item.
    ///
    /// Cold items draw their full candidate set at random. Items with a row
    /// from a previous compile keep that row as the seed and only draw the
    /// remaining capacity fresh, excluding the seeded positions from the
    /// draw.
    fn seed_working_graph<R: Rng + ?Sized>(
        &self,
        labels: &[&L],
        values: &[&V],
        capacity: NonZeroUsize,
        rng: &mut R,
    ) -> Vec<NeighbourHeap<usize>> {
        let n = labels.len();
        let positions: LabelMap<&L, usize> = labels
            .iter()
            .enumerate()
            .map(|(at, &label)| (label, at))
            .collect();

        let mut graph = Vec::with_capacity(n);
        for (position, &label) in labels.iter().enumerate() {
            let mut heap = NeighbourHeap::new(position, capacity);
            let mut avoid = vec![position];

            if let Some(row) = self.compiled.get(label) {
                for edge in row {
                    if let Some(&seeded) = positions.get(&edge.label) {
                        if heap.try_insert(seeded, edge.distance) {
                            avoid.push(seeded);
                        }
                    }
                }
                avoid.sort_unstable();
            }

            let fresh = capacity.get() - heap.len();
            for drawn in sample::distinct_indices(rng, n, &avoid, fresh) {
                let distance = self.distance.distance(values[position], values[drawn]);
                heap.try_insert(drawn, distance);
            }
            graph.push(heap);
        }
        graph
    }

    /// Neighbours-of-neighbours refinement until convergence.
    ///
    /// Each epoch runs one trial per item: pick a random item `u`, a random
    /// neighbour `v` of `u`, a random neighbour `w` of `v`, and offer the
    /// edge between `u` and `w` to both endpoints using a single distance
    /// evaluation.
    /// An epoch's improvement ratio is its accepted offers over `n`; the
    /// loop stops once an epoch accepts nothing or the best ratio seen so
    /// far falls below `delta`. The stop test deliberately uses the running
    /// minimum: after one epoch crosses the threshold, later epochs exit
    /// regardless of their own ratio.
    fn refine<R: Rng + ?Sized>(
        &self,
        graph: &mut [NeighbourHeap<usize>],
        values: &[&V],
        delta: f64,
        rng: &mut R,
    ) {
        let n = graph.len();
        let mut best_ratio = f64::INFINITY;
        let mut epoch = 0usize;
        loop {
            epoch += 1;
            let mut improved = 0usize;
            for _ in 0..n {
                let u = rng.gen_range(0..n);
                let Some(&v) = graph[u].random_key(rng) else {
                    continue;
                };
                let Some(&w) = graph[v].random_key(rng) else {
                    continue;
                };
                if w == u {
                    continue;
                }
                let d = self.distance.distance(values[u], values[w]);
                for (x, y) in [(u, w), (w, u)] {
                    let worst = graph[x].peek_max().map(|edge| edge.distance);
                    if worst.is_some_and(|worst| worst > d) && graph[x].try_insert(y, d) {
                        improved += 1;
                    }
                }
            }
            let ratio = improved as f64 / n as f64;
            best_ratio = best_ratio.min(ratio);
            tracing::debug!(epoch, improved, ratio, best_ratio, "refinement epoch finished");
            if improved == 0 || best_ratio < delta {
                break;
            }
        }
    }

    /// Exact k-nearest by full scan, used as the ground truth for
    /// `error_ratio`.
    fn exact_nearest<'a>(
        &'a self,
        query_label: &'a L,
        query_value: &V,
    ) -> Result<Vec<Neighbour<&'a L>>, Error> {
        let capacity = NonZeroUsize::new(self.config.k).ok_or(Error::InvalidK)?;
        let mut heap = NeighbourHeap::new(query_label, capacity);
        for (label, value) in &self.items {
            if label == query_label {
                continue;
            }
            heap.try_insert(label, self.distance.distance(query_value, value));
        }
        Ok(heap.drain_ascending())
    }
}

impl<V, D> DescentIndex<V, V, D>
where
    V: Hash + Eq + Clone,
    D: Distance<V>,
{
    /// Build an index over self-labelling items: each value doubles as its
    /// own label.
    ///
    /// # Errors
    ///
    /// `InsufficientPool` when fewer than `2 * k + 1` values are supplied.
    pub fn from_values(values: impl IntoIterator<Item = V>, distance: D) -> Result<Self, Error> {
        Self::from_values_with_config(values, DescentConfig::default(), distance)
    }

    /// `from_values` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Everything `compile` can return: `InvalidK`, `InvalidDelta`,
    /// `InsufficientPool`.
    pub fn from_values_with_config(
        values: impl IntoIterator<Item = V>,
        config: DescentConfig,
        distance: D,
    ) -> Result<Self, Error> {
        Self::new_with_config(
            values.into_iter().map(|value| (value.clone(), value)),
            config,
            distance,
        )
    }

    /// Insert a self-labelling item, returning the previous value if the
    /// label existed.
    pub fn insert_value(&mut self, value: V) -> Option<V> {
        self.insert(value.clone(), value)
    }
}
