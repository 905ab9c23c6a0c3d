use std::cmp::Ordering as CmpOrdering;
use std::hash::Hash;
use std::mem;
use std::num::NonZeroUsize;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::LabelMap;

/// A single edge of the neighbour graph: who, and how far away.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neighbour<K> {
    pub label: K,
    pub distance: f64,
}

/// A bounded max-heap of neighbour candidates with per-label deduplication.
///
/// The heap is keyed by candidate label and prioritised by distance, with
/// the *largest* distance at the root: the root is the current worst
/// neighbour and therefore the eviction candidate. A side map from label to
/// heap slot is maintained through every swap, so duplicate candidates are
/// rejected in O(1) instead of wasting capacity on a second edge to the
/// same neighbour.
///
/// The heap knows its owning label and refuses it outright; an item never
/// counts itself among its own neighbours.
#[derive(Debug, Clone)]
pub struct NeighbourHeap<K> {
    owner: K,
    capacity: usize,
    entries: Vec<Neighbour<K>>,
    slots: LabelMap<K, usize>,
}

impl<K: Hash + Eq + Clone> NeighbourHeap<K> {
    pub fn new(owner: K, capacity: NonZeroUsize) -> Self {
        Self {
            owner,
            capacity: capacity.get(),
            entries: Vec::with_capacity(capacity.get()),
            slots: LabelMap::default(),
        }
    }

    /// The current worst neighbour, or `None` while empty.
    pub fn peek_max(&self) -> Option<&Neighbour<K>> {
        self.entries.first()
    }

    /// Offer a candidate edge to the heap.
    ///
    /// Returns `true` only for a real improvement: the candidate was
    /// admitted and either the heap had spare capacity or a strictly worse
    /// neighbour was evicted for it. Owners, labels already present, and
    /// candidates no better than the current worst (once full) are all
    /// rejected with `false` and leave the heap untouched.
    pub fn try_insert(&mut self, label: K, distance: f64) -> bool {
        if label == self.owner || self.slots.contains_key(&label) {
            return false;
        }

        if self.entries.len() < self.capacity {
            let at = self.entries.len();
            self.entries.push(Neighbour {
                label: label.clone(),
                distance,
            });
            self.slots.insert(label, at);
            self.sift_up(at);
            return true;
        }

        // Full: admit only strict improvements over the current worst.
        if distance >= self.entries[0].distance {
            return false;
        }
        let evicted = mem::replace(
            &mut self.entries[0],
            Neighbour {
                label: label.clone(),
                distance,
            },
        );
        self.slots.remove(&evicted.label);
        self.slots.insert(label, 0);
        self.sift_down(0);
        true
    }

    /// Destructively extract every entry, sorted by ascending distance.
    pub fn drain_ascending(&mut self) -> Vec<Neighbour<K>> {
        self.slots.clear();
        let mut drained = mem::take(&mut self.entries);
        drained.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        drained
    }

    /// A uniformly random member label, or `None` while empty.
    pub fn random_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&K> {
        if self.entries.is_empty() {
            return None;
        }
        Some(&self.entries[rng.gen_range(0..self.entries.len())].label)
    }

    pub fn contains(&self, label: &K) -> bool {
        self.slots.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn owner(&self) -> &K {
        &self.owner
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if self.ordered(parent, at) {
                break;
            }
            self.swap_slots(at, parent);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        loop {
            let left = 2 * at + 1;
            if left >= self.entries.len() {
                break;
            }
            let right = left + 1;
            let mut largest = if self.ordered(at, left) { at } else { left };
            if right < self.entries.len() && !self.ordered(largest, right) {
                largest = right;
            }
            if largest == at {
                break;
            }
            self.swap_slots(at, largest);
            at = largest;
        }
    }

    /// Max-heap order between a parent and child slot.
    fn ordered(&self, parent: usize, child: usize) -> bool {
        self.entries[parent]
            .distance
            .total_cmp(&self.entries[child].distance)
            != CmpOrdering::Less
    }

    /// Swap two entries, keeping the label-to-slot map in step.
    fn swap_slots(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        if let Some(slot) = self.slots.get_mut(&self.entries[a].label) {
            *slot = a;
        }
        if let Some(slot) = self.slots.get_mut(&self.entries[b].label) {
            *slot = b;
        }
    }
}
