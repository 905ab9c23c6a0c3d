//! Uniform sampling over dense index ranges with an exclusion list.
//!
//! Seeding and refinement both intern labels to positions `0..n` for the
//! duration of one compile, so sampling reduces to drawing distinct indices
//! while skipping a handful of avoided positions.

use rand::Rng;
use rand::seq::index;

/// Draw `count` distinct indices uniformly from `0..n`, never returning any
/// index in `avoid`.
///
/// `avoid` must be sorted ascending and free of duplicates. The draw is
/// performed over the shrunken range `0..n - avoid.len()` and remapped past
/// the avoided positions, so it is exactly uniform over the eligible set and
/// always terminates. Callers guarantee `count <= n - avoid.len()`.
pub fn distinct_indices<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    avoid: &[usize],
    count: usize,
) -> Vec<usize> {
    debug_assert!(avoid.windows(2).all(|pair| pair[0] < pair[1]));
    debug_assert!(avoid.iter().all(|&position| position < n));
    let eligible = n - avoid.len();
    debug_assert!(count <= eligible);

    index::sample(rng, eligible, count)
        .into_iter()
        .map(|drawn| past_avoided(drawn, avoid))
        .collect()
}

/// Map the `drawn`-th eligible index back onto `0..n` by stepping over every
/// avoided position at or below it.
fn past_avoided(drawn: usize, avoid: &[usize]) -> usize {
    let mut at = drawn;
    for &skipped in avoid {
        if skipped <= at {
            at += 1;
        } else {
            break;
        }
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn remapping_steps_over_avoided_positions() {
        let avoid = [1, 3];
        assert_eq!(past_avoided(0, &avoid), 0);
        assert_eq!(past_avoided(1, &avoid), 2);
        assert_eq!(past_avoided(2, &avoid), 4);
        assert_eq!(past_avoided(0, &[0, 1, 2]), 3);
        assert_eq!(past_avoided(5, &[]), 5);
    }

    #[test]
    fn never_returns_avoided_or_duplicate_indices() {
        let mut rng = rand::thread_rng();
        let avoid = [0, 7, 13, 19];

        for _ in 0..200 {
            let drawn = distinct_indices(&mut rng, 20, &avoid, 10);
            assert_eq!(drawn.len(), 10);
            let unique: HashSet<usize> = drawn.iter().copied().collect();
            assert_eq!(unique.len(), 10);
            for position in drawn {
                assert!(position < 20);
                assert!(!avoid.contains(&position));
            }
        }
    }

    #[test]
    fn exhausting_the_eligible_pool_returns_exactly_the_complement() {
        let mut rng = rand::thread_rng();
        let avoid = [2, 4];
        let mut drawn = distinct_indices(&mut rng, 6, &avoid, 4);
        drawn.sort_unstable();
        assert_eq!(drawn, vec![0, 1, 3, 5]);
    }

    #[test]
    fn every_eligible_index_is_eventually_drawn() {
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            seen.extend(distinct_indices(&mut rng, 10, &[5], 2));
        }
        assert_eq!(seen.len(), 9);
        assert!(!seen.contains(&5));
    }
}
