use std::collections::HashMap;

use itertools::Itertools;
use rand::Rng;

mod word_fixture_tests;

/// Uniform random vectors in `[0, 1]^dims`, labelled "1".."count".
pub fn uniform_vectors(count: usize, dims: usize) -> HashMap<String, Vec<f64>> {
    let mut rng = rand::thread_rng();
    (1..=count)
        .map(|n| {
            let vector = (0..dims).map(|_| rng.gen_range(0.0..1.0)).collect();
            (n.to_string(), vector)
        })
        .collect()
}

/// Ground-truth k nearest neighbours by exhaustive scan.
pub fn brute_nearest(
    items: &HashMap<String, Vec<f64>>,
    query: &str,
    k: usize,
    distance: impl Fn(&[f64], &[f64]) -> f64,
) -> Vec<(String, f64)> {
    let query_vector = &items[query];
    items
        .iter()
        .filter(|(label, _)| label.as_str() != query)
        .map(|(label, vector)| (label.clone(), distance(query_vector, vector)))
        .sorted_by(|a, b| a.1.total_cmp(&b.1))
        .take(k)
        .collect()
}
