use std::collections::HashMap;
use std::num::NonZeroUsize;

use pretty_assertions::assert_eq;

use crate::distance::VectorMetric;
use crate::tests::brute_nearest;
use crate::{DescentConfig, DescentIndex, Distance};

fn load_word_vectors() -> HashMap<String, Vec<f64>> {
    let words = std::fs::read_to_string("src/tests/fixtures/mock_words.json").unwrap();
    serde_json::from_str(&words).unwrap()
}

#[test]
fn word_vectors_compile_into_consistent_rows() {
    let words = load_word_vectors();
    let config = DescentConfig::new(3, 0.05).unwrap();
    let index =
        DescentIndex::new_with_config(words.clone(), config, VectorMetric::Euclidean).unwrap();

    for (word, vector) in &words {
        let row = index.nearest(word).unwrap();
        assert_eq!(row.len(), 3);
        for pair in row.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        for edge in &row {
            assert_ne!(&edge.label, word);
            let fresh = VectorMetric::Euclidean.distance(vector, &words[&edge.label]);
            assert_eq!(edge.distance, fresh);
        }
    }
}

#[test]
fn word_rows_never_beat_exhaustive_search() {
    let words = load_word_vectors();
    let config = DescentConfig::new(3, 0.05).unwrap();
    let index =
        DescentIndex::new_with_config(words.clone(), config, VectorMetric::Euclidean).unwrap();

    for word in words.keys() {
        let approximate = index.nearest(word).unwrap();
        let exact = brute_nearest(&words, word, 3, crate::distance::euclidean_distance);
        for (approximate, exact) in approximate.iter().zip(&exact) {
            assert!(approximate.distance >= exact.1 - 1e-12);
        }
    }
}

#[test]
fn word_index_reports_a_finite_error_ratio() {
    let words = load_word_vectors();
    let config = DescentConfig::new(3, 0.05).unwrap();
    let index = DescentIndex::new_with_config(words, config, VectorMetric::Euclidean).unwrap();

    let ratio = index.error_ratio(NonZeroUsize::new(12).unwrap()).unwrap();
    assert!(ratio.is_finite());
    assert!(ratio >= 1.0 - 1e-9);
}
