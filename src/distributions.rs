//! Normalized distributions derived from the counts.
//!
//! Materialized matrices are snapshots: each call builds new rows from the
//! current counts and never touches the counts themselves. A row whose counts
//! sum to zero (an empty document, a topic with no occurrences) becomes the
//! uniform distribution.

use std::sync::Arc;

use crate::state::CountState;

pub type Matrix = Vec<Vec<f64>>;

/// Divide a count row by its sum. Returns the row and whether it was empty.
fn normalize_row(counts: &[usize]) -> (Vec<f64>, bool) {
    let total: usize = counts.iter().sum();
    if total == 0 {
        let p = if counts.is_empty() { 0.0 } else { 1.0 / counts.len() as f64 };
        return (vec![p; counts.len()], true);
    }
    let total = total as f64;
    (counts.iter().map(|&c| c as f64 / total).collect(), false)
}

fn normalize_rows(rows: &[Vec<usize>], what: &str) -> Matrix {
    let mut empty = 0;
    let matrix = rows
        .iter()
        .map(|row| {
            let (dist, was_empty) = normalize_row(row);
            empty += usize::from(was_empty);
            dist
        })
        .collect();
    if empty > 0 {
        log::warn!("{empty} empty {what} rows materialized as uniform distributions");
    }
    matrix
}

/// docTopicDist[d][k] = ndk[d][k] / N_d
pub fn materialize_doc_topic(state: &CountState) -> Matrix {
    normalize_rows(state.doc_topic(), "document-topic")
}

/// topicTermDist[k][w] = nkw[k][w] / nk[k]
pub fn materialize_topic_term(state: &CountState) -> Matrix {
    normalize_rows(state.topic_term(), "topic-term")
}

/// θ[d][t] = (ndk[d][t] + α) / (N_d + K*α)
pub fn theta(state: &CountState, alpha: f64) -> Matrix {
    let k = state.num_topics();
    state
        .doc_topic()
        .iter()
        .map(|row| {
            let denom = row.iter().sum::<usize>() as f64 + k as f64 * alpha;
            row.iter().map(|&c| (c as f64 + alpha) / denom).collect()
        })
        .collect()
}

/// φ[t][w] = (nkw[t][w] + β) / (nk[t] + V*β)
pub fn phi(state: &CountState, beta: f64) -> Matrix {
    let vb = state.num_terms() as f64 * beta;
    state
        .topic_term()
        .iter()
        .zip(state.topic_total())
        .map(|(row, &total)| {
            let denom = total as f64 + vb;
            row.iter().map(|&c| (c as f64 + beta) / denom).collect()
        })
        .collect()
}

/// Latest materialized distributions, each absent until first computed.
///
/// Rows live behind `Arc`, so a reader holding a previous snapshot keeps a
/// consistent view when the model materializes again.
#[derive(Debug, Clone, Default)]
pub struct Distributions {
    pub doc_topic: Option<Arc<Matrix>>,
    pub topic_term: Option<Arc<Matrix>>,
}

impl Distributions {
    pub fn materialize(state: &CountState) -> Self {
        Self {
            doc_topic: Some(Arc::new(materialize_doc_topic(state))),
            topic_term: Some(Arc::new(materialize_topic_term(state))),
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.doc_topic.is_some() && self.topic_term.is_some()
    }
}
