//! Sufficient statistics of the model.
//!
//! `z` is the only per-occurrence state; `ndk`, `nkw` and `nk` are aggregates
//! of it and are kept equal to those aggregates between occurrence updates.

use serde::{Deserialize, Serialize};

use crate::error::{LdaError, Result};
use crate::vocabulary::TermId;

pub type Topic = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountState {
    pub(crate) z: Vec<Vec<Topic>>,     // [doc][position]: assigned topic
    pub(crate) ndk: Vec<Vec<usize>>,   // [doc][topic]: # tokens in doc assigned to topic
    pub(crate) nkw: Vec<Vec<usize>>,   // [topic][term]: # occurrences of term in topic
    pub(crate) nk: Vec<usize>,         // [topic]: total tokens assigned to topic
}

impl CountState {
    /// Zeroed counts for `num_docs` documents, `k` topics and `v` terms with
    /// no assignments yet.
    pub(crate) fn zeroed(num_docs: usize, k: usize, v: usize) -> Self {
        Self {
            z: vec![Vec::new(); num_docs],
            ndk: vec![vec![0; k]; num_docs],
            nkw: vec![vec![0; v]; k],
            nk: vec![0; k],
        }
    }

    pub fn num_topics(&self) -> usize {
        self.nk.len()
    }

    pub fn num_docs(&self) -> usize {
        self.ndk.len()
    }

    pub fn num_terms(&self) -> usize {
        self.nkw.first().map_or(0, Vec::len)
    }

    /// Add one occurrence of term `w` in document `d` under topic `k`.
    #[inline]
    pub(crate) fn increment(&mut self, d: usize, w: TermId, k: Topic) {
        self.ndk[d][k] += 1;
        self.nkw[k][w] += 1;
        self.nk[k] += 1;
    }

    /// Remove one occurrence of term `w` in document `d` from topic `k`.
    #[inline]
    pub(crate) fn decrement(&mut self, d: usize, w: TermId, k: Topic) {
        self.ndk[d][k] -= 1;
        self.nkw[k][w] -= 1;
        self.nk[k] -= 1;
    }

    pub fn assignments(&self) -> &[Vec<Topic>] {
        &self.z
    }

    pub fn doc_topic(&self) -> &[Vec<usize>] {
        &self.ndk
    }

    pub fn topic_term(&self) -> &[Vec<usize>] {
        &self.nkw
    }

    pub fn topic_total(&self) -> &[usize] {
        &self.nk
    }

    pub fn doc_lengths(&self) -> Vec<usize> {
        self.z.iter().map(Vec::len).collect()
    }

    pub fn total_occurrences(&self) -> usize {
        self.nk.iter().sum()
    }

    /// Recompute every aggregate from `z` and the encoded documents and
    /// compare with the stored counts.
    pub fn verify(&self, docs: &[Vec<TermId>]) -> Result<()> {
        let k = self.num_topics();
        let v = self.num_terms();

        if self.z.len() != docs.len() || self.ndk.len() != docs.len() {
            return Err(LdaError::InconsistentCounts(format!(
                "state covers {} documents, corpus has {}",
                self.z.len(),
                docs.len()
            )));
        }
        if self.nkw.len() != k || self.nkw.iter().any(|row| row.len() != v) {
            return Err(LdaError::InconsistentCounts(
                "topic-term matrix is not rectangular".into(),
            ));
        }

        let mut expected = CountState::zeroed(docs.len(), k, v);
        for (d, doc) in docs.iter().enumerate() {
            if self.z[d].len() != doc.len() {
                return Err(LdaError::InconsistentCounts(format!(
                    "document {d} has {} assignments for {} occurrences",
                    self.z[d].len(),
                    doc.len()
                )));
            }
            if self.ndk[d].len() != k {
                return Err(LdaError::InconsistentCounts(format!(
                    "document {d} has {} topic counts, expected {k}",
                    self.ndk[d].len()
                )));
            }
            for (&w, &t) in doc.iter().zip(&self.z[d]) {
                if t >= k || w >= v {
                    return Err(LdaError::InconsistentCounts(format!(
                        "document {d} holds topic {t} / term {w} outside {k} topics / {v} terms"
                    )));
                }
                expected.increment(d, w, t);
            }
        }

        if expected.ndk != self.ndk || expected.nkw != self.nkw || expected.nk != self.nk {
            return Err(LdaError::InconsistentCounts(
                "count aggregates do not match topic assignments".into(),
            ));
        }
        Ok(())
    }
}
