//! Collapsed Gibbs sampling over the topic assignments.
//!
//! A sweep visits every occurrence in document order, then position order.
//! Each visit retracts the occurrence from the counts, scores every topic
//! against the remaining counts, draws a new topic and re-applies it, so the
//! next occurrence already sees the updated counts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;

use crate::error::{LdaError, Result};
use crate::state::{CountState, Topic};
use crate::vocabulary::TermId;

/// Cooperative cancellation flag, polled between occurrences.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Draw an index from a vector of cumulative, non-decreasing weights.
///
/// One uniform `u` in `[0, total)` is drawn and the first index whose
/// cumulative weight is strictly greater than `u` wins, so a draw landing
/// exactly on a boundary goes to the upper topic and zero-weight entries are
/// never selected. If rounding pushes `u` up to `total`, the last entry that
/// carries mass is returned. Returns `None` when the total is zero or not
/// finite.
pub fn draw_cumulative<R: Rng + ?Sized>(cumulative: &[f64], rng: &mut R) -> Option<usize> {
    let total = *cumulative.last()?;
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let u = rng.gen::<f64>() * total;
    let idx = cumulative.partition_point(|&c| c <= u);
    if idx < cumulative.len() {
        Some(idx)
    } else {
        cumulative.iter().position(|&c| c >= total)
    }
}

/// Draw an index proportionally to unnormalized, non-negative `weights`.
pub fn draw_categorical<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let mut acc = 0.0;
    let cumulative: Vec<f64> = weights
        .iter()
        .map(|&w| {
            acc += w;
            acc
        })
        .collect();
    draw_cumulative(&cumulative, rng)
}

/// Per-model sampler holding the priors and a reusable score buffer.
///
/// Works only on counts produced by [`crate::init::assign`] with the same
/// topic and term counts the sampler was built for.
#[derive(Debug, Clone)]
pub(crate) struct GibbsSampler {
    alpha: f64,
    beta: f64,
    vb: f64,              // V * beta
    k_alpha: f64,         // K * alpha
    cumulative: Vec<f64>, // scratch, one slot per topic
}

impl GibbsSampler {
    pub(crate) fn new(num_topics: usize, num_terms: usize, alpha: f64, beta: f64) -> Self {
        Self {
            alpha,
            beta,
            vb: num_terms as f64 * beta,
            k_alpha: num_topics as f64 * alpha,
            cumulative: vec![0.0; num_topics],
        }
    }

    /// Resample the topic of occurrence `pi` in document `di`.
    ///
    /// On a degenerate score vector the old topic is re-applied before the
    /// error is returned, leaving the counts consistent.
    pub(crate) fn sample_occurrence<R: Rng + ?Sized>(
        &mut self,
        state: &mut CountState,
        di: usize,
        pi: usize,
        w: TermId,
        rng: &mut R,
    ) -> Result<Topic> {
        let old_t = state.z[di][pi];
        let doc_len = state.z[di].len();

        // Retract
        state.decrement(di, w, old_t);

        // p(t) ∝ (nkw[t][w] + beta) / (nk[t] + V*beta) * (ndk[d][t] + alpha) / (N_d - 1 + K*alpha)
        let doc_den = (doc_len - 1) as f64 + self.k_alpha;
        let mut total = 0.0;
        for t in 0..self.cumulative.len() {
            let left = (state.nkw[t][w] as f64 + self.beta) / (state.nk[t] as f64 + self.vb);
            let right = (state.ndk[di][t] as f64 + self.alpha) / doc_den;
            total += left * right;
            self.cumulative[t] = total;
        }

        let new_t = match draw_cumulative(&self.cumulative, rng) {
            Some(t) => t,
            None => {
                state.increment(di, w, old_t);
                return Err(LdaError::DegenerateConditional {
                    document: di,
                    position: pi,
                    sum: total,
                });
            }
        };

        // Re-apply
        state.z[di][pi] = new_t;
        state.increment(di, w, new_t);
        Ok(new_t)
    }

    /// One full pass over every occurrence of the corpus.
    pub(crate) fn sweep<R: Rng + ?Sized>(
        &mut self,
        state: &mut CountState,
        docs: &[Vec<TermId>],
        rng: &mut R,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        for di in 0..docs.len() {
            for pi in 0..docs[di].len() {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(LdaError::Cancelled);
                }
                self.sample_occurrence(state, di, pi, docs[di][pi], rng)?;
            }
        }
        Ok(())
    }
}
