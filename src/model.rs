use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::checkpoint::{Checkpoint, CheckpointHandle, CheckpointKind, CheckpointStore, Hyperparameters};
use crate::config::LdaConfig;
use crate::corpus::Corpus;
use crate::distributions::{self, Distributions, Matrix};
use crate::error::{LdaError, Result};
use crate::init;
use crate::report::{self, TopicWords};
use crate::sampler::{CancelToken, GibbsSampler};
use crate::state::{CountState, Topic};
use crate::visualization::VisualizationData;
use crate::vocabulary::{TermId, Vocabulary};

/// Lifecycle of a model. An unbuilt model is simply one that has not been
/// constructed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Topics assigned, no sweep run yet
    Initialized,
    /// Inside `run`
    Training,
    /// Handing a checkpoint out, or just restored from one
    Checkpointed,
    /// A `run` returned, normally or with an error
    Stopped,
}

/// Progress notifications delivered by [`Lda::run_with`].
#[derive(Debug)]
pub enum TrainingEvent<'a> {
    /// A sweep finished; `iteration` counts every sweep the model has done.
    SweepFinished { iteration: usize },
    /// The configured checkpoint period elapsed.
    Checkpoint(&'a Checkpoint),
}

pub struct Lda {
    config: LdaConfig,

    // corpus and vocabulary
    vocab: Vocabulary,
    docs: Vec<Vec<TermId>>, // documents as term ids

    // latent variables & counts
    state: CountState,
    sampler: GibbsSampler,

    // materialized snapshots and whether counts moved since
    dists: Distributions,
    doc_topic_stale: bool,
    topic_term_stale: bool,

    iterations_done: usize,
    phase: Phase,
    cancel: Option<CancelToken>,
    rng: StdRng,
}

impl Lda {
    /// Build the vocabulary from `corpus`, encode it and assign initial topics.
    pub fn new(config: LdaConfig, corpus: &Corpus) -> Result<Self> {
        let vocab = Vocabulary::build(corpus);
        Self::with_vocabulary(config, corpus, vocab)
    }

    /// Same as [`Lda::new`] with a vocabulary built elsewhere. Every corpus
    /// token must be present in it.
    pub fn with_vocabulary(config: LdaConfig, corpus: &Corpus, vocab: Vocabulary) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (docs, state) = init::initialize(
            corpus,
            &vocab,
            config.num_topics,
            config.init_strategy,
            &mut rng,
        )?;
        let sampler = GibbsSampler::new(config.num_topics, vocab.len(), config.alpha, config.beta);

        Ok(Self {
            config,
            vocab,
            docs,
            state,
            sampler,
            dists: Distributions::default(),
            doc_topic_stale: true,
            topic_term_stale: true,
            iterations_done: 0,
            phase: Phase::Initialized,
            cancel: None,
            rng,
        })
    }

    /// Create a model from raw text documents, cleaning each one.
    pub fn from_documents<S: AsRef<str>>(config: LdaConfig, docs_raw: &[S]) -> Result<Self> {
        Self::new(config, &Corpus::from_raw(docs_raw))
    }

    /// Create a model from a line-oriented corpus file of pre-cleaned documents.
    pub fn from_path(config: LdaConfig, path: impl AsRef<Path>) -> Result<Self> {
        Self::new(config, &Corpus::from_path(path)?)
    }

    /// Poll `token` between occurrences; a cancelled run returns
    /// [`LdaError::Cancelled`] with consistent counts.
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    fn mark_stale(&mut self) {
        self.doc_topic_stale = true;
        self.topic_term_stale = true;
    }

    /// One sweep over every occurrence of the corpus.
    pub fn run_iteration(&mut self) -> Result<()> {
        let result = self
            .sampler
            .sweep(&mut self.state, &self.docs, &mut self.rng, self.cancel.as_ref());
        self.mark_stale();
        result?;
        self.iterations_done += 1;
        Ok(())
    }

    /// Perform `iters` sweeps without observing progress.
    pub fn run(&mut self, iters: usize) -> Result<()> {
        self.run_with(iters, |_| Ok(()))
    }

    /// Perform `iters` sweeps, reporting every sweep to `observer`.
    ///
    /// With a checkpoint period `p` configured, a checkpoint event follows
    /// sweep `i` of this call whenever `i % p == 0`, except after the last
    /// sweep. Distributions are materialized before each checkpoint. An
    /// error from `observer` stops the run.
    pub fn run_with<F>(&mut self, iters: usize, mut observer: F) -> Result<()>
    where
        F: FnMut(TrainingEvent<'_>) -> Result<()>,
    {
        self.phase = Phase::Training;
        let result = self.run_sweeps(iters, &mut observer);
        self.phase = Phase::Stopped;
        result
    }

    fn run_sweeps<F>(&mut self, iters: usize, observer: &mut F) -> Result<()>
    where
        F: FnMut(TrainingEvent<'_>) -> Result<()>,
    {
        let period = self.config.checkpoint_period();

        for it in 1..=iters {
            self.run_iteration()?;
            observer(TrainingEvent::SweepFinished {
                iteration: self.iterations_done,
            })?;

            if period.is_some_and(|p| it % p == 0) && it != iters {
                self.materialize();
                let checkpoint = self.checkpoint();
                self.phase = Phase::Checkpointed;
                observer(TrainingEvent::Checkpoint(&checkpoint))?;
                self.phase = Phase::Training;
            }

            if it % 50 == 0 {
                log::debug!("Training LDA: iteration {}/{}", it, iters);
            }
        }
        Ok(())
    }

    /// Run the configured number of sweeps, then materialize both
    /// distributions. Intermediate checkpoints go to
    /// `<checkpoint_dir>/intermediate_output` when a directory is configured.
    pub fn fit(&mut self) -> Result<()> {
        self.fit_with(|_| Ok(()))
    }

    pub fn fit_with<F>(&mut self, mut observer: F) -> Result<()>
    where
        F: FnMut(TrainingEvent<'_>) -> Result<()>,
    {
        let store = self.config.checkpoint_dir.clone().map(CheckpointStore::new);
        let iters = self.config.num_iterations;
        log::info!(
            "Fitting the LDA model: {} iterations from iteration {}",
            iters,
            self.iterations_done
        );

        self.run_with(iters, |event| {
            if let (TrainingEvent::Checkpoint(checkpoint), Some(store)) = (&event, &store) {
                store.save(checkpoint, CheckpointKind::Intermediate)?;
            }
            observer(event)
        })?;

        self.materialize();
        log::info!("Fit complete after {} iterations", self.iterations_done);
        Ok(())
    }

    /// Recompute both distributions from the current counts.
    pub fn materialize(&mut self) -> &Distributions {
        self.materialize_doc_topic();
        self.materialize_topic_term();
        &self.dists
    }

    /// Recompute the document-topic distribution from the current counts.
    pub fn materialize_doc_topic(&mut self) -> Arc<Matrix> {
        let m = Arc::new(distributions::materialize_doc_topic(&self.state));
        self.dists.doc_topic = Some(Arc::clone(&m));
        self.doc_topic_stale = false;
        m
    }

    /// Recompute the topic-term distribution from the current counts.
    pub fn materialize_topic_term(&mut self) -> Arc<Matrix> {
        let m = Arc::new(distributions::materialize_topic_term(&self.state));
        self.dists.topic_term = Some(Arc::clone(&m));
        self.topic_term_stale = false;
        m
    }

    fn fresh_doc_topic(&mut self) -> Arc<Matrix> {
        if !self.doc_topic_stale {
            if let Some(m) = &self.dists.doc_topic {
                return Arc::clone(m);
            }
        }
        self.materialize_doc_topic()
    }

    fn fresh_topic_term(&mut self) -> Arc<Matrix> {
        if !self.topic_term_stale {
            if let Some(m) = &self.dists.topic_term {
                return Arc::clone(m);
            }
        }
        self.materialize_topic_term()
    }

    /// Last materialized distributions. They may predate the latest sweep,
    /// see [`Lda::is_stale`].
    pub fn distributions(&self) -> &Distributions {
        &self.dists
    }

    /// Whether the counts changed since either distribution was last
    /// materialized (or it never was).
    pub fn is_stale(&self) -> bool {
        self.doc_topic_stale || self.topic_term_stale
    }

    /// Smoothed document-topic estimate, see [`distributions::theta`].
    pub fn theta(&self) -> Matrix {
        distributions::theta(&self.state, self.config.alpha)
    }

    /// Smoothed topic-term estimate, see [`distributions::phi`].
    pub fn phi(&self) -> Matrix {
        distributions::phi(&self.state, self.config.beta)
    }

    /// Top `n` words of every topic. Stale distributions are re-materialized
    /// first.
    pub fn top_words(&mut self, n: usize) -> Vec<TopicWords> {
        let topic_term = self.fresh_topic_term();
        report::top_words(&topic_term, &self.vocab, n)
    }

    /// Most probable topic of every document. Stale distributions are
    /// re-materialized first.
    pub fn most_probable_topic(&mut self) -> Vec<Topic> {
        let doc_topic = self.fresh_doc_topic();
        report::most_probable_topic(&doc_topic)
    }

    /// Inputs for an external visualizer, materializing on demand. Term
    /// frequencies are taken from the counts, so they describe the corpus the
    /// model was trained on.
    pub fn visualization_data(&mut self) -> VisualizationData {
        let topic_term = self.fresh_topic_term();
        let doc_topic = self.fresh_doc_topic();

        let mut term_frequency = vec![0; self.vocab.len()];
        for row in self.state.topic_term() {
            for (w, &c) in row.iter().enumerate() {
                term_frequency[w] += c;
            }
        }

        VisualizationData {
            topic_term_dists: (*topic_term).clone(),
            doc_topic_dists: (*doc_topic).clone(),
            doc_lengths: self.state.doc_lengths(),
            vocab: self.vocab.terms().to_vec(),
            term_frequency,
        }
    }

    fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            num_topics: self.config.num_topics,
            num_iterations: self.config.num_iterations,
            alpha: self.config.alpha,
            beta: self.config.beta,
        }
    }

    /// Snapshot the counts, plus each distribution that is up to date.
    pub fn checkpoint(&self) -> Checkpoint {
        let doc_topic = if self.doc_topic_stale {
            None
        } else {
            self.dists.doc_topic.as_deref().cloned()
        };
        let topic_term = if self.topic_term_stale {
            None
        } else {
            self.dists.topic_term.as_deref().cloned()
        };
        Checkpoint::new(
            self.hyperparameters(),
            self.iterations_done,
            self.state.clone(),
            doc_topic,
            topic_term,
            self.vocab.terms().to_vec(),
        )
    }

    /// Materialize and save a checkpoint into `store`.
    pub fn save_checkpoint(
        &mut self,
        store: &CheckpointStore,
        kind: CheckpointKind,
    ) -> Result<CheckpointHandle> {
        self.materialize();
        let handle = store.save(&self.checkpoint(), kind)?;
        self.phase = Phase::Checkpointed;
        Ok(handle)
    }

    /// Re-attach a loaded checkpoint. Topic count, vocabulary and the counts
    /// themselves are checked against this model's corpus; differing priors
    /// are only logged.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.params.num_topics != self.config.num_topics {
            return Err(LdaError::DimensionMismatch(format!(
                "checkpoint has {} topics, model has {}",
                checkpoint.params.num_topics, self.config.num_topics
            )));
        }
        if checkpoint.vocabulary.as_slice() != self.vocab.terms() {
            return Err(LdaError::DimensionMismatch(format!(
                "checkpoint vocabulary ({} terms) differs from model vocabulary ({} terms)",
                checkpoint.vocabulary.len(),
                self.vocab.len()
            )));
        }
        let (d, k, v) = (self.docs.len(), self.config.num_topics, self.vocab.len());
        let counts = &checkpoint.counts;
        if counts.num_docs() != d || counts.num_topics() != k || counts.num_terms() != v {
            return Err(LdaError::DimensionMismatch(format!(
                "checkpoint counts are {}x{}x{} (docs x topics x terms), model is {d}x{k}x{v}",
                counts.num_docs(),
                counts.num_topics(),
                counts.num_terms()
            )));
        }
        counts.verify(&self.docs)?;
        if let Some(m) = &checkpoint.doc_topic_dist {
            check_shape("document-topic", m, d, k)?;
        }
        if let Some(m) = &checkpoint.topic_term_dist {
            check_shape("topic-term", m, k, v)?;
        }

        if checkpoint.params.alpha != self.config.alpha || checkpoint.params.beta != self.config.beta {
            log::warn!(
                "Restoring checkpoint trained with alpha={} beta={} into model with alpha={} beta={}",
                checkpoint.params.alpha,
                checkpoint.params.beta,
                self.config.alpha,
                self.config.beta
            );
        }

        self.state = checkpoint.counts;
        self.iterations_done = checkpoint.iterations_done;
        self.doc_topic_stale = checkpoint.doc_topic_dist.is_none();
        self.topic_term_stale = checkpoint.topic_term_dist.is_none();
        self.dists = Distributions {
            doc_topic: checkpoint.doc_topic_dist.map(Arc::new),
            topic_term: checkpoint.topic_term_dist.map(Arc::new),
        };
        self.phase = Phase::Checkpointed;
        Ok(())
    }

    /// Build a model and restore the checkpoint at `handle` into it.
    pub fn resume(config: LdaConfig, corpus: &Corpus, handle: &CheckpointHandle) -> Result<Self> {
        let mut lda = Self::new(config, corpus)?;
        lda.restore(CheckpointStore::load(handle)?)?;
        Ok(lda)
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn documents(&self) -> &[Vec<TermId>] {
        &self.docs
    }

    pub fn counts(&self) -> &CountState {
        &self.state
    }

    pub fn num_topics(&self) -> usize {
        self.config.num_topics
    }

    pub fn num_documents(&self) -> usize {
        self.docs.len()
    }

    pub fn iterations_done(&self) -> usize {
        self.iterations_done
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

fn check_shape(name: &str, m: &Matrix, rows: usize, cols: usize) -> Result<()> {
    if m.len() != rows || m.iter().any(|row| row.len() != cols) {
        return Err(LdaError::DimensionMismatch(format!(
            "checkpoint {name} distribution is not {rows}x{cols}"
        )));
    }
    Ok(())
}

impl fmt::Display for Lda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vocabulary size : {}", self.vocab.len())?;
        writeln!(f, "documents : {}", self.docs.len())?;
        writeln!(f, "occurrences : {}", self.state.total_occurrences())?;
        writeln!(f, "num_topics : {}", self.config.num_topics)?;
        writeln!(f, "num_iterations : {}", self.config.num_iterations)?;
        writeln!(f, "iterations done : {}", self.iterations_done)?;
        writeln!(f, "alpha : {}", self.config.alpha)?;
        write!(f, "beta : {}", self.config.beta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitStrategy;
    use tempfile::tempdir;

    const DOCS: &[&str] = &[
        "apple banana apple fruit banana",
        "banana fruit apple fruit",
        "engine wheel car engine",
        "car wheel engine road",
        "apple fruit banana",
        "road car wheel",
    ];

    fn config(k: usize) -> LdaConfig {
        LdaConfig::new(k)
            .alpha(0.1)
            .beta(0.1)
            .num_iterations(20)
            .random_seed(42)
    }

    #[test]
    fn test_new_validates() {
        assert!(matches!(
            Lda::from_documents(LdaConfig::new(0), DOCS),
            Err(LdaError::InvalidTopicCount)
        ));
        assert!(matches!(
            Lda::from_documents(config(2), &["", "..."]),
            Err(LdaError::EmptyVocabulary)
        ));
    }

    #[test]
    fn test_phases() {
        let mut lda = Lda::from_documents(config(2), DOCS).unwrap();
        assert_eq!(lda.phase(), Phase::Initialized);
        lda.run(2).unwrap();
        assert_eq!(lda.phase(), Phase::Stopped);
        assert_eq!(lda.iterations_done(), 2);
        lda.run(3).unwrap();
        assert_eq!(lda.iterations_done(), 5);
    }

    #[test]
    fn test_staleness_tracking() {
        let mut lda = Lda::from_documents(config(2), DOCS).unwrap();
        assert!(lda.is_stale());
        assert!(!lda.distributions().is_materialized());

        lda.materialize();
        assert!(!lda.is_stale());
        let before = lda.distributions().topic_term.clone().unwrap();

        lda.run(1).unwrap();
        assert!(lda.is_stale());
        // old snapshot is still readable
        assert_eq!(before.len(), 2);

        let _ = lda.top_words(3);
        assert!(lda.doc_topic_stale);
        assert!(!lda.topic_term_stale);
        let _ = lda.most_probable_topic();
        assert!(!lda.is_stale());
    }

    #[test]
    fn test_checkpoint_events() {
        let mut lda = Lda::from_documents(config(2).save_every(3), DOCS).unwrap();
        let mut sweeps = Vec::new();
        let mut checkpoints = Vec::new();

        lda.run_with(10, |event| {
            match event {
                TrainingEvent::SweepFinished { iteration } => sweeps.push(iteration),
                TrainingEvent::Checkpoint(cp) => {
                    assert!(cp.doc_topic_dist.is_some());
                    assert!(cp.topic_term_dist.is_some());
                    checkpoints.push(cp.iterations_done);
                }
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(sweeps, (1..=10).collect::<Vec<_>>());
        assert_eq!(checkpoints, vec![3, 6, 9]);

        // the last sweep of a call never checkpoints
        let mut count = 0;
        lda.run_with(3, |event| {
            if matches!(event, TrainingEvent::Checkpoint(_)) {
                count += 1;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_observer_error_stops_run() {
        let mut lda = Lda::from_documents(config(2), DOCS).unwrap();
        let err = lda
            .run_with(10, |event| match event {
                TrainingEvent::SweepFinished { iteration: 4 } => Err(LdaError::Cancelled),
                _ => Ok(()),
            })
            .unwrap_err();
        assert!(matches!(err, LdaError::Cancelled));
        assert_eq!(lda.iterations_done(), 4);
        assert_eq!(lda.phase(), Phase::Stopped);
    }

    #[test]
    fn test_cancel_token() {
        let mut lda = Lda::from_documents(config(2), DOCS).unwrap();
        let token = CancelToken::new();
        lda.set_cancel_token(token.clone());
        lda.run(2).unwrap();

        token.cancel();
        assert!(matches!(lda.run(5), Err(LdaError::Cancelled)));
        assert_eq!(lda.iterations_done(), 2);
        assert!(lda.counts().verify(lda.documents()).is_ok());
    }

    #[test]
    fn test_fit_writes_intermediate_checkpoints() {
        let dir = tempdir().unwrap();
        let cfg = config(2)
            .num_iterations(7)
            .save_every(2)
            .checkpoint_dir(dir.path());
        let mut lda = Lda::from_documents(cfg, DOCS).unwrap();
        lda.fit().unwrap();

        assert!(!lda.is_stale());
        let store = CheckpointStore::new(dir.path());
        let saved = store.list(CheckpointKind::Intermediate).unwrap();
        assert_eq!(saved.len(), 3);
        let iterations: Vec<usize> = saved
            .iter()
            .map(|h| CheckpointStore::load(h).unwrap().iterations_done)
            .collect();
        let mut sorted = iterations.clone();
        sorted.sort();
        assert_eq!(sorted, vec![2, 4, 6]);
    }

    #[test]
    fn test_restore_round_trip() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut lda = Lda::from_documents(config(3), DOCS).unwrap();
        lda.run(5).unwrap();
        let handle = lda.save_checkpoint(&store, CheckpointKind::Final).unwrap();
        let saved_counts = lda.counts().clone();

        let cfg = config(3).random_seed(7);
        let resumed = Lda::resume(cfg, &Corpus::from_raw(DOCS), &handle).unwrap();
        assert_eq!(resumed.counts(), &saved_counts);
        assert_eq!(resumed.iterations_done(), 5);
        assert!(!resumed.is_stale());
        assert_eq!(resumed.phase(), Phase::Checkpointed);
    }

    #[test]
    fn test_restore_rejects_mismatch() {
        let mut two = Lda::from_documents(config(2), DOCS).unwrap();
        let mut three = Lda::from_documents(config(3), DOCS).unwrap();
        assert!(matches!(
            two.restore(three.checkpoint()),
            Err(LdaError::DimensionMismatch(_))
        ));

        let other = Lda::from_documents(config(3), &["apple pear", "plum"]).unwrap();
        assert!(matches!(
            three.restore(other.checkpoint()),
            Err(LdaError::DimensionMismatch(_))
        ));

        let mut cp = three.checkpoint();
        cp.counts.nk[0] += 1;
        assert!(matches!(
            three.restore(cp),
            Err(LdaError::InconsistentCounts(_))
        ));
    }

    #[test]
    fn test_restore_rejects_counts_with_other_topic_count() {
        let two = Lda::from_documents(config(2), DOCS).unwrap();
        let mut three = Lda::from_documents(config(3), DOCS).unwrap();
        let before = three.counts().clone();

        let mut cp = two.checkpoint();
        cp.params.num_topics = 3;
        assert!(matches!(
            three.restore(cp),
            Err(LdaError::DimensionMismatch(_))
        ));
        assert_eq!(three.counts(), &before);
        three.run(1).unwrap();
    }

    #[test]
    fn test_restore_rejects_misshapen_distributions() {
        let mut lda = Lda::from_documents(config(3), DOCS).unwrap();
        lda.materialize();

        let mut cp = lda.checkpoint();
        cp.doc_topic_dist.as_mut().unwrap().pop();
        assert!(matches!(
            lda.restore(cp),
            Err(LdaError::DimensionMismatch(_))
        ));

        let mut cp = lda.checkpoint();
        cp.topic_term_dist.as_mut().unwrap()[1].push(0.0);
        assert!(matches!(
            lda.restore(cp),
            Err(LdaError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_visualization_data() {
        let mut lda = Lda::from_documents(config(2).init_strategy(InitStrategy::Uniform), DOCS).unwrap();
        lda.run(3).unwrap();
        let vis = lda.visualization_data();

        assert_eq!(vis.topic_term_dists.len(), 2);
        assert_eq!(vis.doc_topic_dists.len(), DOCS.len());
        assert_eq!(vis.doc_lengths, vec![5, 4, 4, 4, 3, 3]);
        assert_eq!(vis.vocab, lda.vocabulary().terms());
        assert_eq!(vis.term_frequency, lda.vocabulary().term_counts());
    }

    #[test]
    fn test_display() {
        let lda = Lda::from_documents(config(2), DOCS).unwrap();
        let text = lda.to_string();
        assert!(text.contains("num_topics : 2"));
        assert!(text.contains("documents : 6"));
        assert!(text.contains("alpha : 0.1"));
    }

    #[test]
    fn test_smoothed_estimates_shape() {
        let lda = Lda::from_documents(config(2), DOCS).unwrap();
        assert_eq!(lda.theta().len(), DOCS.len());
        assert_eq!(lda.phi().len(), 2);
        assert_eq!(lda.phi()[0].len(), lda.vocabulary().len());
    }
}
