//! Latent Dirichlet Allocation topic model fitted with collapsed Gibbs sampling.
//!
//! ```no_run
//! use gibbs_lda::{Lda, LdaConfig};
//!
//! let docs = ["cat dog cat", "dog fish"];
//! let config = LdaConfig::new(2).alpha(0.1).beta(0.1).num_iterations(100).random_seed(42);
//! let mut lda = Lda::from_documents(config, &docs)?;
//! lda.fit()?;
//! for topic in lda.top_words(3) {
//!     println!("{topic}");
//! }
//! # Ok::<(), gibbs_lda::LdaError>(())
//! ```
extern crate log;

pub mod checkpoint;
pub mod config;
pub mod corpus;
pub mod distributions;
pub mod error;
pub mod init;
pub mod model;
pub mod report;
pub mod sampler;
pub mod state;
pub mod visualization;
pub mod vocabulary;

pub use checkpoint::{Checkpoint, CheckpointHandle, CheckpointKind, CheckpointStore, Hyperparameters};
pub use config::{InitStrategy, LdaConfig};
pub use corpus::{clean, Corpus};
pub use distributions::{Distributions, Matrix};
pub use error::{LdaError, Result};
pub use model::{Lda, Phase, TrainingEvent};
pub use report::TopicWords;
pub use sampler::CancelToken;
pub use state::{CountState, Topic};
pub use visualization::VisualizationData;
pub use vocabulary::{TermId, Vocabulary};

/// Three topics, alpha 0.1, beta 0.01, seed 42, 800 sweeps for `fit`.
pub fn default(docs_raw: &[&str]) -> Result<Lda> {
    let config = LdaConfig::new(3)
        .alpha(0.1)
        .beta(0.01)
        .num_iterations(800)
        .random_seed(42);
    Lda::from_documents(config, docs_raw)
}
