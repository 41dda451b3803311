use rand::Rng;

use crate::config::InitStrategy;
use crate::corpus::Corpus;
use crate::error::{LdaError, Result};
use crate::state::CountState;
use crate::vocabulary::{TermId, Vocabulary};

/// Convert every document into term ids. A token missing from the vocabulary
/// means the vocabulary and corpus came from different inputs.
pub fn encode(corpus: &Corpus, vocab: &Vocabulary) -> Result<Vec<Vec<TermId>>> {
    let mut docs = Vec::with_capacity(corpus.len());
    for d in 0..corpus.len() {
        let mut ids = Vec::new();
        for (position, token) in corpus.tokens(d).enumerate() {
            let id = vocab.id(token).ok_or_else(|| LdaError::UnknownToken {
                document: d,
                position,
                token: token.to_string(),
            })?;
            ids.push(id);
        }
        docs.push(ids);
    }
    Ok(docs)
}

/// Draw an initial topic for every occurrence and build the matching counts.
pub fn assign<R: Rng + ?Sized>(
    docs: &[Vec<TermId>],
    num_terms: usize,
    k: usize,
    strategy: InitStrategy,
    rng: &mut R,
) -> CountState {
    let mut state = CountState::zeroed(docs.len(), k, num_terms);

    for (d, doc) in docs.iter().enumerate() {
        let doc_topic = match strategy {
            InitStrategy::Uniform => Some(rng.gen_range(0..k)),
            InitStrategy::Random => None,
        };

        let mut z = Vec::with_capacity(doc.len());
        for &w in doc {
            let topic = doc_topic.unwrap_or_else(|| rng.gen_range(0..k));
            z.push(topic);
            state.increment(d, w, topic);
        }
        state.z[d] = z;
    }

    state
}

/// Encode the corpus and assign initial topics in one step.
pub fn initialize<R: Rng + ?Sized>(
    corpus: &Corpus,
    vocab: &Vocabulary,
    k: usize,
    strategy: InitStrategy,
    rng: &mut R,
) -> Result<(Vec<Vec<TermId>>, CountState)> {
    if k == 0 {
        return Err(LdaError::InvalidTopicCount);
    }
    if vocab.is_empty() {
        return Err(LdaError::EmptyVocabulary);
    }

    let docs = encode(corpus, vocab)?;
    let state = assign(&docs, vocab.len(), k, strategy, rng);

    log::info!(
        "Initialized {} documents, {} occurrences, {} terms, {} topics ({} strategy)",
        docs.len(),
        state.total_occurrences(),
        vocab.len(),
        k,
        strategy
    );
    Ok((docs, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corpus() -> (Corpus, Vocabulary) {
        let corpus = Corpus::from_raw(&["cat dog cat", "dog fish"]);
        let vocab = Vocabulary::build(&corpus);
        (corpus, vocab)
    }

    #[test]
    fn test_uniform_shares_topic_within_document() {
        let (corpus, vocab) = corpus();
        let mut rng = StdRng::seed_from_u64(1);
        let (docs, state) =
            initialize(&corpus, &vocab, 5, InitStrategy::Uniform, &mut rng).unwrap();

        assert_eq!(docs, vec![vec![0, 1, 0], vec![1, 2]]);
        for z in state.assignments() {
            assert!(z.windows(2).all(|pair| pair[0] == pair[1]));
        }
        assert!(state.verify(&docs).is_ok());
    }

    #[test]
    fn test_random_counts_consistent() {
        let (corpus, vocab) = corpus();
        let mut rng = StdRng::seed_from_u64(2);
        let (docs, state) =
            initialize(&corpus, &vocab, 3, InitStrategy::Random, &mut rng).unwrap();

        assert!(state.verify(&docs).is_ok());
        assert_eq!(state.total_occurrences(), 5);
        assert!(state.assignments().iter().flatten().all(|&t| t < 3));
    }

    #[test]
    fn test_unknown_token_reports_location() {
        let corpus = Corpus::from_raw(&["cat dog", "dog bird"]);
        let vocab = Vocabulary::from_terms(vec!["cat".into(), "dog".into()]);
        let err = encode(&corpus, &vocab).unwrap_err();

        match err {
            LdaError::UnknownToken {
                document,
                position,
                token,
            } => {
                assert_eq!(document, 1);
                assert_eq!(position, 1);
                assert_eq!(token, "bird");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_empty_vocabulary() {
        let corpus = Corpus::from_raw(&["", "?"]);
        let vocab = Vocabulary::build(&corpus);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            initialize(&corpus, &vocab, 2, InitStrategy::Random, &mut rng),
            Err(LdaError::EmptyVocabulary)
        ));
    }
}
