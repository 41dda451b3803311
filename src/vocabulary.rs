use std::collections::HashMap;

use crate::corpus::Corpus;

pub type TermId = usize;

/// Dense term ids in first-seen order plus global term frequencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    word_to_id: HashMap<String, TermId>,
    terms: Vec<String>,       // reverse lookup, index-aligned with ids
    term_counts: Vec<usize>,  // occurrences of each id across the corpus
}

impl Vocabulary {
    /// Scan the corpus in document order, left to right, assigning the next id
    /// to every token seen for the first time.
    pub fn build(corpus: &Corpus) -> Self {
        let mut vocab = Self::default();
        for d in 0..corpus.len() {
            for token in corpus.tokens(d) {
                vocab.observe(token);
            }
        }
        vocab
    }

    /// Rebuild a vocabulary from a saved reverse-lookup list. Term counts are
    /// not part of the list and start at zero.
    pub fn from_terms(terms: Vec<String>) -> Self {
        let word_to_id = terms
            .iter()
            .enumerate()
            .map(|(id, w)| (w.clone(), id))
            .collect();
        let term_counts = vec![0; terms.len()];
        Self {
            word_to_id,
            terms,
            term_counts,
        }
    }

    fn observe(&mut self, token: &str) {
        let id = match self.word_to_id.get(token) {
            Some(&id) => id,
            None => {
                let id = self.terms.len();
                self.terms.push(token.to_string());
                self.word_to_id.insert(token.to_string(), id);
                self.term_counts.push(0);
                id
            }
        };
        self.term_counts[id] += 1;
    }

    pub fn id(&self, term: &str) -> Option<TermId> {
        self.word_to_id.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn term_counts(&self) -> &[usize] {
        &self.term_counts
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_first_seen_order() {
        let corpus = Corpus::from_raw(&["cat dog cat", "dog fish"]);
        let vocab = Vocabulary::build(&corpus);

        assert_eq!(vocab.terms(), &["cat", "dog", "fish"]);
        assert_eq!(vocab.id("cat"), Some(0));
        assert_eq!(vocab.id("dog"), Some(1));
        assert_eq!(vocab.id("fish"), Some(2));
        assert_eq!(vocab.term_counts(), &[2, 2, 1]);
        assert_eq!(vocab.term(2), Some("fish"));
        assert_eq!(vocab.term(3), None);
        assert_eq!(vocab.id("bird"), None);
    }

    #[test]
    fn test_empty_corpus() {
        let vocab = Vocabulary::build(&Corpus::default());
        assert!(vocab.is_empty());
        assert_eq!(vocab.len(), 0);

        let vocab = Vocabulary::build(&Corpus::from_raw(&["", "!!!"]));
        assert!(vocab.is_empty());
    }

    #[test]
    fn test_from_terms() {
        let vocab = Vocabulary::from_terms(vec!["a".into(), "b".into()]);
        assert_eq!(vocab.id("b"), Some(1));
        assert_eq!(vocab.term_counts(), &[0, 0]);
    }
}
