//! Read-only reporting over a materialized snapshot.

use std::fmt;

use serde::Serialize;

use crate::distributions::Matrix;
use crate::state::Topic;
use crate::vocabulary::Vocabulary;

/// Highest-probability terms of one topic, in descending probability order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicWords {
    pub topic: Topic,
    pub words: Vec<(String, f64)>,
}

impl TopicWords {
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|(w, _)| w.as_str())
    }
}

impl fmt::Display for TopicWords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic {}: [", self.topic)?;
        for (i, (word, prob)) in self.words.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.3}", word, prob)?;
        }
        write!(f, "]")
    }
}

/// Top `n` terms per topic. Ties go to the lower term id; asking for more
/// terms than the vocabulary holds returns the whole vocabulary.
pub fn top_words(topic_term: &Matrix, vocab: &Vocabulary, n: usize) -> Vec<TopicWords> {
    topic_term
        .iter()
        .enumerate()
        .map(|(topic, row)| {
            let mut pairs: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
            // stable sort keeps id order among equal probabilities
            pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
            let words = pairs
                .into_iter()
                .take(n)
                .filter_map(|(w, p)| vocab.term(w).map(|term| (term.to_string(), p)))
                .collect();
            TopicWords { topic, words }
        })
        .collect()
}

/// argmax topic of every document, ties going to the lower topic id.
pub fn most_probable_topic(doc_topic: &Matrix) -> Vec<Topic> {
    doc_topic
        .iter()
        .map(|row| {
            let mut best_topic = 0;
            let mut best_prob = f64::NEG_INFINITY;
            for (topic, &p) in row.iter().enumerate() {
                if p > best_prob {
                    best_prob = p;
                    best_topic = topic;
                }
            }
            best_topic
        })
        .collect()
}
