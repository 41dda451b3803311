//! Corpus ingestion.
//!
//! Two sources are accepted and they are treated differently:
//!
//! * a line-oriented text source (first line is the decimal document count,
//!   then one document per line), whose documents are taken as already
//!   cleaned and only have trailing whitespace removed;
//! * an in-memory list of raw documents, each of which is passed through
//!   [`clean`] before it enters the corpus.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{LdaError, Result};

/// Lowercase, turn tabs and newlines into spaces, drop ASCII punctuation and
/// collapse runs of whitespace into single spaces. Digits are kept.
pub fn clean(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c == '\t' || c == '\n' { ' ' } else { c })
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered, immutable sequence of cleaned documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<String>,
}

impl Corpus {
    /// Build a corpus from raw document strings, cleaning each one.
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            documents: raw.iter().map(|d| clean(d.as_ref())).collect(),
        }
    }

    /// Build a corpus from documents that are already cleaned.
    pub fn from_cleaned(documents: Vec<String>) -> Self {
        Self { documents }
    }

    /// Read the line-oriented format: line 0 holds the document count, every
    /// following line is one pre-cleaned document.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line.map_err(|e| LdaError::MalformedCorpus(e.to_string()))?,
            None => return Err(LdaError::MalformedCorpus("missing document count line".into())),
        };
        let declared: usize = header.trim().parse().map_err(|_| {
            LdaError::MalformedCorpus(format!("document count {:?} is not a number", header.trim()))
        })?;

        let mut documents = Vec::with_capacity(declared);
        for line in lines {
            let line = line.map_err(|e| LdaError::MalformedCorpus(e.to_string()))?;
            documents.push(line.trim_end().to_string());
        }

        if documents.len() != declared {
            return Err(LdaError::DocumentCountMismatch {
                declared,
                actual: documents.len(),
            });
        }

        Ok(Self { documents })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LdaError::io(path, e))?;
        let corpus = Self::from_reader(BufReader::new(file))?;
        log::info!("Loaded {} documents from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Whitespace tokens of document `d`.
    pub fn tokens(&self, d: usize) -> impl Iterator<Item = &str> {
        self.documents[d].split_whitespace()
    }
}
