use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a corpus, training or checkpointing a model.
#[derive(Error, Debug)]
pub enum LdaError {
    #[error("number of topics must be positive")]
    InvalidTopicCount,

    #[error("invalid hyperparameter {name}: {value} (must be finite and positive)")]
    InvalidHyperparameter { name: &'static str, value: f64 },

    #[error("unknown initialization strategy {0:?} (expected uniform or random)")]
    UnknownInitStrategy(String),

    #[error("vocabulary is empty, nothing to train on")]
    EmptyVocabulary,

    #[error("malformed corpus: {0}")]
    MalformedCorpus(String),

    #[error("corpus declares {declared} documents but contains {actual}")]
    DocumentCountMismatch { declared: usize, actual: usize },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("token {token:?} at document {document}, position {position} is not in the vocabulary")]
    UnknownToken {
        document: usize,
        position: usize,
        token: String,
    },

    #[error("inconsistent counts: {0}")]
    InconsistentCounts(String),

    #[error("degenerate conditional at document {document}, position {position}: score sum {sum}")]
    DegenerateConditional {
        document: usize,
        position: usize,
        sum: f64,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("training cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LdaError>;

impl LdaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LdaError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<bincode::Error> for LdaError {
    fn from(e: bincode::Error) -> Self {
        LdaError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for LdaError {
    fn from(e: serde_json::Error) -> Self {
        LdaError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LdaError::UnknownToken {
            document: 3,
            position: 7,
            token: "zebra".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("zebra"));
        assert!(msg.contains("document 3"));
        assert!(msg.contains("position 7"));

        let err = LdaError::DocumentCountMismatch {
            declared: 5,
            actual: 4,
        };
        assert!(err.to_string().contains("declares 5"));

        let err = LdaError::InvalidHyperparameter {
            name: "alpha",
            value: -1.0,
        };
        assert!(err.to_string().contains("alpha"));

        let err = LdaError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_from_bincode_error() {
        let bad_data: &[u8] = &[0xff, 0xff, 0xff];
        let decoded: std::result::Result<String, _> = bincode::deserialize(bad_data);

        if let Err(e) = decoded {
            let err: LdaError = e.into();
            assert!(matches!(err, LdaError::Serialization(_)));
        }
    }
}
