//! Checkpoint snapshots of a training run.
//!
//! A checkpoint is one opaque blob (`checkpoint.bin`, magic `LDAC` followed by
//! a bincode body) inside a directory named after the save time and the
//! hyperparameters:
//!
//! ```text
//! <root>/output/2023_01_31__05_30_01.002209_500_20_0.02_0.1/checkpoint.bin
//! <root>/intermediate_output/2023_01_31__05_30_01.002209_500_20_0.02_0.1_100/checkpoint.bin
//! ```
//!
//! The blob is written to a temporary file, synced and renamed into place, so
//! a crash mid-save never leaves a file that `load` would accept.
//!
//! The store does not check that a checkpoint matches the corpus, vocabulary
//! or hyperparameters of the model it is restored into; `Lda::restore` checks
//! shapes and count consistency.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::distributions::Matrix;
use crate::error::{LdaError, Result};
use crate::state::CountState;

const CHECKPOINT_MAGIC: &[u8; 4] = b"LDAC";
const FORMAT_VERSION: u32 = 1;
const CHECKPOINT_FILE: &str = "checkpoint.bin";
const INTERMEDIATE_DIR: &str = "intermediate_output";
const FINAL_DIR: &str = "output";

/// Hyperparameter tuple recorded with every checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub num_topics: usize,
    pub num_iterations: usize,
    pub alpha: f64,
    pub beta: f64,
}

/// Everything needed to resume or inspect a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub params: Hyperparameters,
    pub iterations_done: usize,
    /// Topic assignments plus the three count aggregates
    pub counts: CountState,
    pub doc_topic_dist: Option<Matrix>,
    pub topic_term_dist: Option<Matrix>,
    /// Vocabulary reverse lookup, index-aligned with term ids
    pub vocabulary: Vec<String>,
}

impl Checkpoint {
    pub fn new(
        params: Hyperparameters,
        iterations_done: usize,
        counts: CountState,
        doc_topic_dist: Option<Matrix>,
        topic_term_dist: Option<Matrix>,
        vocabulary: Vec<String>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            params,
            iterations_done,
            counts,
            doc_topic_dist,
            topic_term_dist,
            vocabulary,
        }
    }

    /// Directory name: timestamp, then `iterations_K_alpha_beta`, then the
    /// iteration for intermediate checkpoints.
    pub fn name(&self, kind: CheckpointKind) -> String {
        let p = &self.params;
        let mut name = format!(
            "{}_{}_{}_{}_{}",
            self.created_at.format("%Y_%m_%d__%H_%M_%S%.6f"),
            p.num_iterations,
            p.num_topics,
            p.alpha,
            p.beta
        );
        if kind == CheckpointKind::Intermediate {
            name.push_str(&format!("_{}", self.iterations_done));
        }
        name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// Saved periodically during training
    Intermediate,
    /// Saved once training is finished
    Final,
}

impl CheckpointKind {
    fn dir_name(self) -> &'static str {
        match self {
            CheckpointKind::Intermediate => INTERMEDIATE_DIR,
            CheckpointKind::Final => FINAL_DIR,
        }
    }
}

/// Location of a saved checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CheckpointHandle(PathBuf);

impl CheckpointHandle {
    /// Accepts either the checkpoint directory or the blob file inside it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self(path.join(CHECKPOINT_FILE))
        } else {
            Self(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for CheckpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Filesystem-backed checkpoint store rooted at one directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, checkpoint: &Checkpoint, kind: CheckpointKind) -> Result<CheckpointHandle> {
        let dir = self
            .root
            .join(kind.dir_name())
            .join(checkpoint.name(kind));
        fs::create_dir_all(&dir).map_err(|e| LdaError::io(&dir, e))?;

        let path = dir.join(CHECKPOINT_FILE);
        let temp = dir.join(format!(".{CHECKPOINT_FILE}.tmp"));

        if let Err(e) = write_blob(&temp, checkpoint) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(LdaError::io(&path, e));
        }
        File::open(&dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| LdaError::io(&dir, e))?;

        log::info!(
            "Checkpoint saved at {} (iteration {})",
            path.display(),
            checkpoint.iterations_done
        );
        Ok(CheckpointHandle(path))
    }

    pub fn load(handle: &CheckpointHandle) -> Result<Checkpoint> {
        let path = handle.path();
        let file = File::open(path).map_err(|e| LdaError::io(path, e))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| LdaError::io(path, e))?;
        if &magic != CHECKPOINT_MAGIC {
            return Err(LdaError::Deserialization(format!(
                "{} is not a checkpoint",
                path.display()
            )));
        }

        let checkpoint: Checkpoint = bincode::deserialize_from(reader)
            .map_err(|e| LdaError::Deserialization(format!("{}: {e}", path.display())))?;
        if checkpoint.format_version != FORMAT_VERSION {
            return Err(LdaError::Deserialization(format!(
                "{}: unsupported format version {}",
                path.display(),
                checkpoint.format_version
            )));
        }

        log::info!(
            "Checkpoint loaded from {} (iteration {})",
            path.display(),
            checkpoint.iterations_done
        );
        Ok(checkpoint)
    }

    /// Every saved checkpoint of one kind, oldest first.
    pub fn list(&self, kind: CheckpointKind) -> Result<Vec<CheckpointHandle>> {
        let dir = self.root.join(kind.dir_name());
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut handles = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| LdaError::io(&dir, e))? {
            let entry = entry.map_err(|e| LdaError::io(&dir, e))?;
            let blob = entry.path().join(CHECKPOINT_FILE);
            if blob.is_file() {
                handles.push(CheckpointHandle(blob));
            }
        }
        // names start with the timestamp
        handles.sort();
        Ok(handles)
    }

    pub fn latest(&self, kind: CheckpointKind) -> Result<Option<CheckpointHandle>> {
        Ok(self.list(kind)?.pop())
    }
}

fn write_blob(temp: &Path, checkpoint: &Checkpoint) -> Result<()> {
    let file = File::create(temp).map_err(|e| LdaError::io(temp, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(CHECKPOINT_MAGIC)
        .map_err(|e| LdaError::io(temp, e))?;
    bincode::serialize_into(&mut writer, checkpoint)?;
    let file = writer
        .into_inner()
        .map_err(|e| LdaError::io(temp, e.into_error()))?;
    file.sync_all().map_err(|e| LdaError::io(temp, e))?;
    Ok(())
}
