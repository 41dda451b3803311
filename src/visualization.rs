use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distributions::Matrix;
use crate::error::{LdaError, Result};

/// The five inputs an external LDA visualizer (pyLDAvis-style) expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationData {
    pub topic_term_dists: Matrix,
    pub doc_topic_dists: Matrix,
    pub doc_lengths: Vec<usize>,
    /// Index-aligned with term ids
    pub vocab: Vec<String>,
    pub term_frequency: Vec<usize>,
}

impl VisualizationData {
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| LdaError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_json(&mut writer)?;
        writer.flush().map_err(|e| LdaError::io(path, e))?;
        log::info!("Visualization data saved at {}", path.display());
        Ok(())
    }
}
