#[cfg(test)]
mod tests;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

use super::{DistanceMetric, DocumentRecord, VectorIndex};
use crate::{QaError, Result};

/// On-disk layout of the vector index file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Declared vector length; inferred from the first vector when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    pub vectors: Vec<Vec<f32>>,
}

/// Load the vector index and its metadata and pair them into a [`VectorIndex`].
///
/// Any problem here is fatal for the service, so every failure maps to [`QaError::Index`].
#[inline]
pub fn load_index(index_path: &Path, metadata_path: &Path) -> Result<VectorIndex> {
    let index_file: IndexFile = read_json(index_path, "vector index")?;
    let records: Vec<DocumentRecord> = read_json(metadata_path, "metadata")?;

    debug!(
        "Read {} vectors from {} and {} records from {}",
        index_file.vectors.len(),
        index_path.display(),
        records.len(),
        metadata_path.display()
    );

    if let (Some(declared), Some(first)) = (index_file.dimension, index_file.vectors.first()) {
        if declared != first.len() {
            return Err(QaError::Index(format!(
                "{} declares dimension {} but its first vector has {}",
                index_path.display(),
                declared,
                first.len()
            )));
        }
    }

    let index = VectorIndex::from_parts(index_file.metric, index_file.vectors, records)
        .map_err(|e| QaError::Index(format!("{}: {}", index_path.display(), e)))?;

    info!(
        "Loaded index with {} documents ({} dimensions, {:?} metric)",
        index.len(),
        index.dimension(),
        index.metric()
    );
    Ok(index)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<T> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open {} file {}", what, path.display()))
        .map_err(index_error)?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {} file {}", what, path.display()))
        .map_err(index_error)
}

fn index_error(err: anyhow::Error) -> QaError {
    QaError::Index(format!("{:#}", err))
}
