// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::index::{read_index, write_index, IndexFormat, IndexProvenance};
use crate::IngestError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub inputs: usize,
    pub rows: usize,
}

/// Concatenates shard indexes row-wise. Inputs are left untouched; the merged
/// index is written fresh.
pub fn merge_shard_indexes(
    inputs: &[PathBuf],
    output: &Path,
    format: IndexFormat,
) -> Result<MergeSummary, IngestError> {
    if inputs.is_empty() {
        return Err(IngestError::NoInputs);
    }
    info!(shards = inputs.len(), output = %output.display(), "merging shard indexes");
    let mut merged = Vec::new();
    for input in inputs {
        let rows = read_index(input)?;
        info!(shard = %input.display(), rows = rows.len(), "shard loaded");
        merged.extend(rows);
    }
    write_index(
        output,
        format,
        &merged,
        IndexProvenance::Merged {
            inputs: inputs.len(),
        },
    )?;
    info!(rows = merged.len(), "merge complete");
    Ok(MergeSummary {
        output: output.to_path_buf(),
        inputs: inputs.len(),
        rows: merged.len(),
    })
}
