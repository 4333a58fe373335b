// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use tervyx_index_core::canonical::stable_json_bytes;
use tervyx_index_model::IndexRow;

use super::check_columns;
use crate::IngestError;

/// One canonical-JSON row per line.
pub(super) fn write_jsonl(path: &Path, rows: &[IndexRow]) -> Result<(), IngestError> {
    let file = fs::File::create(path).map_err(|e| IngestError::Io(e.to_string()))?;
    let mut out = BufWriter::new(file);
    for row in rows {
        let mut line = stable_json_bytes(row).map_err(|e| IngestError::Encode(e.to_string()))?;
        line.push(b'\n');
        out.write_all(&line)
            .map_err(|e| IngestError::Io(e.to_string()))?;
    }
    out.flush().map_err(|e| IngestError::Io(e.to_string()))
}

pub(super) fn read_jsonl(path: &Path) -> Result<Vec<IndexRow>, IngestError> {
    let file = fs::File::open(path).map_err(|e| IngestError::Io(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| IngestError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let decode = |message: String| IngestError::Decode {
            path: path.to_path_buf(),
            row: idx + 1,
            message,
        };
        let value: Value = serde_json::from_str(&line).map_err(|e| decode(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| decode("row is not a JSON object".to_string()))?;
        check_columns(path, object.keys().map(String::as_str))?;
        let row: IndexRow = serde_json::from_value(value).map_err(|e| decode(e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}
