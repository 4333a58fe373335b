// SPDX-License-Identifier: Apache-2.0

//! On-disk consolidated index. Two row-compatible encodings share the
//! `INDEX_COLUMNS` column set, so shard outputs concatenate without
//! reconciliation.

mod jsonl;
mod sqlite;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tervyx_index_model::{EntryRecord, IndexRow, INDEX_COLUMNS};
use tracing::info;

use crate::{IngestError, ShardSpec};

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFormat {
    Jsonl,
    Sqlite,
}

impl IndexFormat {
    /// `.sqlite` and `.db` select SQLite; everything else is JSON Lines.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("sqlite") || ext.eq_ignore_ascii_case("db") => {
                Self::Sqlite
            }
            _ => Self::Jsonl,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Where an index came from. SQLite indexes record it in `index_meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProvenance {
    Shard(ShardSpec),
    Merged { inputs: usize },
}

impl IndexProvenance {
    pub(crate) fn meta_entries(self) -> Vec<(&'static str, String)> {
        match self {
            Self::Shard(spec) => vec![
                ("shard_index", spec.index().to_string()),
                ("shard_count", spec.count().to_string()),
            ],
            Self::Merged { inputs } => vec![("merged_from", inputs.to_string())],
        }
    }
}

/// Writes the index next to its final path and renames it into place, so an
/// interrupted worker leaves no output rather than a truncated one.
pub fn write_index(
    path: &Path,
    format: IndexFormat,
    rows: &[IndexRow],
    provenance: IndexProvenance,
) -> Result<(), IngestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IngestError::Io(e.to_string()))?;
    }
    let partial = partial_path(path);
    if partial.exists() {
        fs::remove_file(&partial).map_err(|e| IngestError::Io(e.to_string()))?;
    }
    match format {
        IndexFormat::Jsonl => jsonl::write_jsonl(&partial, rows)?,
        IndexFormat::Sqlite => sqlite::write_sqlite(&partial, rows, provenance)?,
    }
    fs::rename(&partial, path).map_err(|e| IngestError::Io(e.to_string()))?;
    info!(
        path = %path.display(),
        format = format.as_str(),
        rows = rows.len(),
        "index written"
    );
    Ok(())
}

/// Reads an index in either encoding; the encoding is detected from the
/// file header, not the extension.
pub fn read_index(path: &Path) -> Result<Vec<IndexRow>, IngestError> {
    match detect_format(path)? {
        IndexFormat::Jsonl => jsonl::read_jsonl(path),
        IndexFormat::Sqlite => sqlite::read_sqlite(path),
    }
}

/// Key/value metadata of a SQLite index. JSON Lines indexes carry none and
/// yield an empty map.
pub fn read_index_meta(path: &Path) -> Result<BTreeMap<String, String>, IngestError> {
    match detect_format(path)? {
        IndexFormat::Jsonl => Ok(BTreeMap::new()),
        IndexFormat::Sqlite => sqlite::read_sqlite_meta(path),
    }
}

pub fn read_records(path: &Path) -> Result<Vec<EntryRecord>, IngestError> {
    Ok(read_index(path)?.into_iter().map(EntryRecord::from).collect())
}

pub fn detect_format(path: &Path) -> Result<IndexFormat, IngestError> {
    let mut file = fs::File::open(path)
        .map_err(|e| IngestError::Io(format!("open index {} failed: {e}", path.display())))?;
    let mut header = [0_u8; 16];
    let mut filled = 0;
    while filled < header.len() {
        let n = file
            .read(&mut header[filled..])
            .map_err(|e| IngestError::Io(e.to_string()))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == header.len() && &header == SQLITE_MAGIC {
        Ok(IndexFormat::Sqlite)
    } else {
        Ok(IndexFormat::Jsonl)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

pub(crate) fn check_columns<'a>(
    path: &Path,
    found: impl IntoIterator<Item = &'a str>,
) -> Result<(), IngestError> {
    let found: BTreeSet<&str> = found.into_iter().collect();
    let expected: BTreeSet<&str> = INDEX_COLUMNS.iter().copied().collect();
    if found == expected {
        return Ok(());
    }
    Err(IngestError::ColumnMismatch {
        path: path.to_path_buf(),
        missing: expected.difference(&found).map(ToString::to_string).collect(),
        unexpected: found.difference(&expected).map(ToString::to_string).collect(),
    })
}
