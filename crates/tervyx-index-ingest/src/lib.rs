// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod artifact;
mod builder;
mod discover;
mod index;
mod logging;
mod merge;
mod shard;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use tervyx_index_model::IndexRow;

pub use artifact::{
    read_citations, read_primary_descriptor, read_simulation, ArtifactParser, PrimaryDescriptor,
    SkipReason, CITATIONS_FILE, DEFAULT_N_DRAWS, ENTRY_FILE, SIMULATION_FILE,
};
pub use builder::{BuildSummary, BuiltIndex, IndexBuilder, DEFAULT_PROGRESS_INTERVAL};
pub use discover::find_entry_dirs;
pub use index::{
    detect_format, read_index, read_index_meta, read_records, write_index, IndexFormat,
    IndexProvenance,
};
pub use logging::{IngestEvent, IngestLog, IngestStage};
pub use merge::{merge_shard_indexes, MergeSummary};
pub use shard::{ShardPartitioner, ShardSpec};

pub const CRATE_NAME: &str = "tervyx-index-ingest";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    MissingRoot(PathBuf),
    NoEntriesFound(PathBuf),
    InvalidShard {
        index: usize,
        count: usize,
    },
    NoValidRecords {
        shard_index: usize,
        shard_count: usize,
    },
    NoInputs,
    ColumnMismatch {
        path: PathBuf,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    Decode {
        path: PathBuf,
        row: usize,
        message: String,
    },
    Encode(String),
    Io(String),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRoot(root) => write!(
                f,
                "root path does not exist: {} (initialize the entries checkout first)",
                root.display()
            ),
            Self::NoEntriesFound(root) => {
                write!(f, "no entries found under {}", root.display())
            }
            Self::InvalidShard { index, count } => write!(
                f,
                "invalid shard parameters: shard_index={index} shard_count={count} (need shard_count >= 1 and shard_index < shard_count)"
            ),
            Self::NoValidRecords {
                shard_index,
                shard_count,
            } => write!(
                f,
                "no valid entries processed for shard {shard_index}/{shard_count}"
            ),
            Self::NoInputs => f.write_str("no shard indexes given to merge"),
            Self::ColumnMismatch {
                path,
                missing,
                unexpected,
            } => write!(
                f,
                "index {} has a foreign column set: missing={missing:?} unexpected={unexpected:?}",
                path.display()
            ),
            Self::Decode { path, row, message } => {
                write!(f, "decode {} row {row} failed: {message}", path.display())
            }
            Self::Encode(message) => write!(f, "encode failed: {message}"),
            Self::Io(message) => write!(f, "io error: {message}"),
        }
    }
}

impl std::error::Error for IngestError {}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub root: PathBuf,
    pub output: PathBuf,
    pub format: IndexFormat,
    pub shard: ShardSpec,
    pub progress_interval: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tervyx/entries"),
            output: PathBuf::from("reports/tables/index.jsonl"),
            format: IndexFormat::Jsonl,
            shard: ShardSpec::single(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestResult {
    pub output: PathBuf,
    pub summary: BuildSummary,
    pub events: Vec<IngestEvent>,
}

/// Runs one shard: discover, partition, parse, persist.
pub fn ingest_entries(opts: &IngestOptions) -> Result<IngestResult, IngestError> {
    let mut log = IngestLog::default();
    log.emit_with(
        IngestStage::Prepare,
        "ingest.start",
        [
            ("root", opts.root.display().to_string()),
            ("shard_index", opts.shard.index().to_string()),
            ("shard_count", opts.shard.count().to_string()),
        ],
    );

    let entry_dirs = find_entry_dirs(&opts.root)?;
    if entry_dirs.is_empty() {
        return Err(IngestError::NoEntriesFound(opts.root.clone()));
    }
    log.emit_with(
        IngestStage::Discover,
        "ingest.discover.complete",
        [("entries", entry_dirs.len().to_string())],
    );

    let partition = ShardPartitioner::new(entry_dirs, opts.shard);
    let mut builder = IndexBuilder::new(&opts.root, opts.shard, partition.assigned().len())
        .with_progress_interval(opts.progress_interval);
    builder.ingest_all(partition.assigned());
    let built = builder.finish()?;
    log.emit_with(
        IngestStage::Parse,
        "ingest.parse.complete",
        [
            ("rows", built.summary.rows.to_string()),
            ("skipped", built.summary.skipped_total().to_string()),
        ],
    );

    let rows: Vec<IndexRow> = built.records.iter().map(IndexRow::from).collect();
    write_index(
        &opts.output,
        opts.format,
        &rows,
        IndexProvenance::Shard(opts.shard),
    )?;
    log.emit_with(
        IngestStage::Persist,
        "ingest.persist.complete",
        [
            ("output", opts.output.display().to_string()),
            ("format", opts.format.as_str().to_string()),
        ],
    );
    log.emit_with(IngestStage::Finalize, "ingest.complete", []);

    Ok(IngestResult {
        output: opts.output.clone(),
        summary: built.summary,
        events: log.into_events(),
    })
}
