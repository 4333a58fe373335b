// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tervyx_index_model::{EntryRecord, Label, Tier};
use tracing::{info, warn};

use crate::artifact::ArtifactParser;
use crate::shard::ShardSpec;
use crate::IngestError;

pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Minimal health summary emitted once a shard finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub shard: ShardSpec,
    pub assigned: usize,
    pub rows: usize,
    pub skipped: BTreeMap<String, u64>,
    pub tier_counts: BTreeMap<Tier, u64>,
    pub label_counts: BTreeMap<Label, u64>,
    pub distinct_fingerprints: usize,
}

impl BuildSummary {
    #[must_use]
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub records: Vec<EntryRecord>,
    pub summary: BuildSummary,
}

/// Append-only accumulator for one shard. Directories are parsed in order;
/// a failing directory is logged and dropped.
#[derive(Debug)]
pub struct IndexBuilder {
    parser: ArtifactParser,
    shard: ShardSpec,
    assigned: usize,
    progress_interval: usize,
    processed: usize,
    records: Vec<EntryRecord>,
    skipped: BTreeMap<String, u64>,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, shard: ShardSpec, assigned: usize) -> Self {
        Self {
            parser: ArtifactParser::new(root),
            shard,
            assigned,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            processed: 0,
            records: Vec::with_capacity(assigned),
            skipped: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn ingest_dir(&mut self, dir: &Path) {
        match self.parser.parse_dir(dir) {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                warn!(
                    entry_dir = %dir.display(),
                    reason = reason.code(),
                    detail = %reason,
                    "skipping entry"
                );
                *self.skipped.entry(reason.code().to_string()).or_default() += 1;
            }
        }
        self.processed += 1;
        if self.processed % self.progress_interval == 0 {
            info!(processed = self.processed, total = self.assigned, "ingest progress");
        }
    }

    pub fn ingest_all<'a>(&mut self, dirs: impl IntoIterator<Item = &'a PathBuf>) {
        for dir in dirs {
            self.ingest_dir(dir);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Closes the accumulator. A shard with no valid records is an error:
    /// it almost always means the entries checkout is missing or empty.
    pub fn finish(self) -> Result<BuiltIndex, IngestError> {
        info!(
            processed = self.processed,
            total = self.assigned,
            "ingest progress complete"
        );
        if self.records.is_empty() {
            return Err(IngestError::NoValidRecords {
                shard_index: self.shard.index(),
                shard_count: self.shard.count(),
            });
        }
        let summary = summarize(&self.records, self.shard, self.assigned, self.skipped);
        info!(
            rows = summary.rows,
            skipped = summary.skipped_total(),
            tiers = ?summary.tier_counts,
            labels = ?summary.label_counts,
            distinct_fingerprints = summary.distinct_fingerprints,
            "ingestion summary"
        );
        Ok(BuiltIndex {
            records: self.records,
            summary,
        })
    }
}

fn summarize(
    records: &[EntryRecord],
    shard: ShardSpec,
    assigned: usize,
    skipped: BTreeMap<String, u64>,
) -> BuildSummary {
    let mut tier_counts = BTreeMap::new();
    let mut label_counts = BTreeMap::new();
    let mut fingerprints = BTreeSet::new();
    for record in records {
        *tier_counts.entry(record.tier).or_default() += 1;
        *label_counts.entry(record.label).or_default() += 1;
        if let Some(fp) = &record.policy_fingerprint {
            fingerprints.insert(fp.as_str());
        }
    }
    BuildSummary {
        shard,
        assigned,
        rows: records.len(),
        skipped,
        tier_counts,
        label_counts,
        distinct_fingerprints: fingerprints.len(),
    }
}
