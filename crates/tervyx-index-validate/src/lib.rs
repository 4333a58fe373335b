// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Consistency checks over a consolidated entry index.

mod checks;
mod context;
mod report;

pub use checks::{Validator, REQUIRED_FIELDS};
pub use context::{ValidationContext, DEFAULT_NULL_RATE_THRESHOLD};
pub use report::{AnchorSummary, CheckKind, Finding, Severity, ValidationReport};

pub const CRATE_NAME: &str = "tervyx-index-validate";

/// Convenience wrapper for a one-shot run.
#[must_use]
pub fn validate_records(
    records: &[tervyx_index_model::EntryRecord],
    ctx: &ValidationContext,
) -> ValidationReport {
    Validator::new(ctx.clone()).run(records)
}
