// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Row model for the consolidated entry index.

mod gate;
mod record;
mod row;
mod tier;

use std::fmt::{Display, Formatter};

pub use gate::{GateResults, GateVerdict, JGate, J_GATE_BLACK};
pub use record::{CitationSummary, EntryRecord, PolicyVersions, SimulationSummary, ENTRY_ID_PREFIX};
pub use row::{IndexRow, INDEX_COLUMNS, INDEX_SCHEMA_VERSION};
pub use tier::{Label, Tier};

pub const CRATE_NAME: &str = "tervyx-index-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
