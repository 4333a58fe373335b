// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::gate::GateResults;
use crate::tier::{Label, Tier};

/// Namespace prefix stripped from `@id` to obtain the entry id.
pub const ENTRY_ID_PREFIX: &str = "tervyx:entry:";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyVersions {
    pub tel5_version: Option<String>,
    pub mc_version: Option<String>,
    pub journal_snapshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed: Option<i64>,
    pub n_draws: Option<u64>,
    pub p_effect_gt_delta: Option<f64>,
    pub mu_hat: Option<f64>,
    pub mu_ci95_lower: Option<f64>,
    pub mu_ci95_upper: Option<f64>,
    pub i2: Option<f64>,
    pub tau2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CitationSummary {
    pub n_studies: u64,
    pub dois: Vec<String>,
    pub years: Vec<i64>,
}

/// One evaluated claim. Built once at ingestion and never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: String,
    pub entry_path: String,
    pub tier: Tier,
    pub label: Label,
    pub gate_results: GateResults,
    pub policy_fingerprint: Option<String>,
    pub policy_versions: PolicyVersions,
    pub intervention_type: Option<String>,
    pub simulation: Option<SimulationSummary>,
    pub citations: Option<CitationSummary>,
}

impl EntryRecord {
    #[must_use]
    pub fn p_effect_gt_delta(&self) -> Option<f64> {
        self.simulation.as_ref().and_then(|s| s.p_effect_gt_delta)
    }
}
