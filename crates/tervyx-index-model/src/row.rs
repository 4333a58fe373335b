// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::gate::{GateResults, GateVerdict, JGate};
use crate::record::{CitationSummary, EntryRecord, PolicyVersions, SimulationSummary};
use crate::tier::{Label, Tier};

pub const INDEX_SCHEMA_VERSION: u64 = 1;

/// Column set shared by every shard output, in on-disk order.
pub const INDEX_COLUMNS: &[&str] = &[
    "id",
    "entry_path",
    "tier",
    "label",
    "gate_phi",
    "gate_r",
    "gate_j",
    "gate_k",
    "gate_l",
    "policy_fingerprint",
    "tel5_version",
    "mc_version",
    "journal_snapshot",
    "intervention_type",
    "seed",
    "n_draws",
    "P_effect_gt_delta",
    "mu_hat",
    "mu_CI95_lower",
    "mu_CI95_upper",
    "I2",
    "tau2",
    "n_studies",
    "dois",
    "years",
];

/// Flat persisted form of [`EntryRecord`]. Absent values serialize as `null`
/// so every row carries the full column set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexRow {
    pub id: String,
    pub entry_path: String,
    pub tier: Tier,
    pub label: Label,
    pub gate_phi: Option<GateVerdict>,
    pub gate_r: Option<GateVerdict>,
    pub gate_j: Option<JGate>,
    pub gate_k: Option<GateVerdict>,
    pub gate_l: Option<GateVerdict>,
    pub policy_fingerprint: Option<String>,
    pub tel5_version: Option<String>,
    pub mc_version: Option<String>,
    pub journal_snapshot: Option<String>,
    pub intervention_type: Option<String>,
    pub seed: Option<i64>,
    pub n_draws: Option<u64>,
    #[serde(rename = "P_effect_gt_delta")]
    pub p_effect_gt_delta: Option<f64>,
    pub mu_hat: Option<f64>,
    #[serde(rename = "mu_CI95_lower")]
    pub mu_ci95_lower: Option<f64>,
    #[serde(rename = "mu_CI95_upper")]
    pub mu_ci95_upper: Option<f64>,
    #[serde(rename = "I2")]
    pub i2: Option<f64>,
    pub tau2: Option<f64>,
    pub n_studies: Option<u64>,
    pub dois: Option<Vec<String>>,
    pub years: Option<Vec<i64>>,
}

impl From<&EntryRecord> for IndexRow {
    fn from(record: &EntryRecord) -> Self {
        let sim = record.simulation.clone().unwrap_or_default();
        let (n_studies, dois, years) = match &record.citations {
            Some(c) => (Some(c.n_studies), Some(c.dois.clone()), Some(c.years.clone())),
            None => (None, None, None),
        };
        Self {
            id: record.id.clone(),
            entry_path: record.entry_path.clone(),
            tier: record.tier,
            label: record.label,
            gate_phi: record.gate_results.phi,
            gate_r: record.gate_results.r,
            gate_j: record.gate_results.j,
            gate_k: record.gate_results.k,
            gate_l: record.gate_results.l,
            policy_fingerprint: record.policy_fingerprint.clone(),
            tel5_version: record.policy_versions.tel5_version.clone(),
            mc_version: record.policy_versions.mc_version.clone(),
            journal_snapshot: record.policy_versions.journal_snapshot.clone(),
            intervention_type: record.intervention_type.clone(),
            seed: sim.seed,
            n_draws: sim.n_draws,
            p_effect_gt_delta: sim.p_effect_gt_delta,
            mu_hat: sim.mu_hat,
            mu_ci95_lower: sim.mu_ci95_lower,
            mu_ci95_upper: sim.mu_ci95_upper,
            i2: sim.i2,
            tau2: sim.tau2,
            n_studies,
            dois,
            years,
        }
    }
}

impl From<IndexRow> for EntryRecord {
    fn from(row: IndexRow) -> Self {
        let simulation = SimulationSummary {
            seed: row.seed,
            n_draws: row.n_draws,
            p_effect_gt_delta: row.p_effect_gt_delta,
            mu_hat: row.mu_hat,
            mu_ci95_lower: row.mu_ci95_lower,
            mu_ci95_upper: row.mu_ci95_upper,
            i2: row.i2,
            tau2: row.tau2,
        };
        let simulation = (simulation != SimulationSummary::default()).then_some(simulation);
        let citations = row.n_studies.map(|n_studies| CitationSummary {
            n_studies,
            dois: row.dois.unwrap_or_default(),
            years: row.years.unwrap_or_default(),
        });
        Self {
            id: row.id,
            entry_path: row.entry_path,
            tier: row.tier,
            label: row.label,
            gate_results: GateResults {
                phi: row.gate_phi,
                r: row.gate_r,
                j: row.gate_j,
                k: row.gate_k,
                l: row.gate_l,
            },
            policy_fingerprint: row.policy_fingerprint,
            policy_versions: PolicyVersions {
                tel5_version: row.tel5_version,
                mc_version: row.mc_version,
                journal_snapshot: row.journal_snapshot,
            },
            intervention_type: row.intervention_type,
            simulation,
            citations,
        }
    }
}
