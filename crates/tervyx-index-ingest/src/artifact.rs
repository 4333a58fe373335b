// SPDX-License-Identifier: Apache-2.0

//! Per-entry artifact parsing.
//!
//! An entry directory holds `entry.jsonld` (required), `simulation.json` and
//! `citations.json` (both optional). A bad primary descriptor rejects the
//! whole directory; a bad optional artifact only blanks its own columns.

use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tervyx_index_model::{
    CitationSummary, EntryRecord, GateResults, GateVerdict, JGate, Label, PolicyVersions,
    SimulationSummary, Tier, ENTRY_ID_PREFIX,
};
use tracing::{debug, warn};

pub const ENTRY_FILE: &str = "entry.jsonld";
pub const SIMULATION_FILE: &str = "simulation.json";
pub const CITATIONS_FILE: &str = "citations.json";

/// Draw count assumed when a simulation result omits `n_draws`.
pub const DEFAULT_N_DRAWS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Missing { path: PathBuf },
    Unreadable { path: PathBuf, message: String },
    Malformed { path: PathBuf, message: String },
    MissingField { field: &'static str },
    InvalidField { field: &'static str, message: String },
}

impl SkipReason {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "missing",
            Self::Unreadable { .. } => "unreadable",
            Self::Malformed { .. } => "malformed",
            Self::MissingField { .. } => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "{} not found", path.display()),
            Self::Unreadable { path, message } => {
                write!(f, "{} unreadable: {message}", path.display())
            }
            Self::Malformed { path, message } => {
                write!(f, "{} malformed: {message}", path.display())
            }
            Self::MissingField { field } => write!(f, "required field `{field}` missing"),
            Self::InvalidField { field, message } => write!(f, "field `{field}` invalid: {message}"),
        }
    }
}

/// Fields taken from `entry.jsonld`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryDescriptor {
    pub id: String,
    pub tier: Tier,
    pub label: Label,
    pub gate_results: GateResults,
    pub policy_fingerprint: Option<String>,
    pub policy_versions: PolicyVersions,
    pub intervention_type: Option<String>,
}

#[derive(Deserialize)]
struct RawPrimary {
    #[serde(rename = "@id")]
    id: Option<String>,
    tier: Option<String>,
    label: Option<String>,
    gate_results: Option<RawGates>,
    policy_fingerprint: Option<String>,
    policy_refs: Option<RawPolicyRefs>,
    intervention_type: Option<String>,
}

#[derive(Deserialize)]
struct RawGates {
    phi: Option<Value>,
    r: Option<Value>,
    j: Option<Value>,
    k: Option<Value>,
    l: Option<Value>,
}

#[derive(Deserialize, Default)]
struct RawPolicyRefs {
    tel5_levels: Option<Value>,
    monte_carlo: Option<Value>,
    journal_trust: Option<Value>,
}

#[derive(Deserialize)]
struct RawSimulation {
    seed: Option<i64>,
    n_draws: Option<u64>,
    #[serde(rename = "P_effect_gt_delta")]
    p_effect_gt_delta: Option<f64>,
    mu_hat: Option<f64>,
    #[serde(rename = "mu_CI95")]
    mu_ci95: Option<Value>,
    #[serde(rename = "I2")]
    i2: Option<f64>,
    tau2: Option<f64>,
}

#[derive(Deserialize)]
struct RawCitations {
    #[serde(default)]
    studies: Vec<RawStudy>,
}

#[derive(Deserialize)]
struct RawStudy {
    doi: Option<Value>,
    year: Option<Value>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SkipReason> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SkipReason::Missing {
            path: path.to_path_buf(),
        },
        _ => SkipReason::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    })?;
    serde_json::from_slice(&bytes).map_err(|e| SkipReason::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn read_primary_descriptor(path: &Path) -> Result<PrimaryDescriptor, SkipReason> {
    let raw: RawPrimary = read_json(path)?;

    let id = raw
        .id
        .as_deref()
        .map(|id| id.strip_prefix(ENTRY_ID_PREFIX).unwrap_or(id).trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(SkipReason::MissingField { field: "@id" })?;
    let tier = raw
        .tier
        .ok_or(SkipReason::MissingField { field: "tier" })
        .and_then(|t| {
            Tier::parse(&t).map_err(|e| SkipReason::InvalidField {
                field: "tier",
                message: e.0,
            })
        })?;
    let label = raw
        .label
        .ok_or(SkipReason::MissingField {
            field: "label",
        })
        .and_then(|l| {
            Label::parse(&l).map_err(|e| SkipReason::InvalidField {
                field: "label",
                message: e.0,
            })
        })?;
    let gates = raw.gate_results.ok_or(SkipReason::MissingField {
        field: "gate_results",
    })?;
    let gate_results = GateResults {
        phi: gate_verdict("gate_results.phi", gates.phi)?,
        r: gate_verdict("gate_results.r", gates.r)?,
        j: j_gate(gates.j)?,
        k: gate_verdict("gate_results.k", gates.k)?,
        l: gate_verdict("gate_results.l", gates.l)?,
    };

    let refs = raw.policy_refs.unwrap_or_default();
    let policy_versions = PolicyVersions {
        tel5_version: nested_text(refs.tel5_levels.as_ref(), "version"),
        mc_version: nested_text(refs.monte_carlo.as_ref(), "version"),
        journal_snapshot: nested_text(refs.journal_trust.as_ref(), "snapshot_date"),
    };

    Ok(PrimaryDescriptor {
        id,
        tier,
        label,
        gate_results,
        policy_fingerprint: non_empty(raw.policy_fingerprint),
        policy_versions,
        intervention_type: non_empty(raw.intervention_type),
    })
}

/// `Ok(None)` when the file is absent.
pub fn read_simulation(path: &Path) -> Result<Option<SimulationSummary>, SkipReason> {
    let raw: RawSimulation = match read_json(path) {
        Ok(raw) => raw,
        Err(SkipReason::Missing { .. }) => return Ok(None),
        Err(other) => return Err(other),
    };
    let (mu_ci95_lower, mu_ci95_upper) = match raw.mu_ci95 {
        Some(Value::Array(bounds)) if bounds.len() == 2 => (bounds[0].as_f64(), bounds[1].as_f64()),
        _ => (None, None),
    };
    Ok(Some(SimulationSummary {
        seed: raw.seed,
        n_draws: Some(raw.n_draws.unwrap_or(DEFAULT_N_DRAWS)),
        p_effect_gt_delta: raw.p_effect_gt_delta,
        mu_hat: raw.mu_hat,
        mu_ci95_lower,
        mu_ci95_upper,
        i2: raw.i2,
        tau2: raw.tau2,
    }))
}

/// `Ok(None)` when the file is absent.
pub fn read_citations(path: &Path) -> Result<Option<CitationSummary>, SkipReason> {
    let raw: RawCitations = match read_json(path) {
        Ok(raw) => raw,
        Err(SkipReason::Missing { .. }) => return Ok(None),
        Err(other) => return Err(other),
    };
    let dois = raw
        .studies
        .iter()
        .filter_map(|s| s.doi.as_ref().and_then(Value::as_str))
        .filter(|doi| !doi.is_empty())
        .map(ToString::to_string)
        .collect();
    let years = raw
        .studies
        .iter()
        .filter_map(|s| s.year.as_ref())
        .filter_map(|year| study_year(path, year))
        .collect();
    Ok(Some(CitationSummary {
        n_studies: raw.studies.len() as u64,
        dois,
        years,
    }))
}

/// Integer years and numeric strings (`"2023"`) are kept; zero means unknown.
fn study_year(path: &Path, raw: &Value) -> Option<i64> {
    let year = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Null => return None,
        _ => None,
    };
    match year {
        Some(0) => None,
        Some(year) => Some(year),
        None => {
            debug!(path = %path.display(), year = %raw, "unparseable citation year dropped");
            None
        }
    }
}

/// Parses one entry directory. Pure apart from logging.
#[derive(Debug, Clone)]
pub struct ArtifactParser {
    root: PathBuf,
}

impl ArtifactParser {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn parse_dir(&self, dir: &Path) -> Result<EntryRecord, SkipReason> {
        let primary = read_primary_descriptor(&dir.join(ENTRY_FILE))?;

        let simulation = match read_simulation(&dir.join(SIMULATION_FILE)) {
            Ok(Some(sim)) => Some(sim),
            Ok(None) => {
                warn!(entry_dir = %dir.display(), "missing simulation data");
                None
            }
            Err(reason) => {
                warn!(entry_dir = %dir.display(), reason = %reason, "ignoring simulation data");
                None
            }
        };
        let citations = match read_citations(&dir.join(CITATIONS_FILE)) {
            Ok(Some(cit)) => Some(cit),
            Ok(None) => {
                debug!(entry_dir = %dir.display(), "missing citations data");
                None
            }
            Err(reason) => {
                warn!(entry_dir = %dir.display(), reason = %reason, "ignoring citations data");
                None
            }
        };

        Ok(EntryRecord {
            id: primary.id,
            entry_path: relative_entry_path(&self.root, dir),
            tier: primary.tier,
            label: primary.label,
            gate_results: primary.gate_results,
            policy_fingerprint: primary.policy_fingerprint,
            policy_versions: primary.policy_versions,
            intervention_type: primary.intervention_type,
            simulation,
            citations,
        })
    }
}

fn gate_verdict(field: &'static str, raw: Option<Value>) -> Result<Option<GateVerdict>, SkipReason> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => GateVerdict::parse(&s)
            .map(Some)
            .map_err(|e| SkipReason::InvalidField { field, message: e.0 }),
        Some(other) => Err(SkipReason::InvalidField {
            field,
            message: format!("expected PASS or FAIL, got {other}"),
        }),
    }
}

fn j_gate(raw: Option<Value>) -> Result<Option<JGate>, SkipReason> {
    let field = "gate_results.j";
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(|score| Some(JGate::Score(score))).ok_or(
            SkipReason::InvalidField {
                field,
                message: format!("score {n} is not representable"),
            },
        ),
        Some(Value::String(s)) => JGate::parse_sentinel(&s)
            .map(Some)
            .map_err(|e| SkipReason::InvalidField { field, message: e.0 }),
        Some(other) => Err(SkipReason::InvalidField {
            field,
            message: format!("expected number or BLACK, got {other}"),
        }),
    }
}

fn nested_text(section: Option<&Value>, key: &str) -> Option<String> {
    match section?.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn relative_entry_path(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::{gate_verdict, j_gate, relative_entry_path, study_year, SkipReason};
    use serde_json::json;
    use std::path::Path;
    use tervyx_index_model::{GateVerdict, JGate};

    #[test]
    fn citation_years_accept_integers_and_numeric_strings() {
        let path = Path::new("entries/x/citations.json");
        assert_eq!(study_year(path, &json!(2021)), Some(2021));
        assert_eq!(study_year(path, &json!("2023")), Some(2023));
        assert_eq!(study_year(path, &json!(" 2019 ")), Some(2019));
        assert_eq!(study_year(path, &json!(0)), None);
        assert_eq!(study_year(path, &json!("circa 2020")), None);
        assert_eq!(study_year(path, &json!(2020.5)), None);
        assert_eq!(study_year(path, &json!(null)), None);
    }

    #[test]
    fn gate_verdicts_upper_case_and_blank_to_none() {
        assert_eq!(
            gate_verdict("phi", Some(json!("fail"))).expect("verdict"),
            Some(GateVerdict::Fail)
        );
        assert_eq!(gate_verdict("phi", Some(json!(""))).expect("blank"), None);
        assert_eq!(gate_verdict("phi", None).expect("absent"), None);
        let err = gate_verdict("phi", Some(json!(1))).expect_err("number");
        assert_eq!(err.code(), "invalid_field");
    }

    #[test]
    fn j_gate_keeps_score_and_sentinel() {
        assert_eq!(j_gate(Some(json!(0.5))).expect("score"), Some(JGate::Score(0.5)));
        assert_eq!(j_gate(Some(json!("BLACK"))).expect("black"), Some(JGate::Black));
        assert!(matches!(
            j_gate(Some(json!("GREY"))),
            Err(SkipReason::InvalidField { field: "gate_results.j", .. })
        ));
    }

    #[test]
    fn entry_path_is_slash_joined_relative_path() {
        let root = Path::new("/data/entries");
        let dir = root.join("supplements").join("vitamin-d").join("mood");
        assert_eq!(relative_entry_path(root, &dir), "supplements/vitamin-d/mood");
    }
}
