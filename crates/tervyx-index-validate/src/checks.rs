// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use tervyx_index_model::{EntryRecord, JGate, Label, PolicyVersions, Tier};
use tracing::{error, info, warn};

use crate::context::ValidationContext;
use crate::report::{CheckKind, Finding, Severity, ValidationReport};

/// Fields whose null rate is tracked, in report order.
pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "tier",
    "label",
    "policy_fingerprint",
    "gate_phi",
    "gate_k",
    "P_effect_gt_delta",
];

const NULL_VERSION: &str = "<null>";

type CheckFn = fn(&[EntryRecord], &ValidationContext, &mut ValidationReport);

#[derive(Clone, Copy)]
struct CheckSpec {
    kind: CheckKind,
    run: CheckFn,
}

const CHECKS: &[CheckSpec] = &[
    CheckSpec {
        kind: CheckKind::RequiredFields,
        run: check_required_fields,
    },
    CheckSpec {
        kind: CheckKind::TierLabel,
        run: check_tier_label,
    },
    CheckSpec {
        kind: CheckKind::SafetyMonotonicity,
        run: check_safety_monotonicity,
    },
    CheckSpec {
        kind: CheckKind::Duplicates,
        run: check_duplicates,
    },
    CheckSpec {
        kind: CheckKind::Range,
        run: check_ranges,
    },
    CheckSpec {
        kind: CheckKind::PolicyAnchors,
        run: check_policy_anchors,
    },
];

/// Runs every consistency check over a loaded index. Checks never stop one
/// another; all findings land in one report.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    ctx: ValidationContext,
}

impl Validator {
    #[must_use]
    pub fn new(ctx: ValidationContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &ValidationContext {
        &self.ctx
    }

    #[must_use]
    pub fn run(&self, records: &[EntryRecord]) -> ValidationReport {
        info!(rows = records.len(), "validating index");
        let mut report = ValidationReport {
            row_count: records.len(),
            ..ValidationReport::default()
        };
        for spec in CHECKS {
            let before = report.findings.len();
            (spec.run)(records, &self.ctx, &mut report);
            report.checks_run.push(spec.kind);
            info!(
                check = spec.kind.as_str(),
                findings = report.findings.len() - before,
                "check complete"
            );
        }
        info!(
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validation complete"
        );
        report
    }
}

fn field_is_null(record: &EntryRecord, field: &str) -> bool {
    match field {
        "id" => record.id.trim().is_empty(),
        "policy_fingerprint" => record
            .policy_fingerprint
            .as_deref()
            .map_or(true, |fp| fp.is_empty()),
        "gate_phi" => record.gate_results.phi.is_none(),
        "gate_k" => record.gate_results.k.is_none(),
        "P_effect_gt_delta" => record.p_effect_gt_delta().is_none(),
        // tier and label are typed at ingestion and cannot be absent
        _ => false,
    }
}

fn check_required_fields(
    records: &[EntryRecord],
    ctx: &ValidationContext,
    report: &mut ValidationReport,
) {
    for &field in REQUIRED_FIELDS {
        let nulls = records.iter().filter(|r| field_is_null(r, field)).count();
        let rate = if records.is_empty() {
            0.0
        } else {
            nulls as f64 / records.len() as f64
        };
        report.null_rates.insert(field, rate);
        if rate > ctx.null_rate_threshold {
            warn!(field, null_rate = rate, nulls, "null rate above threshold");
            report.findings.push(Finding {
                id: "required_fields.null_rate",
                check: CheckKind::RequiredFields,
                severity: Severity::Warning,
                subject: field.to_string(),
                count: nulls as u64,
                message: format!(
                    "{field} null rate {:.1}% exceeds {:.1}%",
                    rate * 100.0,
                    ctx.null_rate_threshold * 100.0
                ),
            });
        }
    }
}

fn check_tier_label(records: &[EntryRecord], _ctx: &ValidationContext, report: &mut ValidationReport) {
    let mut mismatched: BTreeMap<Tier, BTreeMap<Label, u64>> = BTreeMap::new();
    for record in records {
        if record.label != record.tier.expected_label() {
            *mismatched
                .entry(record.tier)
                .or_default()
                .entry(record.label)
                .or_default() += 1;
        }
    }
    for (tier, labels) in mismatched.iter().rev() {
        let count: u64 = labels.values().sum();
        let observed = labels
            .iter()
            .map(|(label, n)| format!("{}x{n}", label.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        error!(
            tier = tier.as_str(),
            expected = tier.expected_label().as_str(),
            observed = %observed,
            count,
            "tier/label mismatch"
        );
        report.findings.push(Finding {
            id: "tier_label.mismatch",
            check: CheckKind::TierLabel,
            severity: Severity::Error,
            subject: tier.as_str().to_string(),
            count,
            message: format!(
                "tier {} expects label {}; found {observed}",
                tier.as_str(),
                tier.expected_label().as_str()
            ),
        });
    }
}

fn check_safety_monotonicity(
    records: &[EntryRecord],
    _ctx: &ValidationContext,
    report: &mut ValidationReport,
) {
    for record in records {
        let failed = record.gate_results.failed_safety_gates();
        if failed.is_empty() || record.tier == Tier::Black {
            continue;
        }
        let gates = failed.join(",");
        error!(
            id = %record.id,
            tier = record.tier.as_str(),
            failed_gates = %gates,
            "safety gate failed on non-black entry"
        );
        report.findings.push(Finding {
            id: "safety.non_black_tier",
            check: CheckKind::SafetyMonotonicity,
            severity: Severity::Error,
            subject: record.id.clone(),
            count: 1,
            message: format!(
                "safety gate(s) {gates} failed but tier is {}",
                record.tier.as_str()
            ),
        });
    }
}

fn check_duplicates(records: &[EntryRecord], _ctx: &ValidationContext, report: &mut ValidationReport) {
    let mut by_id: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *by_id.entry(record.id.as_str()).or_default() += 1;
    }
    for (id, count) in by_id.into_iter().filter(|(_, n)| *n > 1) {
        error!(id, count, "duplicate entry id");
        report.findings.push(Finding {
            id: "duplicates.id",
            check: CheckKind::Duplicates,
            severity: Severity::Error,
            subject: id.to_string(),
            count,
            message: format!("id {id} appears {count} times"),
        });
    }
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn check_ranges(records: &[EntryRecord], _ctx: &ValidationContext, report: &mut ValidationReport) {
    for record in records {
        if let Some(p) = record.p_effect_gt_delta().filter(|p| !is_probability(*p)) {
            error!(id = %record.id, value = p, "P_effect_gt_delta outside [0, 1]");
            report.findings.push(Finding {
                id: "range.p_effect_gt_delta",
                check: CheckKind::Range,
                severity: Severity::Error,
                subject: record.id.clone(),
                count: 1,
                message: format!("P_effect_gt_delta {p} outside [0, 1]"),
            });
        }
        if let Some(JGate::Score(j)) = record.gate_results.j {
            if !is_probability(j) {
                error!(id = %record.id, value = j, "gate_j outside [0, 1]");
                report.findings.push(Finding {
                    id: "range.gate_j",
                    check: CheckKind::Range,
                    severity: Severity::Error,
                    subject: record.id.clone(),
                    count: 1,
                    message: format!("gate_j {j} outside [0, 1]"),
                });
            }
        }
    }
}

fn version_fields(versions: &PolicyVersions) -> [(&'static str, Option<&str>); 3] {
    [
        ("tel5_version", versions.tel5_version.as_deref()),
        ("mc_version", versions.mc_version.as_deref()),
        ("journal_snapshot", versions.journal_snapshot.as_deref()),
    ]
}

fn check_policy_anchors(
    records: &[EntryRecord],
    ctx: &ValidationContext,
    report: &mut ValidationReport,
) {
    let policy_severity = if ctx.strict_policy {
        Severity::Error
    } else {
        Severity::Warning
    };

    let anchors = &mut report.anchors;
    for record in records {
        match record.policy_fingerprint.as_deref().filter(|fp| !fp.is_empty()) {
            Some(fp) => *anchors.fingerprints.entry(fp.to_string()).or_default() += 1,
            None => anchors.missing_fingerprints += 1,
        }
        for (field, value) in version_fields(&record.policy_versions) {
            *anchors
                .versions
                .entry(field)
                .or_default()
                .entry(value.unwrap_or(NULL_VERSION).to_string())
                .or_default() += 1;
        }
    }
    info!(
        distinct = anchors.fingerprints.len(),
        missing = anchors.missing_fingerprints,
        distribution = ?anchors.fingerprints,
        "policy fingerprint distribution"
    );
    for (field, counts) in &anchors.versions {
        info!(field, distribution = ?counts, "policy version distribution");
    }

    let mut findings = Vec::new();
    if anchors.fingerprints.len() > 1 {
        warn!(
            distinct = anchors.fingerprints.len(),
            "multiple policy fingerprints in one index"
        );
        findings.push(Finding {
            id: "policy.mixed_fingerprints",
            check: CheckKind::PolicyAnchors,
            severity: policy_severity,
            subject: "index".to_string(),
            count: anchors.fingerprints.len() as u64,
            message: format!(
                "index mixes {} policy fingerprints",
                anchors.fingerprints.len()
            ),
        });
    }

    if let Some(verifier) = &ctx.verifier {
        let verified = verifier.verify_records(records);
        anchors.expected_fingerprint = Some(verified.expected.clone());
        for (observed, ids) in &verified.mismatched {
            findings.push(Finding {
                id: "policy.fingerprint_mismatch",
                check: CheckKind::PolicyAnchors,
                severity: policy_severity,
                subject: observed.clone(),
                count: ids.len() as u64,
                message: format!(
                    "observed {observed} expected {} on {} entries (first: {})",
                    verified.expected,
                    ids.len(),
                    ids.first().map_or("", String::as_str)
                ),
            });
        }
        if !verified.missing.is_empty() {
            warn!(entries = verified.missing.len(), "entries without policy fingerprint");
            findings.push(Finding {
                id: "policy.fingerprint_missing",
                check: CheckKind::PolicyAnchors,
                severity: Severity::Warning,
                subject: "index".to_string(),
                count: verified.missing.len() as u64,
                message: format!(
                    "{} entries carry no policy fingerprint",
                    verified.missing.len()
                ),
            });
        }
    }

    if let Some(expected) = &ctx.anchors {
        info!(
            tel5_version = ?expected.tel5_version,
            mc_version = ?expected.mc_version,
            journal_snapshot = ?expected.journal_snapshot,
            "expected policy anchors"
        );
        for (field, want) in version_fields(expected) {
            let Some(want) = want else { continue };
            let Some(counts) = anchors.versions.get(field) else {
                continue;
            };
            for (observed, count) in counts {
                if observed == want || observed == NULL_VERSION {
                    continue;
                }
                warn!(field, observed = %observed, expected = want, count, "policy version mismatch");
                findings.push(Finding {
                    id: "policy.version_mismatch",
                    check: CheckKind::PolicyAnchors,
                    severity: Severity::Warning,
                    subject: format!("{field}={observed}"),
                    count: *count,
                    message: format!("{field} {observed} differs from policy {want} on {count} entries"),
                });
            }
        }
    }
    report.findings.extend(findings);
}

#[cfg(test)]
mod tests {
    use super::{field_is_null, CHECKS};
    use crate::report::CheckKind;
    use tervyx_index_model::{EntryRecord, GateResults, Label, PolicyVersions, Tier};

    #[test]
    fn every_check_kind_is_registered_once() {
        let kinds: Vec<CheckKind> = CHECKS.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, CheckKind::ALL.to_vec());
    }

    #[test]
    fn blank_fingerprint_counts_as_null() {
        let record = EntryRecord {
            id: "x".to_string(),
            entry_path: "x".to_string(),
            tier: Tier::Gold,
            label: Label::Pass,
            gate_results: GateResults::default(),
            policy_fingerprint: Some(String::new()),
            policy_versions: PolicyVersions::default(),
            intervention_type: None,
            simulation: None,
            citations: None,
        };
        assert!(field_is_null(&record, "policy_fingerprint"));
        assert!(field_is_null(&record, "gate_phi"));
        assert!(field_is_null(&record, "P_effect_gt_delta"));
        assert!(!field_is_null(&record, "id"));
        assert!(!field_is_null(&record, "tier"));
    }
}
