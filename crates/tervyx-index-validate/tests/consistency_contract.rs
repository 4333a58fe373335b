// SPDX-License-Identifier: Apache-2.0

use tervyx_index_model::{
    EntryRecord, GateResults, GateVerdict, JGate, Label, PolicyVersions, SimulationSummary, Tier,
};
use tervyx_index_policies::{parse_policy_document, PolicyFormat};
use tervyx_index_validate::{
    validate_records, CheckKind, Severity, ValidationContext, Validator,
};

const POLICY_JSON: &str = r#"{
  "tel5_levels": {"version": "1.2.0"},
  "monte_carlo": {"version": "1.0.1"},
  "journal_trust": {"snapshot_date": "2025-10-05"}
}"#;

fn record(id: &str, tier: Tier, label: Label) -> EntryRecord {
    EntryRecord {
        id: id.to_string(),
        entry_path: format!("fixture/{id}"),
        tier,
        label,
        gate_results: GateResults {
            phi: Some(GateVerdict::Pass),
            r: Some(GateVerdict::Pass),
            j: Some(JGate::Score(0.6)),
            k: Some(GateVerdict::Pass),
            l: Some(GateVerdict::Pass),
        },
        policy_fingerprint: Some("sha256:current".to_string()),
        policy_versions: PolicyVersions {
            tel5_version: Some("1.2.0".to_string()),
            mc_version: Some("1.0.1".to_string()),
            journal_snapshot: Some("2025-10-05".to_string()),
        },
        intervention_type: None,
        simulation: Some(SimulationSummary {
            p_effect_gt_delta: Some(0.75),
            ..SimulationSummary::default()
        }),
        citations: None,
    }
}

fn compliant_index() -> Vec<EntryRecord> {
    vec![
        record("vitamin-d-mood", Tier::Gold, Label::Pass),
        record("magnesium-sleep", Tier::Silver, Label::Pass),
        record("zinc-cold", Tier::Bronze, Label::Amber),
        record("ginkgo-memory", Tier::Red, Label::Amber),
    ]
}

#[test]
fn compliant_index_has_no_defects() {
    let report = validate_records(&compliant_index(), &ValidationContext::default());
    assert_eq!(report.row_count, 4);
    assert_eq!(report.checks_run, CheckKind::ALL.to_vec());
    assert_eq!(report.error_count(), 0, "{:?}", report.findings);
    assert_eq!(report.warning_count(), 0, "{:?}", report.findings);
    assert_eq!(report.null_rates.get("policy_fingerprint"), Some(&0.0));
}

#[test]
fn gold_fail_yields_exactly_one_mismatch() {
    let mut index = compliant_index();
    index.push(record("st-johns-wort", Tier::Gold, Label::Fail));
    let report = validate_records(&index, &ValidationContext::default());
    let mismatches: Vec<_> = report.findings_for(CheckKind::TierLabel).collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].subject, "gold");
    assert_eq!(mismatches[0].count, 1);
    assert_eq!(mismatches[0].severity, Severity::Error);
}

#[test]
fn safety_violations_are_counted_exactly() {
    let mut index = compliant_index();
    index[0].gate_results.phi = Some(GateVerdict::Fail);
    index[1].gate_results.k = Some(GateVerdict::Fail);
    let mut black = record("kava-anxiety", Tier::Black, Label::Fail);
    black.gate_results.phi = Some(GateVerdict::Fail);
    index.push(black);

    let report = validate_records(&index, &ValidationContext::default());
    let violations: Vec<_> = report.findings_for(CheckKind::SafetyMonotonicity).collect();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|f| f.severity == Severity::Error));
    let subjects: Vec<&str> = violations.iter().map(|f| f.subject.as_str()).collect();
    assert_eq!(subjects, vec!["vitamin-d-mood", "magnesium-sleep"]);
}

#[test]
fn safety_check_reads_gates_not_labels() {
    // tier and label agree, so only the gate inspection can catch this one
    let mut index = vec![record("override-bug", Tier::Silver, Label::Pass)];
    index[0].gate_results.k = Some(GateVerdict::Fail);
    let report = validate_records(&index, &ValidationContext::default());
    assert_eq!(report.findings_for(CheckKind::TierLabel).count(), 0);
    assert_eq!(report.findings_for(CheckKind::SafetyMonotonicity).count(), 1);
}

#[test]
fn probability_range_is_enforced() {
    let mut index = compliant_index();
    index[2].simulation = Some(SimulationSummary {
        p_effect_gt_delta: Some(1.5),
        ..SimulationSummary::default()
    });
    index[3].gate_results.j = Some(JGate::Score(-0.1));
    let report = validate_records(&index, &ValidationContext::default());

    let range: Vec<_> = report.findings_for(CheckKind::Range).collect();
    assert_eq!(range.len(), 2);
    let p = report
        .find("range.p_effect_gt_delta", "zinc-cold")
        .expect("1.5 is out of range");
    assert_eq!(p.severity, Severity::Error);
    assert!(report.find("range.p_effect_gt_delta", "vitamin-d-mood").is_none());
    assert!(report.find("range.gate_j", "ginkgo-memory").is_some());
}

#[test]
fn duplicate_ids_report_their_count() {
    let mut index = compliant_index();
    index.push(record("vitamin-d-mood", Tier::Gold, Label::Pass));
    let report = validate_records(&index, &ValidationContext::default());
    let dup = report
        .find("duplicates.id", "vitamin-d-mood")
        .expect("duplicate reported");
    assert_eq!(dup.count, 2);
    assert_eq!(report.findings_for(CheckKind::Duplicates).count(), 1);
}

#[test]
fn null_rate_above_threshold_is_flagged_not_failed() {
    let mut index = compliant_index();
    index[0].simulation = None;
    let report = validate_records(&index, &ValidationContext::default());
    let finding = report
        .find("required_fields.null_rate", "P_effect_gt_delta")
        .expect("25% nulls exceeds 10%");
    assert_eq!(finding.severity, Severity::Warning);
    assert_eq!(finding.count, 1);
    assert_eq!(report.null_rates.get("P_effect_gt_delta"), Some(&0.25));
    assert_eq!(report.error_count(), 0);
}

#[test]
fn mixed_fingerprints_warn_by_default_and_fail_when_strict() {
    let mut index = compliant_index();
    index[3].policy_fingerprint = Some("sha256:previous".to_string());

    let lenient = validate_records(&index, &ValidationContext::default());
    let mixed = lenient
        .find("policy.mixed_fingerprints", "index")
        .expect("mixed build reported");
    assert_eq!(mixed.severity, Severity::Warning);
    assert_eq!(mixed.count, 2);
    assert_eq!(lenient.anchors.fingerprints.get("sha256:current"), Some(&3));

    let strict = validate_records(
        &index,
        &ValidationContext::default().with_strict_policy(true),
    );
    assert!(strict.has_errors());
}

#[test]
fn fingerprint_mismatch_reports_observed_and_expected() {
    let policy = parse_policy_document(POLICY_JSON, PolicyFormat::Json).expect("policy");
    let expected = policy.fingerprint().expect("fingerprint").to_string();
    let mut index = compliant_index();
    for r in &mut index[..2] {
        r.policy_fingerprint = Some(expected.clone());
    }
    index[3].policy_fingerprint = None;

    let ctx = ValidationContext::from_policy(&policy).expect("context");
    let report = Validator::new(ctx).run(&index);

    let mismatch = report
        .find("policy.fingerprint_mismatch", "sha256:current")
        .expect("stale fingerprint reported");
    assert_eq!(mismatch.count, 1);
    assert!(mismatch.message.contains("sha256:current"));
    assert!(mismatch.message.contains(&expected));
    let missing = report
        .find("policy.fingerprint_missing", "index")
        .expect("missing bucket reported");
    assert_eq!(missing.count, 1);
    assert_eq!(report.anchors.expected_fingerprint.as_deref(), Some(expected.as_str()));
}

#[test]
fn version_drift_against_policy_anchors_is_a_warning() {
    let policy = parse_policy_document(POLICY_JSON, PolicyFormat::Json).expect("policy");
    let mut index = compliant_index();
    index[1].policy_versions.mc_version = Some("0.9.0".to_string());
    let ctx = ValidationContext {
        verifier: None,
        ..ValidationContext::from_policy(&policy).expect("context")
    };
    let report = validate_records(&index, &ctx);
    let drift = report
        .find("policy.version_mismatch", "mc_version=0.9.0")
        .expect("version drift reported");
    assert_eq!(drift.severity, Severity::Warning);
    assert_eq!(drift.count, 1);
    assert_eq!(
        report.anchors.versions["mc_version"].get("1.0.1"),
        Some(&3)
    );
}

#[test]
fn checks_keep_running_after_defects() {
    let mut index = compliant_index();
    index.push(record("vitamin-d-mood", Tier::Gold, Label::Fail));
    index[2].simulation = Some(SimulationSummary {
        p_effect_gt_delta: Some(2.0),
        ..SimulationSummary::default()
    });
    let report = validate_records(&index, &ValidationContext::default());
    assert_eq!(report.findings_for(CheckKind::TierLabel).count(), 1);
    assert_eq!(report.findings_for(CheckKind::Duplicates).count(), 1);
    assert_eq!(report.findings_for(CheckKind::Range).count(), 1);
}

#[test]
fn report_serializes_with_snake_case_tags() {
    let mut index = compliant_index();
    index.push(record("vitamin-d-mood", Tier::Gold, Label::Pass));
    let report = validate_records(&index, &ValidationContext::default());
    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["findings"][0]["check"], "duplicates");
    assert_eq!(json["findings"][0]["severity"], "error");
    assert_eq!(json["row_count"], 5);
}
