// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    RequiredFields,
    TierLabel,
    SafetyMonotonicity,
    Duplicates,
    Range,
    PolicyAnchors,
}

impl CheckKind {
    pub const ALL: [Self; 6] = [
        Self::RequiredFields,
        Self::TierLabel,
        Self::SafetyMonotonicity,
        Self::Duplicates,
        Self::Range,
        Self::PolicyAnchors,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequiredFields => "required_fields",
            Self::TierLabel => "tier_label",
            Self::SafetyMonotonicity => "safety_monotonicity",
            Self::Duplicates => "duplicates",
            Self::Range => "range",
            Self::PolicyAnchors => "policy_anchors",
        }
    }
}

/// One reported defect or observation. `subject` names what the finding is
/// about (a field, a tier, an entry id, a fingerprint).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub id: &'static str,
    pub check: CheckKind,
    pub severity: Severity,
    pub subject: String,
    pub count: u64,
    pub message: String,
}

/// Distributions gathered by the policy anchor check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnchorSummary {
    pub expected_fingerprint: Option<String>,
    pub fingerprints: BTreeMap<String, u64>,
    pub missing_fingerprints: u64,
    pub versions: BTreeMap<&'static str, BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    pub row_count: usize,
    pub checks_run: Vec<CheckKind>,
    pub null_rates: BTreeMap<&'static str, f64>,
    pub anchors: AnchorSummary,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    #[must_use]
    pub fn count_at(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count_at(Severity::Error)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count_at(Severity::Warning)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn findings_for(&self, check: CheckKind) -> impl Iterator<Item = &Finding> + '_ {
        self.findings.iter().filter(move |f| f.check == check)
    }

    #[must_use]
    pub fn find(&self, id: &str, subject: &str) -> Option<&Finding> {
        self.findings
            .iter()
            .find(|f| f.id == id && f.subject == subject)
    }
}
