// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde_json::Value;
use tervyx_index_core::canonical;
use tervyx_index_model::EntryRecord;
use tracing::warn;

use crate::PolicyError;

pub const FINGERPRINT_ALGORITHM: &str = "sha256";

/// `sha256:<hex>` over the canonical JSON bytes of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyFingerprint(String);

impl PolicyFingerprint {
    #[must_use]
    pub fn from_digest_hex(hex: &str) -> Self {
        Self(format!("{FINGERPRINT_ALGORITHM}:{hex}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PolicyFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn compute_policy_fingerprint(document: &Value) -> Result<PolicyFingerprint, PolicyError> {
    let hex = canonical::stable_json_hash_hex(document)
        .map_err(|e| PolicyError::Canonicalize(e.to_string()))?;
    Ok(PolicyFingerprint::from_digest_hex(&hex))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintCheck {
    Match,
    Missing,
    Mismatch { observed: String, expected: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FingerprintReport {
    pub expected: String,
    pub matched: u64,
    /// Ids of records that carry no fingerprint.
    pub missing: Vec<String>,
    /// Observed fingerprint to the ids that carry it.
    pub mismatched: BTreeMap<String, Vec<String>>,
}

impl FingerprintReport {
    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.mismatched.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

/// Compares stamped fingerprints against the one recomputed from the loaded
/// policy. Comparison is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintVerifier {
    expected: PolicyFingerprint,
}

impl FingerprintVerifier {
    #[must_use]
    pub fn new(expected: PolicyFingerprint) -> Self {
        Self { expected }
    }

    pub fn from_document(document: &Value) -> Result<Self, PolicyError> {
        Ok(Self::new(compute_policy_fingerprint(document)?))
    }

    #[must_use]
    pub fn expected(&self) -> &PolicyFingerprint {
        &self.expected
    }

    #[must_use]
    pub fn verify(&self, observed: Option<&str>) -> FingerprintCheck {
        match observed {
            None => FingerprintCheck::Missing,
            Some(fp) if fp.is_empty() => FingerprintCheck::Missing,
            Some(fp) if fp == self.expected.as_str() => FingerprintCheck::Match,
            Some(fp) => FingerprintCheck::Mismatch {
                observed: fp.to_string(),
                expected: self.expected.to_string(),
            },
        }
    }

    #[must_use]
    pub fn verify_records(&self, records: &[EntryRecord]) -> FingerprintReport {
        let mut report = FingerprintReport {
            expected: self.expected.to_string(),
            ..FingerprintReport::default()
        };
        for record in records {
            match self.verify(record.policy_fingerprint.as_deref()) {
                FingerprintCheck::Match => report.matched += 1,
                FingerprintCheck::Missing => report.missing.push(record.id.clone()),
                FingerprintCheck::Mismatch { observed, .. } => report
                    .mismatched
                    .entry(observed)
                    .or_default()
                    .push(record.id.clone()),
            }
        }
        for (observed, ids) in &report.mismatched {
            warn!(
                observed = %observed,
                expected = %report.expected,
                entries = ids.len(),
                "policy fingerprint mismatch"
            );
        }
        report
    }
}
