// SPDX-License-Identifier: Apache-2.0

use tervyx_index_model::PolicyVersions;
use tervyx_index_policies::{FingerprintVerifier, PolicyConfig, PolicyError};

pub const DEFAULT_NULL_RATE_THRESHOLD: f64 = 0.10;

/// Everything the checks need beyond the rows themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationContext {
    pub verifier: Option<FingerprintVerifier>,
    pub anchors: Option<PolicyVersions>,
    pub null_rate_threshold: f64,
    /// Escalates fingerprint mismatches and mixed-policy builds to errors.
    pub strict_policy: bool,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            verifier: None,
            anchors: None,
            null_rate_threshold: DEFAULT_NULL_RATE_THRESHOLD,
            strict_policy: false,
        }
    }
}

impl ValidationContext {
    pub fn from_policy(policy: &PolicyConfig) -> Result<Self, PolicyError> {
        Ok(Self {
            verifier: Some(FingerprintVerifier::from_document(policy.document())?),
            anchors: Some(policy.anchors().clone()),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_strict_policy(mut self, strict: bool) -> Self {
        self.strict_policy = strict;
        self
    }
}
