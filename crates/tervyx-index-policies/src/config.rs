// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;
use tervyx_index_model::PolicyVersions;

use crate::fingerprint::{compute_policy_fingerprint, PolicyFingerprint};
use crate::PolicyError;

pub const POLICY_SECTIONS: [&str; 3] = ["tel5_levels", "monte_carlo", "journal_trust"];

/// A loaded policy document.
///
/// The untyped document is kept whole because it is the fingerprint input:
/// fields this crate does not interpret still change the hash.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    document: Value,
    anchors: PolicyVersions,
}

impl PolicyConfig {
    pub fn from_document(document: Value) -> Result<Self, PolicyError> {
        let root = document.as_object().ok_or(PolicyError::NotAMapping)?;
        for section in POLICY_SECTIONS {
            if !root.get(section).is_some_and(Value::is_object) {
                return Err(PolicyError::MissingSection(section));
            }
        }
        let anchors = PolicyVersions {
            tel5_version: anchor_value(&document, "tel5_levels", "version"),
            mc_version: anchor_value(&document, "monte_carlo", "version"),
            journal_snapshot: anchor_value(&document, "journal_trust", "snapshot_date"),
        };
        Ok(Self { document, anchors })
    }

    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Version and snapshot strings every entry built under this policy
    /// should carry.
    #[must_use]
    pub fn anchors(&self) -> &PolicyVersions {
        &self.anchors
    }

    pub fn fingerprint(&self) -> Result<PolicyFingerprint, PolicyError> {
        compute_policy_fingerprint(&self.document)
    }
}

fn anchor_value(document: &Value, section: &str, key: &str) -> Option<String> {
    match document.get(section)?.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
