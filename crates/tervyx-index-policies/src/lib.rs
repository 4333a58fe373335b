// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod config;
mod fingerprint;
mod load;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub use config::{PolicyConfig, POLICY_SECTIONS};
pub use fingerprint::{
    compute_policy_fingerprint, FingerprintCheck, FingerprintReport, FingerprintVerifier,
    PolicyFingerprint, FINGERPRINT_ALGORITHM,
};
pub use load::{load_policy_config, parse_policy_document, PolicyFormat};

pub const CRATE_NAME: &str = "tervyx-index-policies";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    Read { path: PathBuf, message: String },
    Parse { format: PolicyFormat, message: String },
    NotAMapping,
    MissingSection(&'static str),
    Canonicalize(String),
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "read policy config {} failed: {message}", path.display())
            }
            Self::Parse { format, message } => {
                write!(f, "parse policy config ({}) failed: {message}", format.as_str())
            }
            Self::NotAMapping => f.write_str("policy config must be a mapping"),
            Self::MissingSection(section) => {
                write!(f, "policy config section `{section}` is missing or not a mapping")
            }
            Self::Canonicalize(message) => {
                write!(f, "policy config canonicalization failed: {message}")
            }
        }
    }
}

impl std::error::Error for PolicyError {}
