// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::PolicyConfig;
use crate::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Yaml,
    Json,
}

impl PolicyFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

pub fn parse_policy_document(raw: &str, format: PolicyFormat) -> Result<PolicyConfig, PolicyError> {
    let document: Value = match format {
        PolicyFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| PolicyError::Parse {
            format,
            message: e.to_string(),
        })?,
        PolicyFormat::Json => serde_json::from_str(raw).map_err(|e| PolicyError::Parse {
            format,
            message: e.to_string(),
        })?,
    };
    PolicyConfig::from_document(document)
}

/// Reads a policy file. Every shard may call this independently; the file is
/// only ever read.
pub fn load_policy_config(path: &Path) -> Result<PolicyConfig, PolicyError> {
    let raw = fs::read_to_string(path).map_err(|e| PolicyError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let format = PolicyFormat::from_path(path);
    debug!(path = %path.display(), format = format.as_str(), "loading policy config");
    parse_policy_document(&raw, format)
}
