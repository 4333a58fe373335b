// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::ValidationError;

pub const J_GATE_BLACK: &str = "BLACK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateVerdict {
    Pass,
    Fail,
}

impl GateVerdict {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            other => Err(ValidationError(format!("unknown gate verdict `{other}`"))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

/// The `j` gate carries either a score or the `BLACK` sentinel. The score is
/// stored as read; range enforcement belongs to validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JGateRepr", into = "JGateRepr")]
pub enum JGate {
    Score(f64),
    Black,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JGateRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<JGateRepr> for JGate {
    type Error = ValidationError;

    fn try_from(value: JGateRepr) -> Result<Self, Self::Error> {
        match value {
            JGateRepr::Number(score) => Ok(Self::Score(score)),
            JGateRepr::Text(text) => Self::parse_sentinel(&text),
        }
    }
}

impl From<JGate> for JGateRepr {
    fn from(value: JGate) -> Self {
        match value {
            JGate::Score(score) => Self::Number(score),
            JGate::Black => Self::Text(J_GATE_BLACK.to_string()),
        }
    }
}

impl JGate {
    pub fn parse_sentinel(text: &str) -> Result<Self, ValidationError> {
        if text.trim().eq_ignore_ascii_case(J_GATE_BLACK) {
            Ok(Self::Black)
        } else {
            Err(ValidationError(format!(
                "j gate must be a number or {J_GATE_BLACK}, got `{text}`"
            )))
        }
    }

    #[must_use]
    pub const fn score(self) -> Option<f64> {
        match self {
            Self::Score(score) => Some(score),
            Self::Black => None,
        }
    }
}

impl Display for JGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Score(score) => write!(f, "{score}"),
            Self::Black => f.write_str(J_GATE_BLACK),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GateResults {
    pub phi: Option<GateVerdict>,
    pub r: Option<GateVerdict>,
    pub j: Option<JGate>,
    pub k: Option<GateVerdict>,
    pub l: Option<GateVerdict>,
}

impl GateResults {
    /// Names of the hard safety gates (`phi`, `k`) that report FAIL.
    #[must_use]
    pub fn failed_safety_gates(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if self.phi == Some(GateVerdict::Fail) {
            failed.push("phi");
        }
        if self.k == Some(GateVerdict::Fail) {
            failed.push("k");
        }
        failed
    }

    #[must_use]
    pub fn has_safety_failure(&self) -> bool {
        !self.failed_safety_gates().is_empty()
    }
}
