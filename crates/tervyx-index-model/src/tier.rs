// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::ValidationError;

/// Ordinal quality grade. Declaration order is worst to best so the derived
/// `Ord` gives `Black < Red < Bronze < Silver < Gold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Black,
    Red,
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Gold,
        Tier::Silver,
        Tier::Bronze,
        Tier::Red,
        Tier::Black,
    ];

    /// Parses a tier name, ignoring case and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_lowercase().as_str() {
            "gold" => Ok(Self::Gold),
            "silver" => Ok(Self::Silver),
            "bronze" => Ok(Self::Bronze),
            "red" => Ok(Self::Red),
            "black" => Ok(Self::Black),
            other => Err(ValidationError(format!("unknown tier `{other}`"))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Bronze => "bronze",
            Self::Red => "red",
            Self::Black => "black",
        }
    }

    /// The only label a record of this tier may carry.
    #[must_use]
    pub const fn expected_label(self) -> Label {
        match self {
            Self::Gold | Self::Silver => Label::Pass,
            Self::Bronze | Self::Red => Label::Amber,
            Self::Black => Label::Fail,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Pass,
    Amber,
    Fail,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Pass, Label::Amber, Label::Fail];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "AMBER" => Ok(Self::Amber),
            "FAIL" => Ok(Self::Fail),
            other => Err(ValidationError(format!("unknown label `{other}`"))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Amber => "AMBER",
            Self::Fail => "FAIL",
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
