use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ABO/Rh blood group.
///
/// Variant order is the order the registration form offers them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown blood group: {0:?}")]
pub struct UnknownBloodGroup(pub String);

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
    ];

    /// Canonical label, e.g. `"AB-"`.
    pub fn label(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
        }
    }

    /// Position in `ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Get the next group (wrapping around)
    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Get the previous group (wrapping around)
    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodGroup {
    type Err = UnknownBloodGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.label() == s)
            .ok_or_else(|| UnknownBloodGroup(s.to_string()))
    }
}
