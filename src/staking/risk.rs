use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StakingError;

/// User's tolerance for variance, expressed as a fractional-Kelly tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    /// Quarter Kelly
    Low,
    /// Half Kelly
    Medium,
    /// Full Kelly
    High,
}

impl RiskProfile {
    /// Multiplier applied to the full Kelly fraction.
    pub fn factor(self) -> f64 {
        match self {
            RiskProfile::Low => 0.25,
            RiskProfile::Medium => 0.5,
            RiskProfile::High => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskProfile::Low => "low",
            RiskProfile::Medium => "medium",
            RiskProfile::High => "high",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskProfile::Low),
            "medium" => Ok(RiskProfile::Medium),
            "high" => Ok(RiskProfile::High),
            other => Err(StakingError::InvalidRiskProfile(other.to_string())),
        }
    }
}

/// Look up the Kelly multiplier for a risk label.
///
/// Unknown labels are an error, never a silent default.
pub fn get_factor(label: &str) -> Result<f64, StakingError> {
    label.parse::<RiskProfile>().map(RiskProfile::factor)
}
