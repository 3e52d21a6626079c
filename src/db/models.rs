use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::staking::risk::RiskProfile;

/// A user's staking bankroll. One per user; updated in place, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bankroll {
    pub id: i64,
    pub user_id: i64,
    /// Current bankroll in currency units (> 0)
    pub current_amount: f64,
    /// Profit the user is aiming for (> 0)
    pub target_profit: f64,
    pub risk_profile: RiskProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Amount a bankroll held just before it was overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollHistorySnapshot {
    pub id: i64,
    pub bankroll_id: i64,
    pub amount: f64,
    pub date: NaiveDate,
}

/// One persisted day of a projected wager schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerRecommendation {
    pub id: i64,
    pub bankroll_id: i64,
    pub date: NaiveDate,
    pub recommended_wager: f64,
    /// Signed; losing days are negative
    pub expected_profit: f64,
    pub bet_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A schedule row awaiting insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub date: NaiveDate,
    pub recommended_wager: f64,
    pub expected_profit: f64,
    pub bet_id: Option<i64>,
}

/// A bet the user could place, as supplied by the upstream bet feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetCandidate {
    pub id: i64,
    /// Decimal odds (> 1.0 when well formed)
    pub decimal_odds: f64,
    /// Estimated probability of winning, in (0, 1) when well formed
    pub win_probability: f64,
    #[serde(default)]
    pub selection: Option<String>,
}

impl BetCandidate {
    pub fn is_well_formed(&self) -> bool {
        self.decimal_odds > 1.0
            && self.decimal_odds.is_finite()
            && self.win_probability > 0.0
            && self.win_probability < 1.0
    }
}

/// Input for registering a new bet candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCandidate {
    pub user_id: i64,
    pub decimal_odds: f64,
    pub win_probability: f64,
    #[serde(default)]
    pub selection: Option<String>,
}

/// Settlement state of a bet candidate: "pending" | "won" | "lost"
pub const CANDIDATE_PENDING: &str = "pending";

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(odds: f64, p: f64) -> BetCandidate {
        BetCandidate {
            id: 1,
            decimal_odds: odds,
            win_probability: p,
            selection: None,
        }
    }

    #[test]
    fn test_well_formed_candidate() {
        assert!(candidate(1.9, 0.55).is_well_formed());
    }

    #[test]
    fn test_malformed_candidates() {
        assert!(!candidate(1.0, 0.55).is_well_formed());
        assert!(!candidate(2.0, 0.0).is_well_formed());
        assert!(!candidate(2.0, 1.0).is_well_formed());
        assert!(!candidate(f64::INFINITY, 0.5).is_well_formed());
    }
}
