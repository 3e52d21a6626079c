use chrono::NaiveDate;

use crate::db::models::{
    Bankroll, BankrollHistorySnapshot, BetCandidate, NewRecommendation, WagerRecommendation,
};
use crate::db::StoreError;
use risk::RiskProfile;

pub mod odds;
pub mod parlay;
pub mod projector;
pub mod risk;

/// Persistence collaborator for bankrolls and their projected schedules.
pub trait BankrollStore {
    fn get_bankroll(&self, user_id: i64) -> Result<Option<Bankroll>, StoreError>;

    fn create_or_update_bankroll(
        &self,
        user_id: i64,
        amount: f64,
        target: f64,
        risk: RiskProfile,
    ) -> Result<Bankroll, StoreError>;

    fn append_history_snapshot(
        &self,
        bankroll_id: i64,
        amount: f64,
        date: NaiveDate,
    ) -> Result<(), StoreError>;

    /// Snapshot an existing bankroll's amount (dated `date`) and overwrite its
    /// settings, or create the bankroll when the user has none. Snapshot and
    /// overwrite commit together or not at all.
    fn snapshot_and_update_bankroll(
        &self,
        user_id: i64,
        amount: f64,
        target: f64,
        risk: RiskProfile,
        date: NaiveDate,
    ) -> Result<Bankroll, StoreError>;

    /// Delete every recommendation dated on or after `from` and insert `rows`,
    /// as one atomic unit. Either the old schedule or the new one is visible
    /// afterwards, never a mix.
    fn replace_future_recommendations(
        &self,
        bankroll_id: i64,
        from: NaiveDate,
        rows: &[NewRecommendation],
    ) -> Result<(), StoreError>;

    fn list_history(&self, bankroll_id: i64) -> Result<Vec<BankrollHistorySnapshot>, StoreError>;

    fn list_recommendations(
        &self,
        bankroll_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<WagerRecommendation>, StoreError>;
}

/// Upstream feed of candidate bets. Order is meaningful and preserved.
pub trait BetSource {
    /// A user's pending candidates, most desirable first.
    fn candidates(&self, user_id: i64) -> Result<Vec<BetCandidate>, StoreError>;

    /// Every pending candidate in the feed, regardless of owner.
    fn pending_candidates(&self) -> Result<Vec<BetCandidate>, StoreError>;
}

/// Round half away from zero to cents.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
