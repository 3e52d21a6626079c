use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::odds::{expected_value, kelly_fraction};
use super::{round2, BankrollStore, BetSource};
use crate::db::models::BetCandidate;
use crate::error::StakingError;

pub const DEFAULT_MAX_LEGS: usize = 3;
pub const DEFAULT_MIN_LEG_EV: f64 = 0.05;
/// Largest parlay stake as a fraction of the bankroll.
pub const DEFAULT_STAKE_CAP: f64 = 0.05;
/// How many of the highest-EV legs are considered.
pub const DEFAULT_POOL_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParlayOptions {
    pub max_legs: usize,
    pub min_leg_ev: f64,
    pub stake_cap: f64,
    pub pool_size: usize,
}

impl Default for ParlayOptions {
    fn default() -> Self {
        Self {
            max_legs: DEFAULT_MAX_LEGS,
            min_leg_ev: DEFAULT_MIN_LEG_EV,
            stake_cap: DEFAULT_STAKE_CAP,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayLeg {
    #[serde(flatten)]
    pub candidate: BetCandidate,
    pub expected_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayDescriptor {
    pub legs: Vec<ParlayLeg>,
    /// Product of the legs' decimal odds
    pub combined_odds: f64,
    /// Product of the legs' win probabilities (legs assumed independent)
    pub win_probability: f64,
    pub expected_value: f64,
    pub recommended_wager: f64,
}

/// Well-formed candidates with `EV >= min_leg_ev`, best EV first, at most
/// `pool_size` of them. Ties keep feed order.
pub fn rank_legs(pool: &[BetCandidate], min_leg_ev: f64, pool_size: usize) -> Vec<ParlayLeg> {
    let mut legs: Vec<ParlayLeg> = pool
        .iter()
        .filter(|c| c.is_well_formed())
        .map(|c| ParlayLeg {
            candidate: c.clone(),
            expected_value: expected_value(c.win_probability, c.decimal_odds),
        })
        .filter(|leg| leg.expected_value >= min_leg_ev)
        .collect();
    legs.sort_by(|a, b| b.expected_value.total_cmp(&a.expected_value));
    legs.truncate(pool_size);
    legs
}

/// One parlay per leg count `2..=max_legs`, each built from the top-ranked
/// prefix of `ranked`. Tiers without positive EV and a positive stake are
/// dropped.
pub fn build_parlays(
    ranked: &[ParlayLeg],
    bankroll_amount: f64,
    max_legs: usize,
    stake_cap: f64,
) -> Vec<ParlayDescriptor> {
    let top = max_legs.min(ranked.len());
    let mut parlays = Vec::new();

    for leg_count in 2..=top {
        let legs = &ranked[..leg_count];
        let combined_odds: f64 = legs.iter().map(|l| l.candidate.decimal_odds).product();
        let win_probability: f64 = legs.iter().map(|l| l.candidate.win_probability).product();

        let parlay_ev = expected_value(win_probability, combined_odds);
        let kelly = kelly_fraction(win_probability, combined_odds);
        let recommended_wager = round2(kelly * bankroll_amount).min(bankroll_amount * stake_cap);

        debug!(
            leg_count,
            combined_odds,
            win_probability,
            parlay_ev,
            recommended_wager,
            "Evaluated parlay tier"
        );

        if parlay_ev > 0.0 && recommended_wager > 0.0 {
            parlays.push(ParlayDescriptor {
                legs: legs.to_vec(),
                combined_odds,
                win_probability,
                expected_value: parlay_ev,
                recommended_wager,
            });
        }
    }
    parlays
}

/// Recommend multi-leg combinations sized against the user's bankroll.
///
/// Read-only: nothing is persisted. A user without a bankroll gets no
/// recommendations rather than an error.
pub fn compose_parlays<S, B>(
    store: &S,
    source: &B,
    user_id: i64,
    options: ParlayOptions,
) -> Result<Vec<ParlayDescriptor>, StakingError>
where
    S: BankrollStore + ?Sized,
    B: BetSource + ?Sized,
{
    if !options.min_leg_ev.is_finite() {
        return Err(StakingError::validation("min_leg_ev", "must be a finite number"));
    }
    if !(options.stake_cap > 0.0 && options.stake_cap <= 1.0) {
        return Err(StakingError::validation("stake_cap", "must be in (0, 1]"));
    }

    let Some(bankroll) = store.get_bankroll(user_id)? else {
        debug!(user_id, "No bankroll configured; skipping parlays");
        return Ok(Vec::new());
    };

    let feed = source.pending_candidates()?;
    let ranked = rank_legs(&feed, options.min_leg_ev, options.pool_size);
    if ranked.len() < 2 {
        debug!(user_id, eligible = ranked.len(), "Not enough legs for a parlay");
        return Ok(Vec::new());
    }

    let parlays = build_parlays(
        &ranked,
        bankroll.current_amount,
        options.max_legs,
        options.stake_cap,
    );
    info!(
        user_id,
        feed = feed.len(),
        eligible = ranked.len(),
        parlays = parlays.len(),
        "Composed parlay recommendations"
    );
    Ok(parlays)
}
