use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::odds::kelly_fraction;
use super::risk::RiskProfile;
use super::{round2, BankrollStore, BetSource};
use crate::db::models::{Bankroll, BetCandidate, NewRecommendation};
use crate::error::StakingError;

pub const DEFAULT_DAYS_PROJECTION: u32 = 30;

/// Used for days past the end of an empty candidate pool.
const FALLBACK_WIN_PROBABILITY: f64 = 0.55;
const FALLBACK_ODDS: f64 = 2.0;

/// One simulated day of a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEntry {
    pub date: NaiveDate,
    pub recommended_wager: f64,
    pub expected_profit: f64,
    pub cumulative_profit: f64,
    pub projected_bankroll: f64,
    pub bet_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub current_bankroll: f64,
    pub target_profit: f64,
    pub risk_profile: RiskProfile,
    pub daily_wagers: Vec<ProjectionEntry>,
    /// Whole days needed at the projected average daily profit;
    /// `None` when that average is not positive.
    pub estimated_days_to_target: Option<u32>,
    /// Cumulative expected profit when the simulation stopped.
    pub cumulative_profit_30_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollView {
    pub bankroll: Bankroll,
    pub recommendations: ProjectionResult,
}

/// Pure simulation output, before anything is persisted.
#[derive(Debug, Clone)]
pub struct Projection {
    pub entries: Vec<ProjectionEntry>,
    pub rows: Vec<NewRecommendation>,
    pub cumulative_profit: f64,
}

/// The bet driving one simulated day.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DayPick {
    win_probability: f64,
    odds: f64,
    bet_id: Option<i64>,
}

/// Arithmetic mean of the pool's probabilities and odds, or the fixed
/// defaults for an empty pool.
fn pool_average(pool: &[BetCandidate]) -> DayPick {
    if pool.is_empty() {
        return DayPick {
            win_probability: FALLBACK_WIN_PROBABILITY,
            odds: FALLBACK_ODDS,
            bet_id: None,
        };
    }
    let n = pool.len() as f64;
    DayPick {
        win_probability: pool.iter().map(|c| c.win_probability).sum::<f64>() / n,
        odds: pool.iter().map(|c| c.decimal_odds).sum::<f64>() / n,
        bet_id: None,
    }
}

/// Simulate up to `days` days of Kelly-sized wagers starting at `today`.
///
/// Day `i` uses `pool[i]` while the pool lasts, then the pool average.
/// Stops early, keeping the day that crossed the line, once cumulative
/// expected profit reaches the bankroll's target.
pub fn simulate(
    bankroll: &Bankroll,
    pool: &[BetCandidate],
    days: u32,
    today: NaiveDate,
) -> Projection {
    let risk_factor = bankroll.risk_profile.factor();
    let fallback = pool_average(pool);

    let mut simulated_bankroll = bankroll.current_amount;
    let mut cumulative_profit = 0.0;
    let mut entries = Vec::new();
    let mut rows = Vec::new();

    for day in 0..days {
        let date = today + Duration::days(i64::from(day));
        let pick = match pool.get(day as usize) {
            Some(c) => DayPick {
                win_probability: c.win_probability,
                odds: c.decimal_odds,
                bet_id: Some(c.id),
            },
            None => fallback,
        };

        let p = pick.win_probability;
        let stake_fraction = kelly_fraction(p, pick.odds) * risk_factor;
        let wager = simulated_bankroll * stake_fraction;
        // A zero wager (no edge or malformed pick) yields exactly zero profit.
        let expected_profit = if wager > 0.0 {
            wager * (pick.odds - 1.0) * p - wager * (1.0 - p)
        } else {
            0.0
        };

        rows.push(NewRecommendation {
            date,
            recommended_wager: round2(wager),
            expected_profit: round2(expected_profit),
            bet_id: pick.bet_id,
        });

        cumulative_profit += expected_profit;
        simulated_bankroll += expected_profit;

        entries.push(ProjectionEntry {
            date,
            recommended_wager: round2(wager),
            expected_profit: round2(expected_profit),
            cumulative_profit: round2(cumulative_profit),
            projected_bankroll: round2(bankroll.current_amount + cumulative_profit),
            bet_id: pick.bet_id,
        });

        debug!(
            bankroll_id = bankroll.id,
            %date,
            p,
            odds = pick.odds,
            wager,
            expected_profit,
            "Projected day"
        );

        if cumulative_profit >= bankroll.target_profit {
            break;
        }
    }

    Projection {
        entries,
        rows,
        cumulative_profit,
    }
}

/// Days needed to hit `target_profit` at the schedule's average daily profit.
pub fn estimate_days_to_target(
    target_profit: f64,
    cumulative_profit: f64,
    days: usize,
) -> Option<u32> {
    if days == 0 {
        return None;
    }
    let daily_avg = cumulative_profit / days as f64;
    if daily_avg.is_nan() || daily_avg <= 0.0 {
        return None;
    }
    // Reachable but beyond u32 saturates rather than reading as unreachable.
    let estimate = (target_profit / daily_avg).floor();
    if estimate.is_nan() {
        return None;
    }
    Some(estimate.clamp(0.0, f64::from(u32::MAX)) as u32)
}

/// Recompute and persist a user's wager schedule.
///
/// Every stored recommendation dated `today` or later is replaced by the new
/// schedule in a single transaction, so repeated calls never leave
/// duplicate days behind.
pub fn compute_recommendations<S, B>(
    store: &S,
    source: &B,
    user_id: i64,
    days_projection: u32,
    today: NaiveDate,
) -> Result<ProjectionResult, StakingError>
where
    S: BankrollStore + ?Sized,
    B: BetSource + ?Sized,
{
    if days_projection == 0 {
        return Err(StakingError::validation(
            "days_projection",
            "must be at least 1",
        ));
    }

    let bankroll = store
        .get_bankroll(user_id)?
        .ok_or(StakingError::NotFound(user_id))?;
    let pool = source.candidates(user_id)?;

    let projection = simulate(&bankroll, &pool, days_projection, today);
    store.replace_future_recommendations(bankroll.id, today, &projection.rows)?;

    let estimated_days_to_target = estimate_days_to_target(
        bankroll.target_profit,
        projection.cumulative_profit,
        projection.entries.len(),
    );

    info!(
        user_id,
        bankroll_id = bankroll.id,
        pool = pool.len(),
        days = projection.entries.len(),
        cumulative_profit = projection.cumulative_profit,
        ?estimated_days_to_target,
        "Recomputed wager schedule"
    );

    Ok(ProjectionResult {
        current_bankroll: bankroll.current_amount,
        target_profit: bankroll.target_profit,
        risk_profile: bankroll.risk_profile,
        daily_wagers: projection.entries,
        estimated_days_to_target,
        cumulative_profit_30_days: round2(projection.cumulative_profit),
    })
}

fn require_positive(field: &'static str, value: f64) -> Result<(), StakingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(StakingError::validation(field, "must be a positive number"));
    }
    Ok(())
}

/// Create or overwrite a user's bankroll settings, then recompute the schedule
/// over `days_projection` days.
///
/// Overwriting an existing bankroll first records its prior amount as a
/// history snapshot dated `today`, in the same store transaction as the
/// overwrite.
#[allow(clippy::too_many_arguments)]
pub fn update_bankroll<S, B>(
    store: &S,
    source: &B,
    user_id: i64,
    current_amount: f64,
    target_profit: f64,
    risk_profile: &str,
    days_projection: u32,
    today: NaiveDate,
) -> Result<BankrollView, StakingError>
where
    S: BankrollStore + ?Sized,
    B: BetSource + ?Sized,
{
    require_positive("current_amount", current_amount)?;
    require_positive("target_profit", target_profit)?;
    let risk: RiskProfile = risk_profile.parse().map_err(|_| {
        StakingError::validation("risk_profile", "must be 'low', 'medium', or 'high'")
    })?;
    if days_projection == 0 {
        return Err(StakingError::validation(
            "days_projection",
            "must be at least 1",
        ));
    }

    let bankroll =
        store.snapshot_and_update_bankroll(user_id, current_amount, target_profit, risk, today)?;
    info!(
        user_id,
        bankroll_id = bankroll.id,
        current_amount,
        target_profit,
        risk = %risk,
        "Bankroll updated"
    );

    let recommendations =
        compute_recommendations(store, source, user_id, days_projection, today)?;
    Ok(BankrollView {
        bankroll,
        recommendations,
    })
}
