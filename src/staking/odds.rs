/// Odds arithmetic: decimal-odds conversion, expected value and Kelly sizing.
///
/// All functions are pure. Degenerate inputs (probability outside (0, 1),
/// odds at or below 1.0) yield neutral values rather than errors, so a single
/// malformed candidate cannot poison a multi-day projection.
///
/// Kelly formula:
///   f* = (b·p − q) / b
/// where
///   b  = net odds received on the bet (decimal odds − 1)
///   p  = estimated probability of winning
///   q  = 1 − p
use crate::error::StakingError;

/// Net profit per unit staked on a win (`odds − 1`).
pub fn decimal_profit_multiplier(odds: f64) -> Result<f64, StakingError> {
    if !odds.is_finite() || odds <= 1.0 {
        return Err(StakingError::InvalidOdds(odds));
    }
    Ok(odds - 1.0)
}

/// Expected profit per unit stake: `p·(odds − 1) − (1 − p)`.
///
/// Returns `0.0` ("no edge") when `p` is outside the open interval (0, 1).
pub fn expected_value(win_prob: f64, odds: f64) -> f64 {
    if !(win_prob > 0.0 && win_prob < 1.0) {
        return 0.0;
    }
    win_prob * (odds - 1.0) - (1.0 - win_prob)
}

/// Full Kelly stake fraction, clamped to `[0, 1]`.
///
/// Negative edges produce `0.0` (no short stakes); anything above the whole
/// bankroll is capped at `1.0`.
pub fn kelly_fraction(win_prob: f64, odds: f64) -> f64 {
    if !(win_prob > 0.0 && win_prob < 1.0) {
        return 0.0;
    }
    let Ok(b) = decimal_profit_multiplier(odds) else {
        return 0.0;
    };
    let p = win_prob;
    let q = 1.0 - p;

    let f = (b * p - q) / b;
    f.clamp(0.0, 1.0)
}

/// Probability implied by decimal odds (`1 / odds`), ignoring bookmaker margin.
pub fn implied_probability(odds: f64) -> Result<f64, StakingError> {
    decimal_profit_multiplier(odds)?;
    Ok(1.0 / odds)
}

/// Convert an odds string to decimal odds.
///
/// Accepts American odds with an explicit sign (`+150` → 2.5, `-200` → 1.5)
/// or a plain decimal figure (`2.10`).
pub fn american_to_decimal(raw: &str) -> Result<f64, StakingError> {
    let raw = raw.trim();
    let parsed = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| StakingError::validation("odds", format!("unparsable odds '{raw}'")))
    };

    let decimal = if let Some(rest) = raw.strip_prefix('+') {
        let american = parsed(rest)?;
        1.0 + american / 100.0
    } else if let Some(rest) = raw.strip_prefix('-') {
        let american = parsed(rest)?;
        if american == 0.0 {
            return Err(StakingError::InvalidOdds(0.0));
        }
        1.0 + 100.0 / american
    } else {
        parsed(raw)?
    };

    decimal_profit_multiplier(decimal)?;
    Ok(decimal)
}
