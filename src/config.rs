use clap::Parser;

use crate::staking::parlay::ParlayOptions;
use crate::staking::projector::DEFAULT_DAYS_PROJECTION;

/// Bankroll staking and wager-recommendation service
#[derive(Parser, Debug, Clone)]
#[command(name = "staking-engine", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "staking.db")]
    pub database_path: String,

    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Days to project when a request does not specify a horizon
    #[arg(long, env = "DAYS_PROJECTION", default_value_t = DEFAULT_DAYS_PROJECTION)]
    pub days_projection: u32,

    /// Longest projection horizon a request may ask for
    #[arg(long, env = "MAX_DAYS_PROJECTION", default_value = "365")]
    pub max_days_projection: u32,

    /// Default maximum number of legs per parlay
    #[arg(long, env = "PARLAY_MAX_LEGS", default_value = "3")]
    pub parlay_max_legs: usize,

    /// Default minimum expected value for a bet to be used as a parlay leg
    #[arg(long, env = "PARLAY_MIN_LEG_EV", default_value = "0.05")]
    pub parlay_min_leg_ev: f64,

    /// Largest parlay stake as a fraction of bankroll (e.g. 0.05 = 5%)
    #[arg(long, env = "PARLAY_STAKE_CAP", default_value = "0.05")]
    pub parlay_stake_cap: f64,

    /// Number of highest-EV bets considered when building parlays
    #[arg(long, env = "PARLAY_POOL_SIZE", default_value = "20")]
    pub parlay_pool_size: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_days_projection == 0 {
            anyhow::bail!("max_days_projection must be at least 1");
        }
        if !(1..=self.max_days_projection).contains(&self.days_projection) {
            anyhow::bail!(
                "days_projection must be between 1 and {}",
                self.max_days_projection
            );
        }
        if self.parlay_max_legs < 2 {
            anyhow::bail!("parlay_max_legs must be at least 2");
        }
        if !self.parlay_min_leg_ev.is_finite() {
            anyhow::bail!("parlay_min_leg_ev must be a finite number");
        }
        if !(self.parlay_stake_cap > 0.0 && self.parlay_stake_cap <= 1.0) {
            anyhow::bail!("parlay_stake_cap must be in (0.0, 1.0]");
        }
        // A parlay needs two legs, so a smaller pool can never produce one.
        if self.parlay_pool_size < 2 {
            anyhow::bail!("parlay_pool_size must be at least 2");
        }
        Ok(())
    }

    pub fn parlay_options(&self) -> ParlayOptions {
        ParlayOptions {
            max_legs: self.parlay_max_legs,
            min_leg_ev: self.parlay_min_leg_ev,
            stake_cap: self.parlay_stake_cap,
            pool_size: self.parlay_pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::parse_from(["staking-engine"]);
        config.validate().unwrap();
        assert_eq!(config.days_projection, 30);
        assert_eq!(config.parlay_options(), ParlayOptions::default());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let config = Config::parse_from(["staking-engine", "--days-projection", "400"]);
        assert!(config.validate().is_err());

        let config = Config::parse_from(["staking-engine", "--parlay-max-legs", "1"]);
        assert!(config.validate().is_err());

        let config = Config::parse_from(["staking-engine", "--parlay-stake-cap", "1.5"]);
        assert!(config.validate().is_err());

        for size in ["0", "1"] {
            let config = Config::parse_from(["staking-engine", "--parlay-pool-size", size]);
            assert!(config.validate().is_err(), "pool size {size} accepted");
        }
        let config = Config::parse_from(["staking-engine", "--parlay-pool-size", "2"]);
        config.validate().unwrap();
    }
}
