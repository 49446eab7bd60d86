//! Table set configuration.

use super::models::GameType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed set of physical tables and the rates staff may pick from.
///
/// The set is decided at startup; tables are never created or removed while
/// the engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Snooker table id -> starting rate per minute
    pub snooker_rates: BTreeMap<u32, f64>,

    /// Pool table id -> starting rate per minute
    pub pool_rates: BTreeMap<u32, f64>,

    /// Rates staff are allowed to assign to an idle table
    pub available_rates: Vec<f64>,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            snooker_rates: BTreeMap::from([(1, 4.0), (2, 4.5), (3, 4.0)]),
            pool_rates: BTreeMap::from([(1, 2.0), (2, 2.5), (3, 2.0)]),
            // 2.0 through 10.0 in half-unit steps
            available_rates: (4..=20).map(|n| f64::from(n) * 0.5).collect(),
        }
    }
}

impl TablesConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.snooker_rates.is_empty() && self.pool_rates.is_empty() {
            return Err("At least one table must be configured".to_string());
        }

        if self.available_rates.is_empty() {
            return Err("The allowed rate list must not be empty".to_string());
        }

        if self.available_rates.iter().any(|r| *r <= 0.0) {
            return Err("Rates must be positive".to_string());
        }

        for game in GameType::ALL {
            for (table_id, rate) in self.rates_for(game) {
                if !self.is_rate_allowed(*rate) {
                    return Err(format!(
                        "{} table {} starts at rate {} which is not in the allowed list",
                        game, table_id, rate
                    ));
                }
            }
        }

        Ok(())
    }

    /// Starting rates for one game type
    pub fn rates_for(&self, game: GameType) -> &BTreeMap<u32, f64> {
        match game {
            GameType::Snooker => &self.snooker_rates,
            GameType::Pool => &self.pool_rates,
        }
    }

    /// Whether a requested rate is a member of the allowed list
    pub fn is_rate_allowed(&self, rate: f64) -> bool {
        self.available_rates.iter().any(|r| (r - rate).abs() < 1e-9)
    }
}
