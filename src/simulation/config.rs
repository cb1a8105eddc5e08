//! Run-level configuration for the contagion cascade.

use crate::core::error::ContagionError;
pub use crate::core::leverage::ZeroEquityPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tunables for a single simulation run.
///
/// Deserialises from JSON with every field optional:
///
/// ```
/// use contagion_engine::simulation::config::SimulationConfig;
/// use rust_decimal_macros::dec;
///
/// let config: SimulationConfig =
///     serde_json::from_str(r#"{ "recovery_rate": "0.4" }"#).unwrap();
/// assert_eq!(config.recovery_rate, dec!(0.4));
/// assert_eq!(config.max_steps, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum number of rounds, the shock round included.
    /// `None` allows `n + 1` contagion rounds after the shock.
    pub max_steps: Option<usize>,
    /// Fraction of a defaulted bank's obligations that survives write-down.
    pub recovery_rate: Decimal,
    /// Leverage entry used when the counterparty's equity is zero.
    pub zero_equity_policy: ZeroEquityPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            recovery_rate: Decimal::ZERO,
            zero_equity_policy: ZeroEquityPolicy::Zero,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ContagionError> {
        if self.recovery_rate < Decimal::ZERO || self.recovery_rate > Decimal::ONE {
            return Err(ContagionError::RecoveryRateOutOfRange {
                rate: self.recovery_rate,
            });
        }
        if self.max_steps == Some(0) {
            return Err(ContagionError::ZeroStepBudget);
        }
        Ok(())
    }

    /// Effective round budget for a network of `n` banks.
    pub fn step_budget(&self, n: usize) -> usize {
        // shock round + n + 1 contagion rounds; a correct cascade needs at most n + 1 in total
        self.max_steps.unwrap_or(n + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_budget(4), 6);
    }

    #[test]
    fn test_recovery_rate_bounds() {
        let config = SimulationConfig {
            recovery_rate: dec!(1.5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ContagionError::RecoveryRateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = SimulationConfig {
            max_steps: Some(0),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_policy_from_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "zero_equity_policy": "saturate", "max_steps": 3 }"#)
                .unwrap();
        assert_eq!(config.zero_equity_policy, ZeroEquityPolicy::Saturate);
        assert_eq!(config.step_budget(10), 3);
    }
}
