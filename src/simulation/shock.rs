use crate::core::error::ContagionError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The exogenous devaluation of external assets applied at `t = 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shock {
    /// Every bank's external assets lose the same fraction `alpha`.
    Uniform(Decimal),
    /// Bank `i`'s external assets lose fraction `shocks[i]`.
    PerBank(Vec<Decimal>),
}

impl Shock {
    /// Check the shock against a network of `n` banks.
    pub fn validate(&self, n: usize) -> Result<(), ContagionError> {
        match self {
            Shock::Uniform(alpha) => {
                if !in_unit_interval(*alpha) {
                    return Err(ContagionError::AlphaOutOfRange { alpha: *alpha });
                }
            }
            Shock::PerBank(shocks) => {
                if shocks.len() != n {
                    return Err(ContagionError::DimensionMismatch {
                        field: "shock vector",
                        expected: n,
                        actual: shocks.len(),
                    });
                }
                if let Some((bank, value)) =
                    shocks.iter().enumerate().find(|(_, v)| !in_unit_interval(**v))
                {
                    return Err(ContagionError::ShockOutOfRange {
                        bank,
                        value: *value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Devaluation fraction per bank.
    pub fn factors(&self, n: usize) -> Vec<Decimal> {
        match self {
            Shock::Uniform(alpha) => vec![*alpha; n],
            Shock::PerBank(shocks) => shocks.clone(),
        }
    }
}

impl From<Decimal> for Shock {
    fn from(alpha: Decimal) -> Self {
        Shock::Uniform(alpha)
    }
}

impl From<Vec<Decimal>> for Shock {
    fn from(shocks: Vec<Decimal>) -> Self {
        Shock::PerBank(shocks)
    }
}

fn in_unit_interval(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}
