use crate::core::asset_matrix::AssetMatrix;
use crate::core::error::ContagionError;
use crate::core::matrix::{MatrixAccess, SquareMatrix};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a leverage entry is defined when the counterparty has no equity left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroEquityPolicy {
    /// Leave the entry at zero.
    #[default]
    Zero,
    /// Store `Decimal::MIN` for any non-zero receivable.
    Saturate,
}

/// Per-step loss-propagation coefficients.
///
/// `leverage[i][j] = min(claims[i][j], 0) / equity[j]`: the receivable bank
/// `i` holds against bank `j`, per unit of `j`'s remaining buffer. Entries
/// are never positive while equities are non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeverageMatrix {
    coefficients: SquareMatrix,
}

impl LeverageMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            coefficients: SquareMatrix::zeros(n),
        }
    }

    /// Derive leverage from the current claims and equity vector.
    ///
    /// # Panics
    ///
    /// Panics if `equity.len() != claims.size()`.
    pub fn compute(claims: &AssetMatrix, equity: &[Decimal], policy: ZeroEquityPolicy) -> Self {
        let n = claims.size();
        assert_eq!(
            equity.len(),
            n,
            "equity vector length {} does not match matrix size {}",
            equity.len(),
            n
        );

        let rows = claims.inner();
        let coefficients = SquareMatrix::from_fn(n, |i, j| {
            let receivable = rows.row(i)[j].min(Decimal::ZERO);
            coefficient(receivable, equity[j], policy)
        });
        Self { coefficients }
    }

    /// Sum of leverage against `bank` across all creditors, saturating.
    ///
    /// # Panics
    ///
    /// Panics if `bank >= size()`.
    pub fn exposure_to(&self, bank: usize) -> Decimal {
        self.coefficients
            .column(bank)
            .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c))
    }

    pub fn to_rows(&self) -> Vec<Vec<Decimal>> {
        self.coefficients.to_rows()
    }
}

fn coefficient(receivable: Decimal, equity: Decimal, policy: ZeroEquityPolicy) -> Decimal {
    if receivable == Decimal::ZERO {
        return Decimal::ZERO;
    }
    if equity == Decimal::ZERO {
        return match policy {
            ZeroEquityPolicy::Zero => Decimal::ZERO,
            ZeroEquityPolicy::Saturate => Decimal::MIN,
        };
    }
    receivable.checked_div(equity).unwrap_or_else(|| {
        // Overflow: the quotient sign follows the equity sign.
        if equity.is_sign_positive() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

impl MatrixAccess for LeverageMatrix {
    fn size(&self) -> usize {
        self.coefficients.size()
    }

    fn get(&self, row: usize, col: usize) -> Result<Decimal, ContagionError> {
        self.coefficients.get(row, col)
    }

    fn set(&mut self, row: usize, col: usize, value: Decimal) -> Result<(), ContagionError> {
        self.coefficients.set(row, col, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn claims() -> AssetMatrix {
        // Bank 0 holds a receivable of 8 against bank 1, bank 1 owes 2 to bank 2.
        AssetMatrix::from_rows(vec![
            vec![dec!(0), dec!(-8), dec!(0)],
            vec![dec!(0), dec!(0), dec!(2)],
            vec![dec!(-3), dec!(0), dec!(0)],
        ])
        .unwrap()
    }

    #[test]
    fn test_scaled_by_counterparty_equity() {
        let lev = LeverageMatrix::compute(
            &claims(),
            &[dec!(6), dec!(4), dec!(1)],
            ZeroEquityPolicy::Zero,
        );
        assert_eq!(lev.get(0, 1).unwrap(), dec!(-2));
        assert_eq!(lev.get(2, 0).unwrap(), dec!(-0.5));
        // Positive claims (obligations owed) carry no leverage.
        assert_eq!(lev.get(1, 2).unwrap(), Decimal::ZERO);
        assert_eq!(lev.exposure_to(1), dec!(-2));
    }

    #[test]
    fn test_zero_equity_left_at_zero() {
        let lev = LeverageMatrix::compute(
            &claims(),
            &[dec!(6), Decimal::ZERO, dec!(1)],
            ZeroEquityPolicy::Zero,
        );
        assert_eq!(lev.get(0, 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_equity_saturates() {
        let lev = LeverageMatrix::compute(
            &claims(),
            &[dec!(6), Decimal::ZERO, dec!(1)],
            ZeroEquityPolicy::Saturate,
        );
        assert_eq!(lev.get(0, 1).unwrap(), Decimal::MIN);
        // No receivable, nothing to saturate.
        assert_eq!(lev.get(1, 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_overflow_saturates() {
        let claims = AssetMatrix::from_rows(vec![
            vec![dec!(0), Decimal::MIN],
            vec![dec!(0), dec!(0)],
        ])
        .unwrap();
        let lev = LeverageMatrix::compute(
            &claims,
            &[dec!(1), dec!(0.0001)],
            ZeroEquityPolicy::Zero,
        );
        assert_eq!(lev.get(0, 1).unwrap(), Decimal::MIN);
    }

    #[test]
    fn test_same_contract_as_claims() {
        let mut lev = LeverageMatrix::zeros(2);
        assert_eq!(lev.size(), 2);
        lev.set(0, 1, dec!(-1.5)).unwrap();
        assert_eq!(lev.get(0, 1).unwrap(), dec!(-1.5));
        assert!(lev.set(2, 0, dec!(1)).unwrap_err().is_index());
    }
}
