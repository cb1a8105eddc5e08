use crate::core::error::ContagionError;
use crate::core::matrix::{MatrixAccess, SquareMatrix};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The interbank claims ledger.
///
/// `claims[i][j] > 0` means bank `i` owes bank `j` that amount.
/// `claims[i][j] < 0` records the same relation from the other side:
/// bank `j` owes bank `i`.
///
/// # Examples
///
/// ```
/// use contagion_engine::core::asset_matrix::AssetMatrix;
/// use rust_decimal_macros::dec;
///
/// // Bank 0 owes bank 1 a claim of 6.
/// let claims = AssetMatrix::from_rows(vec![
///     vec![dec!(0), dec!(6)],
///     vec![dec!(0), dec!(0)],
/// ]).unwrap();
///
/// assert_eq!(claims.interbank_asset(1), dec!(6));
/// assert_eq!(claims.interbank_liability(0), dec!(6));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetMatrix {
    claims: SquareMatrix,
}

impl AssetMatrix {
    /// A claims ledger of `n` banks with no interbank exposure.
    pub fn zeros(n: usize) -> Result<Self, ContagionError> {
        if n == 0 {
            return Err(ContagionError::EmptyNetwork);
        }
        Ok(Self {
            claims: SquareMatrix::zeros(n),
        })
    }

    pub fn from_rows(rows: Vec<Vec<Decimal>>) -> Result<Self, ContagionError> {
        Ok(Self {
            claims: SquareMatrix::from_rows(rows)?,
        })
    }

    /// What others owe bank `bank`: sum of the positive entries of its column.
    ///
    /// # Panics
    ///
    /// Panics if `bank >= size()` or the sum overflows. Use
    /// [`checked_interbank_asset`](Self::checked_interbank_asset) on
    /// unvalidated input.
    pub fn interbank_asset(&self, bank: usize) -> Decimal {
        self.claims
            .column(bank)
            .filter(|v| *v > Decimal::ZERO)
            .sum()
    }

    /// What bank `bank` owes others: sum of the positive entries of its row.
    ///
    /// # Panics
    ///
    /// Panics if `bank >= size()` or the sum overflows.
    pub fn interbank_liability(&self, bank: usize) -> Decimal {
        self.claims
            .row(bank)
            .iter()
            .filter(|v| **v > Decimal::ZERO)
            .sum()
    }

    /// [`interbank_asset`](Self::interbank_asset) without panics.
    pub fn checked_interbank_asset(&self, bank: usize) -> Result<Decimal, ContagionError> {
        self.check_bank(bank)?;
        checked_positive_sum(self.claims.column(bank))
            .ok_or(ContagionError::AmountOverflow { bank })
    }

    /// [`interbank_liability`](Self::interbank_liability) without panics.
    pub fn checked_interbank_liability(&self, bank: usize) -> Result<Decimal, ContagionError> {
        self.check_bank(bank)?;
        checked_positive_sum(self.claims.row(bank).iter().copied())
            .ok_or(ContagionError::AmountOverflow { bank })
    }

    /// Scale every obligation owed by `defaulted` by `recovery_rate`.
    ///
    /// Covers both encodings of "`defaulted` owes `i`": positive entries of
    /// row `defaulted` and negative entries of column `defaulted`. Claims
    /// that others owe to `defaulted` stay as they are. Returns the total
    /// face value removed from the ledger.
    pub fn write_down(
        &mut self,
        defaulted: usize,
        recovery_rate: Decimal,
    ) -> Result<Decimal, ContagionError> {
        self.check_bank(defaulted)?;
        let n = self.size();

        let mut loss = Decimal::ZERO;
        for creditor in 0..n {
            let owed = self.claims.get(defaulted, creditor)?;
            if owed > Decimal::ZERO {
                let recovered = owed * recovery_rate;
                loss = loss.saturating_add(owed - recovered);
                self.claims.set(defaulted, creditor, recovered)?;
            }

            let receivable = self.claims.get(creditor, defaulted)?;
            if receivable < Decimal::ZERO {
                let recovered = receivable * recovery_rate;
                loss = loss.saturating_add(recovered - receivable);
                self.claims.set(creditor, defaulted, recovered)?;
            }
        }
        Ok(loss)
    }

    pub fn to_rows(&self) -> Vec<Vec<Decimal>> {
        self.claims.to_rows()
    }

    pub(crate) fn inner(&self) -> &SquareMatrix {
        &self.claims
    }

    fn check_bank(&self, bank: usize) -> Result<(), ContagionError> {
        if bank >= self.size() {
            return Err(ContagionError::BankOutOfRange {
                bank,
                size: self.size(),
            });
        }
        Ok(())
    }
}

fn checked_positive_sum(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    values
        .filter(|v| *v > Decimal::ZERO)
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

impl MatrixAccess for AssetMatrix {
    fn size(&self) -> usize {
        self.claims.size()
    }

    fn get(&self, row: usize, col: usize) -> Result<Decimal, ContagionError> {
        self.claims.get(row, col)
    }

    fn set(&mut self, row: usize, col: usize, value: Decimal) -> Result<(), ContagionError> {
        self.claims.set(row, col, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn three_banks() -> AssetMatrix {
        // 0 owes 1: 10, 0 owes 2: 4, 2 owes 1: 3, and 1 is owed 5 by 2
        // through the negative encoding at [1][2].
        AssetMatrix::from_rows(vec![
            vec![dec!(0), dec!(10), dec!(4)],
            vec![dec!(0), dec!(0), dec!(-5)],
            vec![dec!(0), dec!(3), dec!(0)],
        ])
        .unwrap()
    }

    #[test]
    fn test_aggregates_use_queried_axis() {
        let m = three_banks();
        assert_eq!(m.interbank_asset(0), dec!(0));
        assert_eq!(m.interbank_asset(1), dec!(13));
        assert_eq!(m.interbank_asset(2), dec!(4));

        assert_eq!(m.interbank_liability(0), dec!(14));
        assert_eq!(m.interbank_liability(1), dec!(0));
        assert_eq!(m.interbank_liability(2), dec!(3));
    }

    #[test]
    fn test_negative_entries_not_aggregated() {
        let m = AssetMatrix::from_rows(vec![
            vec![dec!(0), dec!(-7)],
            vec![dec!(0), dec!(0)],
        ])
        .unwrap();
        assert_eq!(m.interbank_asset(1), Decimal::ZERO);
        assert_eq!(m.interbank_liability(0), Decimal::ZERO);
    }

    #[test]
    fn test_zeros_rejects_empty() {
        assert!(AssetMatrix::zeros(0).unwrap_err().is_validation());
        assert_eq!(AssetMatrix::zeros(1).unwrap().size(), 1);
    }

    #[test]
    fn test_set_get() {
        let mut m = AssetMatrix::zeros(2).unwrap();
        m.set(1, 0, dec!(2.5)).unwrap();
        assert_eq!(m.get(1, 0).unwrap(), dec!(2.5));
        assert!(m.get(0, 2).unwrap_err().is_index());
    }

    #[test]
    fn test_write_down_full_loss() {
        let mut m = three_banks();
        let loss = m.write_down(2, Decimal::ZERO).unwrap();

        // Row 2 (2 owes 1: 3) and column 2 negative (1 is owed 5 by 2).
        assert_eq!(loss, dec!(8));
        assert_eq!(m.get(2, 1).unwrap(), Decimal::ZERO);
        assert_eq!(m.get(1, 2).unwrap(), Decimal::ZERO);
        // What 0 owes 2 is untouched.
        assert_eq!(m.get(0, 2).unwrap(), dec!(4));
    }

    #[test]
    fn test_write_down_partial_recovery() {
        let mut m = three_banks();
        let loss = m.write_down(0, dec!(0.25)).unwrap();
        assert_eq!(loss, dec!(10.5));
        assert_eq!(m.get(0, 1).unwrap(), dec!(2.5));
        assert_eq!(m.get(0, 2).unwrap(), dec!(1));
    }

    #[test]
    fn test_checked_aggregates() {
        let m = three_banks();
        assert_eq!(m.checked_interbank_asset(1).unwrap(), dec!(13));
        assert_eq!(m.checked_interbank_liability(0).unwrap(), dec!(14));
        assert!(m.checked_interbank_asset(3).unwrap_err().is_index());
    }

    #[test]
    fn test_checked_aggregates_report_overflow() {
        let m = AssetMatrix::from_rows(vec![
            vec![dec!(0), Decimal::MAX, dec!(0)],
            vec![dec!(0), dec!(0), dec!(0)],
            vec![dec!(0), dec!(1), dec!(0)],
        ])
        .unwrap();
        assert!(matches!(
            m.checked_interbank_asset(1),
            Err(ContagionError::AmountOverflow { bank: 1 })
        ));
        assert_eq!(m.checked_interbank_liability(0).unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_write_down_out_of_range() {
        let mut m = three_banks();
        assert!(m.write_down(3, Decimal::ZERO).unwrap_err().is_index());
    }
}
