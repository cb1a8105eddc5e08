use crate::core::asset_matrix::AssetMatrix;
use crate::core::error::ContagionError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Each bank's holdings and obligations outside the interbank network.
///
/// Fixed for the run except for the one-off devaluation of assets by the
/// initial shock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalPositions {
    assets: Vec<Decimal>,
    liabilities: Vec<Decimal>,
}

impl ExternalPositions {
    /// Validate and pair external asset and liability vectors for `n` banks.
    pub fn new(
        n: usize,
        assets: Vec<Decimal>,
        liabilities: Vec<Decimal>,
    ) -> Result<Self, ContagionError> {
        check_vector("external_asset", n, &assets)?;
        check_vector("external_liability", n, &liabilities)?;
        Ok(Self {
            assets,
            liabilities,
        })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn asset(&self, bank: usize) -> Result<Decimal, ContagionError> {
        self.assets
            .get(bank)
            .copied()
            .ok_or(ContagionError::BankOutOfRange {
                bank,
                size: self.len(),
            })
    }

    pub fn liability(&self, bank: usize) -> Result<Decimal, ContagionError> {
        self.liabilities
            .get(bank)
            .copied()
            .ok_or(ContagionError::BankOutOfRange {
                bank,
                size: self.len(),
            })
    }

    pub fn assets(&self) -> &[Decimal] {
        &self.assets
    }

    pub fn liabilities(&self) -> &[Decimal] {
        &self.liabilities
    }

    /// Multiply each external asset by `1 - shock[i]`.
    pub(crate) fn devalue(&mut self, shocks: &[Decimal]) {
        for (asset, shock) in self.assets.iter_mut().zip(shocks) {
            *asset *= Decimal::ONE - *shock;
        }
    }
}

fn check_vector(field: &'static str, n: usize, values: &[Decimal]) -> Result<(), ContagionError> {
    if values.len() != n {
        return Err(ContagionError::DimensionMismatch {
            field,
            expected: n,
            actual: values.len(),
        });
    }
    if let Some((bank, value)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| **v < Decimal::ZERO)
    {
        return Err(ContagionError::NegativeExternal {
            field,
            bank,
            value: *value,
        });
    }
    Ok(())
}

/// A single bank's book at one point of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub interbank_asset: Decimal,
    pub interbank_liability: Decimal,
    pub external_asset: Decimal,
    pub external_liability: Decimal,
}

impl BalanceSheet {
    /// Read bank `bank`'s book from the claims ledger and external positions.
    ///
    /// Rejects out-of-range banks and books whose totals or equity overflow
    /// the decimal range, so the arithmetic accessors below cannot panic.
    pub fn of(
        bank: usize,
        claims: &AssetMatrix,
        external: &ExternalPositions,
    ) -> Result<Self, ContagionError> {
        let sheet = Self {
            interbank_asset: claims.checked_interbank_asset(bank)?,
            interbank_liability: claims.checked_interbank_liability(bank)?,
            external_asset: external.asset(bank)?,
            external_liability: external.liability(bank)?,
        };
        sheet
            .checked_equity()
            .ok_or(ContagionError::AmountOverflow { bank })?;
        Ok(sheet)
    }

    fn checked_equity(&self) -> Option<Decimal> {
        let assets = self.interbank_asset.checked_add(self.external_asset)?;
        let liabilities = self
            .interbank_liability
            .checked_add(self.external_liability)?;
        assets.checked_sub(liabilities)
    }

    pub fn total_assets(&self) -> Decimal {
        self.interbank_asset + self.external_asset
    }

    pub fn total_liabilities(&self) -> Decimal {
        self.interbank_liability + self.external_liability
    }

    /// Assets minus liabilities. Negative equity means insolvency.
    pub fn equity(&self) -> Decimal {
        self.total_assets() - self.total_liabilities()
    }

    pub fn is_insolvent(&self) -> bool {
        self.equity() < Decimal::ZERO
    }
}
