//! The default cascade as a pure function over explicit state.
//!
//! A round takes the current [`CascadeState`] and produces the next one;
//! nothing is mutated in place, so any intermediate state can be kept,
//! compared, or replayed.

use crate::core::asset_matrix::AssetMatrix;
use crate::core::bank::{BalanceSheet, ExternalPositions};
use crate::core::default_set::DefaultSet;
use crate::core::error::ContagionError;
use crate::core::leverage::LeverageMatrix;
use crate::core::matrix::MatrixAccess;
use crate::simulation::config::SimulationConfig;
use rust_decimal::Decimal;
use serde::Serialize;

/// Everything that changes from one round to the next.
///
/// Besides the ledger it tracks DebtRank-style distress: `h[i]` is the
/// fraction of bank `i`'s starting equity lost so far, capped at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeState {
    t: usize,
    claims: AssetMatrix,
    equity: Vec<Decimal>,
    defaults: DefaultSet,
    leverage: LeverageMatrix,
    initial_equity: Vec<Decimal>,
    h: Vec<Decimal>,
}

impl CascadeState {
    /// State before any shock or propagation: raw equities, empty default
    /// set, no relative loss.
    ///
    /// Fails with [`ContagionError::AmountOverflow`] if a bank's totals do
    /// not fit in a `Decimal`. Later rounds only shrink claims and external
    /// assets, so a network accepted here cannot overflow afterwards.
    pub fn initial(
        claims: AssetMatrix,
        external: &ExternalPositions,
        config: &SimulationConfig,
    ) -> Result<Self, ContagionError> {
        let n = claims.size();
        let mut equity = Vec::with_capacity(n);
        for bank in 0..n {
            equity.push(BalanceSheet::of(bank, &claims, external)?.equity());
        }
        let leverage = LeverageMatrix::compute(&claims, &equity, config.zero_equity_policy);
        Ok(Self {
            t: 0,
            claims,
            initial_equity: equity.clone(),
            equity,
            defaults: DefaultSet::new(),
            leverage,
            h: vec![Decimal::ZERO; n],
        })
    }

    /// Index of the next round to run.
    pub fn t(&self) -> usize {
        self.t
    }

    pub fn claims(&self) -> &AssetMatrix {
        &self.claims
    }

    /// Per-bank equity, zero for defaulted banks.
    pub fn equity(&self) -> &[Decimal] {
        &self.equity
    }

    pub fn defaults(&self) -> &DefaultSet {
        &self.defaults
    }

    pub fn leverage(&self) -> &LeverageMatrix {
        &self.leverage
    }

    /// Equity computed by the initialisation pass, before the shock.
    pub fn initial_equity(&self) -> &[Decimal] {
        &self.initial_equity
    }

    /// Per-bank relative equity loss `h[i] = min(1, (E_i(0) - E_i(t)) / E_i(0))`.
    ///
    /// Zero for banks that started with no positive equity.
    pub fn relative_loss(&self) -> &[Decimal] {
        &self.h
    }

    /// System-wide loss `H(t)`: the relative losses weighted by each bank's
    /// share of total positive starting equity. Zero if no bank started
    /// with positive equity.
    pub fn aggregate_loss(&self) -> Decimal {
        let mut total = Decimal::ZERO;
        let mut lost = Decimal::ZERO;
        for (h, start) in self.h.iter().zip(&self.initial_equity) {
            if *start > Decimal::ZERO {
                total = total.saturating_add(*start);
                lost = lost.saturating_add(h.checked_mul(*start).unwrap_or(*start));
            }
        }
        lost.checked_div(total)
            .unwrap_or(Decimal::ZERO)
            .min(Decimal::ONE)
    }
}

fn relative_loss(start: Decimal, now: Decimal) -> Decimal {
    if start <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let lost = start.checked_sub(now).unwrap_or(Decimal::MAX).max(Decimal::ZERO);
    lost.checked_div(start)
        .unwrap_or(Decimal::ONE)
        .min(Decimal::ONE)
}

/// Result of one round.
#[derive(Debug, Clone)]
pub struct Round {
    pub state: CascadeState,
    /// Banks that defaulted in this round, ascending.
    pub new_defaults: Vec<usize>,
    /// Face value of obligations written down in this round.
    pub written_down: Decimal,
}

/// Run one round of the cascade.
///
/// # Algorithm
///
/// 1. Recompute each bank's balance sheet from the current claims.
/// 2. Banks with negative equity that have not yet defaulted join the
///    default set. Every defaulted bank reports equity zero.
/// 3. Obligations owed by the newly defaulted banks are written down to
///    `recovery_rate` of face value.
/// 4. Leverage is derived from the written-down claims and the new equities.
/// 5. Relative equity loss is updated against the initial equities.
pub fn advance(
    state: &CascadeState,
    external: &ExternalPositions,
    config: &SimulationConfig,
) -> Result<Round, ContagionError> {
    let n = state.claims.size();
    let mut defaults = state.defaults.clone();
    let mut new_defaults = Vec::new();
    let mut equity = Vec::with_capacity(n);

    for bank in 0..n {
        let sheet = BalanceSheet::of(bank, &state.claims, external)?;
        if sheet.is_insolvent() && defaults.insert(bank) {
            new_defaults.push(bank);
        }
        if defaults.contains(bank) {
            equity.push(Decimal::ZERO);
        } else {
            equity.push(sheet.equity());
        }
    }

    let mut claims = state.claims.clone();
    let mut written_down = Decimal::ZERO;
    for &bank in &new_defaults {
        written_down = written_down.saturating_add(claims.write_down(bank, config.recovery_rate)?);
    }

    let leverage = LeverageMatrix::compute(&claims, &equity, config.zero_equity_policy);
    let h = state
        .initial_equity
        .iter()
        .zip(&equity)
        .map(|(start, now)| relative_loss(*start, *now))
        .collect();

    log::debug!(
        "round t={} new_defaults={:?} total_defaults={} written_down={}",
        state.t,
        new_defaults,
        defaults.len(),
        written_down
    );

    Ok(Round {
        state: CascadeState {
            t: state.t + 1,
            claims,
            equity,
            defaults,
            leverage,
            initial_equity: state.initial_equity.clone(),
            h,
        },
        new_defaults,
        written_down,
    })
}
