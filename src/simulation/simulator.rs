use crate::core::asset_matrix::AssetMatrix;
use crate::core::bank::{BalanceSheet, ExternalPositions};
use crate::core::default_set::DefaultSet;
use crate::core::error::ContagionError;
use crate::core::leverage::LeverageMatrix;
use crate::core::matrix::MatrixAccess;
use crate::simulation::cascade::{advance, CascadeState, Round};
use crate::simulation::config::SimulationConfig;
use crate::simulation::shock::Shock;
use crate::simulation::sink::{MemorySink, RecordSink};
use crate::simulation::time_series::{CascadeEvent, EventKind, TimeSeries};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a simulation run.
///
/// `Initialized -> Stepping -> Converged | Exhausted`. The shock round may
/// also go straight from `Initialized` to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Initialized,
    Stepping,
    Converged,
    Exhausted,
}

impl SimulationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "initialized",
            Self::Stepping => "stepping",
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
        };
        f.pad(name)
    }
}

/// What a single round did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Step index the round ran at.
    pub t: usize,
    pub new_defaults: Vec<usize>,
    /// Status after the round.
    pub status: SimulationStatus,
}

/// Final report of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub bank_count: usize,
    pub status: SimulationStatus,
    /// Number of rounds run, the shock round included.
    pub steps: usize,
    /// Defaulted banks, ascending.
    pub defaults: Vec<usize>,
    pub final_equity: Vec<Decimal>,
    /// Per-bank fraction of starting equity lost, in [0, 1].
    pub relative_loss: Vec<Decimal>,
    /// Equity-weighted system loss over the relative losses.
    pub aggregate_loss: Decimal,
    /// Leverage held against each bank by its creditors at the end of the run.
    pub final_exposure: Vec<Decimal>,
    /// Face value of interbank obligations written down over the run.
    pub total_written_down: Decimal,
    pub time_series: TimeSeries,
}

impl CascadeSummary {
    /// Fraction of banks that defaulted.
    pub fn default_ratio(&self) -> f64 {
        if self.bank_count == 0 {
            return 0.0;
        }
        self.defaults.len() as f64 / self.bank_count as f64
    }
}

impl fmt::Display for CascadeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Contagion Run {} ===", self.run_id)?;
        writeln!(f, "Banks:          {}", self.bank_count)?;
        writeln!(f, "Status:         {}", self.status)?;
        writeln!(f, "Steps:          {}", self.steps)?;
        writeln!(
            f,
            "Defaults:       {} ({:.1}%)",
            self.defaults.len(),
            self.default_ratio() * 100.0
        )?;
        writeln!(f, "Written down:   {}", self.total_written_down)?;
        writeln!(f, "Aggregate loss: {}", self.aggregate_loss.round_dp(4))?;

        writeln!(f, "\n--- Time Series ---")?;
        for (t, events) in self.time_series.iter() {
            for event in events {
                match event.bank_index {
                    Some(bank) => writeln!(f, "  t={:<4} {:<10} bank {}", t, event.kind, bank)?,
                    None => writeln!(f, "  t={:<4} {}", t, event.kind)?,
                }
            }
        }

        writeln!(f, "\n--- Final Positions ---")?;
        writeln!(
            f,
            "  {:<11} {:>15} {:>10} {:>15}",
            "", "equity", "loss", "exposure"
        )?;
        for (bank, equity) in self.final_equity.iter().enumerate() {
            let loss = self.relative_loss.get(bank).copied().unwrap_or_default();
            let exposure = self.final_exposure.get(bank).copied().unwrap_or_default();
            writeln!(
                f,
                "  bank {:<6} {:>15} {:>10} {:>15}",
                bank,
                equity,
                loss.round_dp(4),
                exposure.round_dp(4)
            )?;
        }
        Ok(())
    }
}

/// Runs the default cascade over one interbank network.
///
/// Owns the claims ledger, the external positions, the running default set
/// and the time series for exactly one run. Every round goes through the
/// pure [`advance`] function; the simulator only commits its result.
///
/// # Examples
///
/// ```
/// use contagion_engine::prelude::*;
/// use rust_decimal_macros::dec;
///
/// let claims = AssetMatrix::from_rows(vec![
///     vec![dec!(0), dec!(6)],
///     vec![dec!(0), dec!(0)],
/// ]).unwrap();
///
/// let mut sim = Simulator::new(
///     claims,
///     vec![dec!(0), dec!(0)],
///     vec![dec!(7), dec!(1)],
///     dec!(0),
///     MemorySink::new(),
/// ).unwrap();
///
/// let summary = sim.run().unwrap();
/// assert_eq!(summary.status, SimulationStatus::Converged);
/// assert_eq!(summary.defaults, vec![0, 1]);
/// ```
#[derive(Debug)]
pub struct Simulator<S: RecordSink = MemorySink> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    external: ExternalPositions,
    shock: Shock,
    config: SimulationConfig,
    state: CascadeState,
    status: SimulationStatus,
    time_series: TimeSeries,
    total_written_down: Decimal,
    sink: S,
}

impl<S: RecordSink> Simulator<S> {
    /// Build a simulator with the default configuration.
    pub fn new(
        claims: AssetMatrix,
        external_asset: Vec<Decimal>,
        external_liability: Vec<Decimal>,
        shock: impl Into<Shock>,
        sink: S,
    ) -> Result<Self, ContagionError> {
        Self::with_config(
            claims,
            external_asset,
            external_liability,
            shock,
            SimulationConfig::default(),
            sink,
        )
    }

    /// Validate the input and run the initialisation pass.
    ///
    /// Nothing is shocked or propagated yet: the simulator starts at `t = 0`
    /// with an empty default set and an empty time series.
    pub fn with_config(
        claims: AssetMatrix,
        external_asset: Vec<Decimal>,
        external_liability: Vec<Decimal>,
        shock: impl Into<Shock>,
        config: SimulationConfig,
        sink: S,
    ) -> Result<Self, ContagionError> {
        let n = claims.size();
        let external = ExternalPositions::new(n, external_asset, external_liability)?;
        let shock = shock.into();
        shock.validate(n)?;
        config.validate()?;

        let state = CascadeState::initial(claims, &external, &config)?;
        let run_id = Uuid::new_v4();
        log::debug!("initialized run {} with {} banks", run_id, n);

        Ok(Self {
            run_id,
            started_at: Utc::now(),
            external,
            shock,
            config,
            state,
            status: SimulationStatus::Initialized,
            time_series: TimeSeries::new(),
            total_written_down: Decimal::ZERO,
            sink,
        })
    }

    /// Devalue external assets and run the `t = 0` round.
    ///
    /// Defaults found in this round are recorded as `"shock"`.
    pub fn apply_initial_shock(&mut self) -> Result<StepOutcome, ContagionError> {
        if self.status != SimulationStatus::Initialized {
            return Err(ContagionError::InvalidState {
                operation: "apply the initial shock",
                status: self.status,
            });
        }

        let mut shocked = self.external.clone();
        shocked.devalue(&self.shock.factors(self.size()));
        let round = advance(&self.state, &shocked, &self.config)?;
        let outcome = self.commit(round, EventKind::Shock)?;
        self.external = shocked;
        Ok(outcome)
    }

    /// Run one contagion round.
    ///
    /// After convergence or exhaustion this is a no-op that reports no new
    /// defaults and records nothing.
    pub fn step(&mut self) -> Result<StepOutcome, ContagionError> {
        match self.status {
            SimulationStatus::Initialized => Err(ContagionError::InvalidState {
                operation: "step before the initial shock",
                status: self.status,
            }),
            SimulationStatus::Converged | SimulationStatus::Exhausted => Ok(StepOutcome {
                t: self.state.t(),
                new_defaults: Vec::new(),
                status: self.status,
            }),
            SimulationStatus::Stepping => {
                let round = advance(&self.state, &self.external, &self.config)?;
                self.commit(round, EventKind::Default)
            }
        }
    }

    /// Shock the network if needed, step to a terminal state and hand the
    /// summary to the sink.
    pub fn run(&mut self) -> Result<CascadeSummary, ContagionError> {
        if self.status == SimulationStatus::Initialized {
            self.apply_initial_shock()?;
        }
        while !self.status.is_terminal() {
            self.step()?;
        }
        let summary = self.summary();
        self.sink.finish(&summary)?;
        Ok(summary)
    }

    fn commit(&mut self, round: Round, kind: EventKind) -> Result<StepOutcome, ContagionError> {
        let t = self.state.t();
        let mut events: Vec<CascadeEvent> = round
            .new_defaults
            .iter()
            .map(|&bank| CascadeEvent::default_of(kind, bank))
            .collect();

        let status = if round.new_defaults.is_empty() {
            events.push(CascadeEvent::marker(EventKind::Converged));
            SimulationStatus::Converged
        } else if round.state.t() >= self.config.step_budget(self.size()) {
            events.push(CascadeEvent::marker(EventKind::Exhausted));
            SimulationStatus::Exhausted
        } else {
            SimulationStatus::Stepping
        };

        self.sink.append(t, &events)?;

        for bank in &round.new_defaults {
            log::info!("t={} bank {} defaulted ({})", t, bank, kind);
        }
        match status {
            SimulationStatus::Converged => log::info!(
                "run {} converged at t={} with {} defaults",
                self.run_id,
                t,
                round.state.defaults().len()
            ),
            SimulationStatus::Exhausted => log::warn!(
                "run {} exhausted its step budget at t={} with defaults still occurring",
                self.run_id,
                t
            ),
            _ => {}
        }

        self.time_series.append(t, events);
        self.total_written_down = self.total_written_down.saturating_add(round.written_down);
        self.state = round.state;
        self.status = status;

        Ok(StepOutcome {
            t,
            new_defaults: round.new_defaults,
            status,
        })
    }

    pub fn summary(&self) -> CascadeSummary {
        CascadeSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            bank_count: self.size(),
            status: self.status,
            steps: self.time_series.len(),
            defaults: self.state.defaults().to_vec(),
            final_equity: self.state.equity().to_vec(),
            relative_loss: self.state.relative_loss().to_vec(),
            aggregate_loss: self.state.aggregate_loss(),
            final_exposure: (0..self.size())
                .map(|bank| self.state.leverage().exposure_to(bank))
                .collect(),
            total_written_down: self.total_written_down,
            time_series: self.time_series.clone(),
        }
    }

    // --- Accessors ---

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn size(&self) -> usize {
        self.state.claims().size()
    }

    /// Index of the next round.
    pub fn t(&self) -> usize {
        self.state.t()
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn shock(&self) -> &Shock {
        &self.shock
    }

    pub fn state(&self) -> &CascadeState {
        &self.state
    }

    pub fn claims(&self) -> &AssetMatrix {
        self.state.claims()
    }

    pub fn leverage(&self) -> &LeverageMatrix {
        self.state.leverage()
    }

    pub fn equity(&self) -> &[Decimal] {
        self.state.equity()
    }

    pub fn relative_loss(&self) -> &[Decimal] {
        self.state.relative_loss()
    }

    pub fn aggregate_loss(&self) -> Decimal {
        self.state.aggregate_loss()
    }

    pub fn default_set(&self) -> &DefaultSet {
        self.state.defaults()
    }

    pub fn is_defaulted(&self, bank: usize) -> bool {
        self.state.defaults().contains(bank)
    }

    pub fn external_asset(&self, bank: usize) -> Result<Decimal, ContagionError> {
        self.external.asset(bank)
    }

    pub fn external_liability(&self, bank: usize) -> Result<Decimal, ContagionError> {
        self.external.liability(bank)
    }

    /// Bank `bank`'s book as of the current claims, before any clamping.
    pub fn balance_sheet(&self, bank: usize) -> Result<BalanceSheet, ContagionError> {
        BalanceSheet::of(bank, self.state.claims(), &self.external)
    }

    pub fn time_series(&self) -> &TimeSeries {
        &self.time_series
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn two_bank(liability_1: Decimal) -> Simulator {
        let claims = AssetMatrix::from_rows(vec![
            vec![dec!(0), dec!(6)],
            vec![dec!(0), dec!(0)],
        ])
        .unwrap();
        Simulator::new(
            claims,
            vec![dec!(0), dec!(0)],
            vec![dec!(7), liability_1],
            dec!(0),
            MemorySink::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_initialized_state() {
        let sim = two_bank(dec!(0));
        assert_eq!(sim.status(), SimulationStatus::Initialized);
        assert_eq!(sim.t(), 0);
        assert!(sim.default_set().is_empty());
        assert!(sim.time_series().is_empty());
        assert_eq!(sim.equity(), &[dec!(-13), dec!(6)]);
    }

    #[test]
    fn test_step_before_shock_rejected() {
        let mut sim = two_bank(dec!(0));
        let err = sim.step().unwrap_err();
        assert!(matches!(
            err,
            ContagionError::InvalidState {
                status: SimulationStatus::Initialized,
                ..
            }
        ));
    }

    #[test]
    fn test_shock_only_once() {
        let mut sim = two_bank(dec!(0));
        sim.apply_initial_shock().unwrap();
        assert!(matches!(
            sim.apply_initial_shock(),
            Err(ContagionError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_shock_round_records_shock_defaults() {
        let mut sim = two_bank(dec!(0));
        let outcome = sim.apply_initial_shock().unwrap();
        assert_eq!(outcome.t, 0);
        assert_eq!(outcome.new_defaults, vec![0]);
        assert_eq!(outcome.status, SimulationStatus::Stepping);
        assert_eq!(
            sim.time_series().at(0).unwrap(),
            &[CascadeEvent::default_of(EventKind::Shock, 0)]
        );
        assert_eq!(sim.claims().get(0, 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_equity_survivor() {
        let mut sim = two_bank(dec!(0));
        let summary = sim.run().unwrap();
        assert_eq!(summary.defaults, vec![0]);
        assert_eq!(summary.final_equity, vec![dec!(0), dec!(0)]);
        assert_eq!(
            sim.time_series().at(1).unwrap(),
            &[CascadeEvent::marker(EventKind::Converged)]
        );
    }

    #[test]
    fn test_step_after_convergence_is_noop() {
        let mut sim = two_bank(dec!(1));
        sim.run().unwrap();
        let claims = sim.claims().clone();
        let log_len = sim.time_series().len();
        let t = sim.t();

        let outcome = sim.step().unwrap();
        assert!(outcome.new_defaults.is_empty());
        assert_eq!(outcome.status, SimulationStatus::Converged);
        assert_eq!(sim.claims(), &claims);
        assert_eq!(sim.time_series().len(), log_len);
        assert_eq!(sim.t(), t);
    }

    #[test]
    fn test_budget_exhaustion() {
        let claims = AssetMatrix::from_rows(vec![
            vec![dec!(0), dec!(6), dec!(0)],
            vec![dec!(0), dec!(0), dec!(4)],
            vec![dec!(0), dec!(0), dec!(0)],
        ])
        .unwrap();
        let config = SimulationConfig {
            max_steps: Some(2),
            ..Default::default()
        };
        let mut sim = Simulator::with_config(
            claims,
            vec![dec!(0), dec!(1), dec!(2)],
            vec![dec!(1), dec!(2), dec!(5)],
            dec!(0),
            config,
            MemorySink::new(),
        )
        .unwrap();

        let summary = sim.run().unwrap();
        assert_eq!(summary.status, SimulationStatus::Exhausted);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.defaults, vec![0, 1]);
        assert_eq!(
            sim.time_series().at(1).unwrap(),
            &[
                CascadeEvent::default_of(EventKind::Default, 1),
                CascadeEvent::marker(EventKind::Exhausted),
            ]
        );
    }

    #[test]
    fn test_sink_receives_every_step_and_summary() {
        let mut sim = two_bank(dec!(1));
        let summary = sim.run().unwrap();
        let sink = sim.into_sink();
        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.summary().unwrap().run_id, summary.run_id);
    }

    #[test]
    fn test_balance_sheet_bounds() {
        let sim = two_bank(dec!(0));
        assert_eq!(sim.balance_sheet(1).unwrap().interbank_asset, dec!(6));
        assert!(sim.balance_sheet(2).unwrap_err().is_index());
        assert!(sim.external_asset(9).unwrap_err().is_index());
    }

    #[test]
    fn test_summary_display() {
        let mut sim = two_bank(dec!(1));
        let summary = sim.run().unwrap();
        let text = summary.to_string();
        assert!(text.contains("Status:         converged"));
        assert!(text.contains("shock"));
        assert!(text.contains("bank 1"));
        assert!(text.contains("Aggregate loss: 1"));
        assert!(text.contains("exposure"));
    }

    #[test]
    fn test_summary_reports_losses() {
        let mut sim = two_bank(dec!(1));
        let summary = sim.run().unwrap();
        assert_eq!(summary.relative_loss, vec![dec!(0), dec!(1)]);
        assert_eq!(summary.aggregate_loss, dec!(1));
        assert_eq!(sim.aggregate_loss(), dec!(1));
        assert_eq!(summary.final_exposure, vec![dec!(0), dec!(0)]);
    }

    #[test]
    fn test_overflowing_column_rejected_at_construction() {
        let half = Decimal::MAX / dec!(2) + dec!(1);
        let claims = AssetMatrix::from_rows(vec![
            vec![dec!(0), dec!(0), half],
            vec![dec!(0), dec!(0), half],
            vec![dec!(0), dec!(0), dec!(0)],
        ])
        .unwrap();
        let err = Simulator::new(
            claims,
            vec![dec!(0); 3],
            vec![dec!(0); 3],
            dec!(0),
            MemorySink::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ContagionError::AmountOverflow { bank: 2 }));
        assert!(err.is_validation());
    }
}
