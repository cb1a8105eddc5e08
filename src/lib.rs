//! # contagion-engine
//!
//! Interbank default-cascade simulation.
//!
//! Given a matrix of bilateral interbank claims, each bank's external
//! assets and liabilities, and a devaluation shock, this engine simulates
//! how the shock propagates: banks whose equity turns negative default,
//! their obligations are written down, and their creditors absorb the
//! loss, possibly defaulting in the next round.
//!
//! ## Architecture
//!
//! - **core** — Claims ledger, leverage ledger, balance sheets, default set, errors
//! - **simulation** — Shock, cascade rounds, simulator state machine, time series and sinks

pub mod core;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::asset_matrix::AssetMatrix;
    pub use crate::core::bank::BalanceSheet;
    pub use crate::core::default_set::DefaultSet;
    pub use crate::core::error::ContagionError;
    pub use crate::core::leverage::{LeverageMatrix, ZeroEquityPolicy};
    pub use crate::core::matrix::MatrixAccess;
    pub use crate::simulation::config::SimulationConfig;
    pub use crate::simulation::shock::Shock;
    pub use crate::simulation::simulator::{CascadeSummary, SimulationStatus, Simulator, StepOutcome};
    pub use crate::simulation::sink::{DirectorySink, JsonLinesSink, MemorySink, RecordSink};
    pub use crate::simulation::time_series::{CascadeEvent, EventKind, TimeSeries};
}
