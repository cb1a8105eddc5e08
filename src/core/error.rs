use crate::simulation::simulator::SimulationStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors arising from building or running a contagion simulation.
///
/// Validation errors are raised at construction time and abort the run
/// before any simulation state exists. Index errors point at a defect in
/// the caller (or in the cascade itself) and are never recoverable.
#[derive(Debug, Error)]
pub enum ContagionError {
    #[error("network must contain at least one bank")]
    EmptyNetwork,

    #[error("claims matrix is not square: row {row} has {actual} entries, expected {expected}")]
    NonSquareMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("length of {field} ({actual} given) must match the claims matrix dimension ({expected})")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("alpha must be between 0 and 1, got {alpha}")]
    AlphaOutOfRange { alpha: Decimal },

    #[error("shock for bank {bank} must be between 0 and 1, got {value}")]
    ShockOutOfRange { bank: usize, value: Decimal },

    #[error("{field} of bank {bank} must be non-negative, got {value}")]
    NegativeExternal {
        field: &'static str,
        bank: usize,
        value: Decimal,
    },

    #[error("recovery rate must be between 0 and 1, got {rate}")]
    RecoveryRateOutOfRange { rate: Decimal },

    #[error("step budget must allow at least one round")]
    ZeroStepBudget,

    #[error("balance sheet of bank {bank} overflows the decimal range")]
    AmountOverflow { bank: usize },

    #[error("index ({row}, {col}) out of bounds for {size}x{size} matrix")]
    IndexOutOfBounds { row: usize, col: usize, size: usize },

    #[error("bank {bank} out of range for network of {size} banks")]
    BankOutOfRange { bank: usize, size: usize },

    #[error("cannot {operation} while simulation is {status}")]
    InvalidState {
        operation: &'static str,
        status: SimulationStatus,
    },

    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContagionError {
    /// True for errors raised while validating construction input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyNetwork
                | Self::NonSquareMatrix { .. }
                | Self::DimensionMismatch { .. }
                | Self::AlphaOutOfRange { .. }
                | Self::ShockOutOfRange { .. }
                | Self::NegativeExternal { .. }
                | Self::RecoveryRateOutOfRange { .. }
                | Self::ZeroStepBudget
                | Self::AmountOverflow { .. }
        )
    }

    /// True for out-of-range bank or matrix access.
    pub fn is_index(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfBounds { .. } | Self::BankOutOfRange { .. }
        )
    }
}
