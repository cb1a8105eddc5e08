use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What happened to the network at a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Default detected in the shock round.
    Shock,
    /// Default caused by write-downs in a later round.
    Default,
    /// No new defaults this round: fixed point reached.
    Converged,
    /// Step budget ran out while defaults were still occurring.
    Exhausted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Shock => "shock",
            EventKind::Default => "default",
            EventKind::Converged => "converged",
            EventKind::Exhausted => "exhausted",
        };
        f.pad(name)
    }
}

/// One entry of the time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_index: Option<usize>,
}

impl CascadeEvent {
    pub fn default_of(kind: EventKind, bank: usize) -> Self {
        Self {
            kind,
            bank_index: Some(bank),
        }
    }

    pub fn marker(kind: EventKind) -> Self {
        Self {
            kind,
            bank_index: None,
        }
    }
}

/// Append-only log of cascade events, grouped by step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries {
    steps: BTreeMap<usize, Vec<CascadeEvent>>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the events of step `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not later than every step already recorded.
    pub fn append(&mut self, t: usize, events: Vec<CascadeEvent>) {
        if let Some(last) = self.last_step() {
            assert!(t > last, "time series is append-only: step {} after {}", t, last);
        }
        self.steps.insert(t, events);
    }

    pub fn at(&self, t: usize) -> Option<&[CascadeEvent]> {
        self.steps.get(&t).map(Vec::as_slice)
    }

    pub fn last_step(&self) -> Option<usize> {
        self.steps.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[CascadeEvent])> {
        self.steps.iter().map(|(t, events)| (*t, events.as_slice()))
    }
}
