use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Banks that have defaulted so far.
///
/// Default is irreversible, so the set only ever grows: there is no way to
/// remove a bank once inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultSet {
    banks: BTreeSet<usize>,
}

impl DefaultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a default. Returns `false` if `bank` had already defaulted.
    pub fn insert(&mut self, bank: usize) -> bool {
        self.banks.insert(bank)
    }

    pub fn contains(&self, bank: usize) -> bool {
        self.banks.contains(&bank)
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Defaulted banks in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.banks.iter().copied()
    }

    pub fn is_subset(&self, other: &DefaultSet) -> bool {
        self.banks.is_subset(&other.banks)
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl Extend<usize> for DefaultSet {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        self.banks.extend(iter);
    }
}

impl FromIterator<usize> for DefaultSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self {
            banks: iter.into_iter().collect(),
        }
    }
}
