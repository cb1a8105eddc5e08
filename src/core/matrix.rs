use crate::core::error::ContagionError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read/write contract shared by the claims ledger and the leverage ledger.
///
/// Both are fixed-size `n x n` tables of [`Decimal`] addressed by bank
/// index. Every access is bounds-checked against `size()`.
pub trait MatrixAccess {
    /// Number of banks. Constant for the lifetime of the matrix.
    fn size(&self) -> usize;

    /// Value at `(row, col)`.
    fn get(&self, row: usize, col: usize) -> Result<Decimal, ContagionError>;

    /// Overwrite the value at `(row, col)`.
    fn set(&mut self, row: usize, col: usize, value: Decimal) -> Result<(), ContagionError>;
}

/// Dense, row-major square matrix with a size fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Decimal>>", into = "Vec<Vec<Decimal>>")]
pub struct SquareMatrix {
    n: usize,
    cells: Vec<Decimal>,
}

impl SquareMatrix {
    /// An `n x n` matrix of zeros.
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            cells: vec![Decimal::ZERO; n * n],
        }
    }

    /// Build an `n x n` matrix from a cell function of `(row, col)`.
    pub fn from_fn(n: usize, mut cell: impl FnMut(usize, usize) -> Decimal) -> Self {
        let mut cells = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                cells.push(cell(row, col));
            }
        }
        Self { n, cells }
    }

    /// Build from nested rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<Decimal>>) -> Result<Self, ContagionError> {
        let n = rows.len();
        if n == 0 {
            return Err(ContagionError::EmptyNetwork);
        }
        let mut cells = Vec::with_capacity(n * n);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != n {
                return Err(ContagionError::NonSquareMatrix {
                    row,
                    expected: n,
                    actual: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Self { n, cells })
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Decimal, ContagionError> {
        self.offset(row, col).map(|idx| self.cells[idx])
    }

    pub fn set(&mut self, row: usize, col: usize, value: Decimal) -> Result<(), ContagionError> {
        let idx = self.offset(row, col)?;
        self.cells[idx] = value;
        Ok(())
    }

    /// Entries of `row`, in column order.
    ///
    /// # Panics
    ///
    /// Panics if `row >= size()`.
    pub fn row(&self, row: usize) -> &[Decimal] {
        assert!(row < self.n, "row {} out of range for size {}", row, self.n);
        &self.cells[row * self.n..(row + 1) * self.n]
    }

    /// Entries of `col`, in row order.
    ///
    /// # Panics
    ///
    /// Panics if `col >= size()`.
    pub fn column(&self, col: usize) -> impl Iterator<Item = Decimal> + '_ {
        assert!(col < self.n, "column {} out of range for size {}", col, self.n);
        self.cells.iter().skip(col).step_by(self.n).copied()
    }

    /// Nested-row copy of the matrix.
    pub fn to_rows(&self) -> Vec<Vec<Decimal>> {
        if self.n == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.n).map(|r| r.to_vec()).collect()
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize, ContagionError> {
        if row >= self.n || col >= self.n {
            return Err(ContagionError::IndexOutOfBounds {
                row,
                col,
                size: self.n,
            });
        }
        Ok(row * self.n + col)
    }
}

impl TryFrom<Vec<Vec<Decimal>>> for SquareMatrix {
    type Error = ContagionError;

    fn try_from(rows: Vec<Vec<Decimal>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<SquareMatrix> for Vec<Vec<Decimal>> {
    fn from(matrix: SquareMatrix) -> Self {
        matrix.to_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zeros() {
        let m = SquareMatrix::zeros(3);
        assert_eq!(m.size(), 3);
        assert_eq!(m.get(2, 2).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_from_fn() {
        let m = SquareMatrix::from_fn(2, |r, c| Decimal::from(r * 10 + c));
        assert_eq!(m.get(1, 0).unwrap(), dec!(10));
        assert_eq!(m.get(0, 1).unwrap(), dec!(1));
    }

    #[test]
    fn test_from_rows_row_major() {
        let m = SquareMatrix::from_rows(vec![vec![dec!(1), dec!(2)], vec![dec!(3), dec!(4)]])
            .unwrap();
        assert_eq!(m.get(0, 1).unwrap(), dec!(2));
        assert_eq!(m.get(1, 0).unwrap(), dec!(3));
        assert_eq!(m.row(1), &[dec!(3), dec!(4)]);
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![dec!(2), dec!(4)]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = SquareMatrix::from_rows(vec![vec![dec!(1), dec!(2)], vec![dec!(3)]])
            .unwrap_err();
        assert!(matches!(
            err,
            ContagionError::NonSquareMatrix {
                row: 1,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let err = SquareMatrix::from_rows(Vec::new()).unwrap_err();
        assert!(matches!(err, ContagionError::EmptyNetwork));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut m = SquareMatrix::zeros(2);
        assert!(m.get(2, 0).unwrap_err().is_index());
        assert!(m.get(0, 2).unwrap_err().is_index());
        assert!(m.set(5, 5, dec!(1)).unwrap_err().is_index());
        // A failed set leaves the matrix untouched.
        assert_eq!(m, SquareMatrix::zeros(2));
    }

    #[test]
    fn test_serde_as_rows() {
        let m = SquareMatrix::from_rows(vec![vec![dec!(0), dec!(6)], vec![dec!(0), dec!(0)]])
            .unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: SquareMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let ragged: Result<SquareMatrix, _> = serde_json::from_str(r#"[["1","2"],["3"]]"#);
        assert!(ragged.is_err());
    }
}
