//! Append-only constraint matrix, stored row-wise in compressed sparse form.

/// Constraint rows of a model, each with its own lower and upper bound.
///
/// Rows are only ever appended. Row `i` owns the entries
/// `row_starts[i]..row_starts[i + 1]` of `indices` and `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatrix {
    column_count: usize,
    row_starts: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
}

/// A borrowed row of a [RowMatrix]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    /// Column indices of the stored coefficients
    pub indices: &'a [usize],
    /// Coefficients, parallel to `indices`
    pub values: &'a [f64],
    /// Lower bound of the row activity
    pub lower: f64,
    /// Upper bound of the row activity
    pub upper: f64,
}

impl<'a> Row<'a> {
    /// `(column, coefficient)` pairs of this row
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

impl RowMatrix {
    /// An empty matrix over `column_count` columns
    pub fn new(column_count: usize) -> RowMatrix {
        RowMatrix {
            column_count,
            row_starts: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
            row_lower: Vec::new(),
            row_upper: Vec::new(),
        }
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of rows appended so far
    pub fn row_count(&self) -> usize {
        self.row_lower.len()
    }

    /// Number of stored coefficients
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Append a row touching only `indices`.
    ///
    /// # Panics
    /// If `values` and `indices` differ in length, or an index is not a column.
    ///
    /// ```
    /// use lp_model::matrix::RowMatrix;
    ///
    /// let mut m = RowMatrix::new(3);
    /// m.push_row(&[1.0, -2.0], &[0, 2], f64::NEG_INFINITY, 4.0);
    /// assert_eq!(m.row_count(), 1);
    /// assert_eq!(m.row(0).indices, &[0, 2]);
    /// ```
    pub fn push_row(&mut self, values: &[f64], indices: &[usize], lower: f64, upper: f64) {
        assert_eq!(
            values.len(),
            indices.len(),
            "row has {} values but {} indices",
            values.len(),
            indices.len()
        );
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.column_count) {
            panic!(
                "column index {} out of bounds (column_count = {})",
                bad, self.column_count
            );
        }
        self.indices.extend_from_slice(indices);
        self.values.extend_from_slice(values);
        self.row_starts.push(self.values.len());
        self.row_lower.push(lower);
        self.row_upper.push(upper);
    }

    /// The `i`-th row
    ///
    /// # Panics
    /// If `i >= self.row_count()`
    pub fn row(&self, i: usize) -> Row<'_> {
        let range = self.row_starts[i]..self.row_starts[i + 1];
        Row {
            indices: &self.indices[range.clone()],
            values: &self.values[range],
            lower: self.row_lower[i],
            upper: self.row_upper[i],
        }
    }

    /// All rows, in insertion order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> + '_ {
        (0..self.row_count()).map(move |i| self.row(i))
    }

    /// Offsets of each row into [RowMatrix::indices], plus a final end offset
    pub fn row_starts(&self) -> &[usize] {
        &self.row_starts
    }

    /// Column indices of all rows, concatenated
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Coefficients of all rows, concatenated
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Lower bound of every row
    pub fn row_lower(&self) -> &[f64] {
        &self.row_lower
    }

    /// Upper bound of every row
    pub fn row_upper(&self) -> &[f64] {
        &self.row_upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_keep_their_own_entries() {
        let mut m = RowMatrix::new(4);
        m.push_row(&[1.0, 2.0, 3.0, 4.0], &[0, 1, 2, 3], 0.0, 10.0);
        m.push_row(&[], &[], 1.0, 1.0);
        m.push_row(&[5.0], &[3], f64::NEG_INFINITY, 2.0);

        assert_eq!(m.row_count(), 3);
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.row_starts(), &[0, 4, 4, 5]);

        let empty = m.row(1);
        assert!(empty.indices.is_empty());
        assert_eq!((empty.lower, empty.upper), (1.0, 1.0));

        let last: Vec<_> = m.row(2).entries().collect();
        assert_eq!(last, vec![(3, 5.0)]);
        assert_eq!(m.rows().len(), 3);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_past_last_column() {
        RowMatrix::new(2).push_row(&[1.0], &[2], 0.0, 1.0);
    }

    #[test]
    #[should_panic(expected = "2 values but 1 indices")]
    fn mismatched_lengths() {
        RowMatrix::new(2).push_row(&[1.0, 2.0], &[0], 0.0, 1.0);
    }
}
