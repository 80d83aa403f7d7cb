//! Tabular input: the cell-reading contract and an in-memory string frame.

/// Read access to a table of optional string cells.
///
/// `None` is the absence marker; encoders treat it as text with no tokens.
/// Implementations are shared across worker threads during build and apply.
pub trait CellSource: Sync {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    /// Cell at `(row, column)`, both zero-based.
    fn cell_str(&self, row: usize, column: usize) -> Option<&str>;
}

/// Column-major table of `Option<String>` cells.
///
/// Used both as an encoder input and as the metadata table that persists
/// token dictionaries (one column per encoder, one row per token).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringFrame {
    columns: Vec<Vec<Option<String>>>,
    rows: usize,
}

impl StringFrame {
    /// Empty frame with `num_columns` columns and no rows.
    #[must_use]
    pub fn new(num_columns: usize) -> Self {
        Self {
            columns: vec![Vec::new(); num_columns],
            rows: 0,
        }
    }

    /// Single-column frame where every value is present.
    #[must_use]
    pub fn from_column<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let column: Vec<Option<String>> = values.into_iter().map(|v| Some(v.into())).collect();
        Self {
            rows: column.len(),
            columns: vec![column],
        }
    }

    /// Build from rows; short rows are padded with absent cells.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut frame = Self::new(width);
        for row in rows {
            frame.push_row(row);
        }
        frame
    }

    /// Append a row, padding or widening as needed.
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        if row.len() > self.columns.len() {
            self.columns.resize(row.len(), vec![None; self.rows]);
        }
        let mut cells = row.into_iter();
        for column in &mut self.columns {
            column.push(cells.next().flatten());
        }
        self.rows += 1;
    }

    /// Grow to at least `rows` rows with absent cells.
    pub fn ensure_rows(&mut self, rows: usize) {
        if rows > self.rows {
            for column in &mut self.columns {
                column.resize(rows, None);
            }
            self.rows = rows;
        }
    }

    /// Set a cell, growing rows and columns as needed.
    pub fn set(&mut self, row: usize, column: usize, value: Option<String>) {
        if column >= self.columns.len() {
            self.columns.resize(column + 1, vec![None; self.rows]);
        }
        self.ensure_rows(row + 1);
        self.columns[column][row] = value;
    }

    /// Iterate the cells of one column (empty for an unknown column).
    pub fn column(&self, column: usize) -> impl Iterator<Item = Option<&str>> {
        self.columns
            .get(column)
            .into_iter()
            .flat_map(|c| c.iter().map(Option::as_deref))
    }
}

impl CellSource for StringFrame {
    fn num_rows(&self) -> usize {
        self.rows
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn cell_str(&self, row: usize, column: usize) -> Option<&str> {
        self.columns.get(column)?.get(row)?.as_deref()
    }
}
