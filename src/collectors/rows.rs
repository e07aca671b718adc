//! Name-addressed result sets.
//!
//! Odyssey reorders and adds columns between releases, so steps never rely on
//! positions. A step resolves the names it needs once per result set and then
//! reads each row through those indices.

use crate::collectors::value::CellValue;
use anyhow::{Result, anyhow};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row};

static NULL: CellValue = CellValue::Null;

/// One decoded console response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, builder style.
    #[must_use]
    pub fn with_row<I, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Decode rows returned by the simple-query protocol.
    ///
    /// Column names come from the first row; an empty response has none.
    ///
    /// # Errors
    ///
    /// Returns an error if any cell can't be decoded.
    pub fn from_pg_rows(pg_rows: &[PgRow]) -> Result<Self> {
        let columns: Vec<String> = pg_rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in pg_rows {
            let mut cells = Vec::with_capacity(columns.len());
            for column in pg_row.columns() {
                let raw = pg_row.try_get_raw(column.ordinal())?;
                cells.push(CellValue::from_pg(column.name(), raw)?);
            }
            rows.push(cells);
        }

        Ok(Self { columns, rows })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Resolve required columns by name, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `unexpected <step> output format` naming the first missing
    /// column.
    pub fn resolve<const N: usize>(&self, step: &str, required: [&str; N]) -> Result<[usize; N]> {
        let mut positions = [0; N];
        for (slot, name) in positions.iter_mut().zip(required) {
            *slot = self.position(name).ok_or_else(|| {
                anyhow!("unexpected {step} output format: missing column {name:?}")
            })?;
        }
        Ok(positions)
    }
}

/// Cell at `index`, or null when the row is shorter than the header.
#[must_use]
pub fn cell(row: &[CellValue], index: usize) -> &CellValue {
    row.get(index).unwrap_or(&NULL)
}

/// Optional column: null when the column was not resolved.
#[must_use]
pub fn opt_cell(row: &[CellValue], index: Option<usize>) -> &CellValue {
    index.map_or(&NULL, |index| cell(row, index))
}
