//! In-memory column-major table

use super::{RowSink, SinkOutput};
use crate::domain::{FlatError, Result, Row};

/// Column-major table of optional strings
///
/// Every column holds the same number of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Creates an empty table with the given column names
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            columns: vec![Vec::new(); names.len()],
        }
    }

    /// Appends one row
    ///
    /// # Errors
    ///
    /// Returns `FlatError::Output` if the row width differs from the table's
    pub fn push_row(&mut self, row: &Row) -> Result<()> {
        if row.len() != self.names.len() {
            return Err(FlatError::Output(format!(
                "row has {} values, table has {} columns",
                row.len(),
                self.names.len()
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(row.values()) {
            column.push(value.clone());
        }
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Values of a column by name
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        let index = self.names.iter().position(|n| n == name)?;
        Some(&self.columns[index])
    }

    /// `(name, values)` pairs in column order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<String>])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Reassembles one row
    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.num_rows() {
            return None;
        }
        Some(Row::new(
            self.columns.iter().map(|c| c[index].clone()).collect(),
        ))
    }
}

/// Accumulates rows into a [`Table`] returned by `finish`
#[derive(Debug, Default)]
pub struct TableSink {
    table: Table,
}

impl TableSink {
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            table: Table::new(header),
        }
    }

    /// Consumes the sink and returns the accumulated table
    pub fn into_table(self) -> Table {
        self.table
    }
}

impl RowSink for TableSink {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        self.table.push_row(row)
    }

    fn rows_written(&self) -> usize {
        self.table.num_rows()
    }

    fn finish(self: Box<Self>) -> Result<SinkOutput> {
        Ok(SinkOutput::Table(self.into_table()))
    }
}
