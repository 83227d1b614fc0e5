//! Cell access on an owned query result.
//!
//! Every [`OutputParameter`] handed out here borrows the [`ResultClear`]
//! guard, so the native result cannot be cleared while one is alive.
#![allow(unsafe_code)]

use crate::extract::field_type_for_oid;
use crate::guard::ResultClear;
use crate::native::ClientLibrary;
use crate::output::{OutputParameter, OutputParameterVector};

impl<L: ClientLibrary> ResultClear<L> {
    /// Number of rows; zero once released.
    #[must_use]
    pub fn row_count(&self) -> usize {
        // SAFETY: the guard keeps the result alive for this call.
        self.as_ptr().map_or(0, |result| unsafe { L::row_count(result) })
    }

    /// Number of columns; zero once released.
    #[must_use]
    pub fn column_count(&self) -> usize {
        // SAFETY: as above.
        self.as_ptr().map_or(0, |result| unsafe { L::column_count(result) })
    }

    /// Column names, with an empty string for a column the library could not name.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        let Some(result) = self.as_ptr() else {
            return Vec::new();
        };
        (0..self.column_count())
            // SAFETY: as above, and `column` is in range.
            .map(|column| unsafe { L::column_name(result, column) }.unwrap_or_default())
            .collect()
    }

    /// The cell at (`row`, `column`), or `None` if out of range.
    #[must_use]
    pub fn output_parameter(&self, row: usize, column: usize) -> Option<OutputParameter<'_>> {
        let result = self.as_ptr()?;
        if row >= self.row_count() || column >= self.column_count() {
            return None;
        }
        // SAFETY: indices are in range and the returned slice borrows `self`,
        // which owns the result buffer.
        let (oid, data) = unsafe { (L::column_type(result, column), L::cell(result, row, column)) };
        Some(OutputParameter::new(
            field_type_for_oid(oid),
            oid,
            row,
            data,
            data.is_none(),
        ))
    }

    /// Every cell, row by row.
    #[must_use]
    pub fn output_parameters(&self) -> OutputParameterVector<'_> {
        let rows = self.row_count();
        let columns = self.column_count();
        tracing::debug!(rows, columns, "walking result cells");

        let mut cells = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for column in 0..columns {
                if let Some(cell) = self.output_parameter(row, column) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}
