//! Tabular step parameter.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use stepwire_protocol::{ProtoTable, ProtoTableRow};

/// A table of string cells with fixed column headers.
///
/// Rows can only be appended, and each must have one cell per header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Unchecked serde form of [`Table`].
#[derive(Deserialize)]
struct RawTable {
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = CoreError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let mut table = Table::new(raw.headers);
        for row in raw.rows {
            table.add_row(row)?;
        }
        Ok(table)
    }
}

impl Table {
    /// Creates an empty table with the given column headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn add_row<I, S>(&mut self, cells: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row.len() != self.headers.len() {
            return Err(CoreError::RowLength {
                expected: self.headers.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the cells of the named column, top to bottom.
    pub fn column_values(&self, header: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == header)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.get(index).map(String::as_str))
                .collect(),
        )
    }

    /// Number of rows (headers excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<ProtoTable> for Table {
    type Error = CoreError;

    fn try_from(proto: ProtoTable) -> Result<Self, Self::Error> {
        let headers = proto.headers.map(|row| row.cells).unwrap_or_default();
        let mut table = Table::new(headers);
        for row in proto.rows {
            table.add_row(row.cells)?;
        }
        Ok(table)
    }
}

impl From<&Table> for ProtoTable {
    fn from(table: &Table) -> Self {
        ProtoTable {
            headers: Some(ProtoTableRow {
                cells: table.headers.clone(),
            }),
            rows: table
                .rows
                .iter()
                .map(|cells| ProtoTableRow {
                    cells: cells.clone(),
                })
                .collect(),
        }
    }
}
