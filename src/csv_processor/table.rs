use crate::utils::{CsvTranslatorError, Result};
use std::collections::HashSet;

/// One record. Values are stored in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Rows with a fixed, validated column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        if headers.is_empty() {
            return Err(CsvTranslatorError::ValidationError(
                "table has no header row".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                return Err(CsvTranslatorError::ValidationError(format!(
                    "header {} is empty",
                    i + 1
                )));
            }
            if !seen.insert(header.as_str()) {
                return Err(CsvTranslatorError::ValidationError(format!(
                    "duplicate column name '{}'",
                    header
                )));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.values.len() != headers.len() {
                return Err(CsvTranslatorError::ValidationError(format!(
                    "row {} has {} fields, expected {}",
                    i + 1,
                    row.values.len(),
                    headers.len()
                )));
            }
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| CsvTranslatorError::ColumnNotFound {
                column: column.to_string(),
                available: self.headers.join(", "),
            })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(index)
    }

    /// Returns the index of `column`, appending it with `fill` in every row
    /// when it does not exist yet.
    pub fn ensure_column(&mut self, column: &str, fill: &str) -> usize {
        if let Some(index) = self.headers.iter().position(|h| h == column) {
            return index;
        }
        self.headers.push(column.to_string());
        for row in &mut self.rows {
            row.values.push(fill.to_string());
        }
        self.headers.len() - 1
    }

    pub fn set(&mut self, row: usize, column: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.values.get_mut(column)) {
            *cell = value;
        }
    }
}
