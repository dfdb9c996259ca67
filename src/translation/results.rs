use crate::utils::{CsvTranslatorError, Result};
use std::collections::BTreeMap;

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Translated {
        text: String,
        attempts: u32,
        tokens: Option<u64>,
    },
    /// Served from translation memory without a request.
    Reused { text: String },
    /// Empty cell; nothing to translate.
    Unchanged,
    /// Outside the requested row range.
    Skipped,
    Failed { reason: String, attempts: u32 },
    /// Never started because the run was cancelled.
    Cancelled,
}

impl RowOutcome {
    pub fn translated_text(&self) -> Option<&str> {
        match self {
            RowOutcome::Translated { text, .. } | RowOutcome::Reused { text } => Some(text),
            _ => None,
        }
    }
}

/// Outcomes keyed by original row position, filled in any order.
#[derive(Debug)]
pub struct RowResults {
    slots: BTreeMap<usize, RowOutcome>,
    total: usize,
}

impl RowResults {
    pub fn new(total: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            total,
        }
    }

    /// Each row may be recorded exactly once.
    pub fn record(&mut self, row: usize, outcome: RowOutcome) -> Result<()> {
        if row >= self.total {
            return Err(CsvTranslatorError::ValidationError(format!(
                "row {} is out of range for {} rows",
                row, self.total
            )));
        }
        if self.slots.contains_key(&row) {
            return Err(CsvTranslatorError::ValidationError(format!(
                "row {} recorded twice",
                row
            )));
        }
        self.slots.insert(row, outcome);
        Ok(())
    }

    pub fn recorded(&self) -> usize {
        self.slots.len()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.len() == self.total
    }

    pub fn missing(&self) -> Vec<usize> {
        (0..self.total)
            .filter(|row| !self.slots.contains_key(row))
            .collect()
    }

    /// Outcomes in row order. Fails unless every row was recorded.
    pub fn into_ordered(self) -> Result<Vec<RowOutcome>> {
        if !self.is_complete() {
            return Err(CsvTranslatorError::ValidationError(format!(
                "{} of {} rows have no result (first missing: {:?})",
                self.total - self.slots.len(),
                self.total,
                self.missing().first()
            )));
        }
        Ok(self.slots.into_values().collect())
    }
}
