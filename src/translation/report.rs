use crate::translation::results::RowOutcome;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRow {
    /// 0-based, header excluded.
    pub row_index: usize,
    pub column: String,
    pub original_content: String,
    pub error: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub total_rows: usize,
    pub translated: usize,
    pub reused: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub total_tokens: u64,
    pub requests: u64,
    pub elapsed_ms: u64,
    pub failed_rows: Vec<FailedRow>,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>, total_rows: usize) -> Self {
        Self {
            run_id: run_id.into(),
            total_rows,
            ..Default::default()
        }
    }

    /// Tallies one row. `requests` is per distinct text and is set by the
    /// caller, since rows sharing a text share its attempts.
    pub fn count(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Translated { tokens, .. } => {
                self.translated += 1;
                self.total_tokens += tokens.unwrap_or(0);
            }
            RowOutcome::Reused { .. } => self.reused += 1,
            RowOutcome::Unchanged => self.unchanged += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Cancelled => self.cancelled += 1,
            // Listed through `failed_rows`.
            RowOutcome::Failed { .. } => {}
        }
    }

    pub fn failed(&self) -> usize {
        self.failed_rows.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_rows.is_empty()
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Translation complete ({})", self.run_id)?;
        writeln!(f, "  Total rows:        {}", self.total_rows)?;
        writeln!(f, "  Translated:        {}", self.translated)?;
        writeln!(f, "  Reused:            {}", self.reused)?;
        writeln!(f, "  Empty:             {}", self.unchanged)?;
        writeln!(f, "  Outside range:     {}", self.skipped)?;
        writeln!(f, "  Cancelled:         {}", self.cancelled)?;
        writeln!(f, "  Failed:            {}", self.failed())?;
        writeln!(f, "  API requests:      {}", self.requests)?;
        write!(f, "  Total token usage: {}", self.total_tokens)?;

        if self.has_failures() {
            writeln!(f)?;
            write!(f, "Failed rows:")?;
            for row in &self.failed_rows {
                write!(
                    f,
                    "\n  row {} ({} attempt{}): {}",
                    row.row_index,
                    row.attempts,
                    if row.attempts == 1 { "" } else { "s" },
                    row.error
                )?;
            }
        }
        Ok(())
    }
}

pub fn write_failed_rows(path: impl AsRef<Path>, failed: &[FailedRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_vec_pretty(failed)?;
    std::fs::write(path, json)?;
    Ok(())
}
