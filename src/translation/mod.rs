pub mod cancel;
pub mod client;
pub mod memory;
pub mod prompt;
pub mod rate_limit;
pub mod report;
pub mod results;
pub mod retry;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{GeminiClient, Translation, TranslationRequest, Translator};
pub use memory::{load_previous_translations, TranslationMemory};
pub use rate_limit::RateLimiter;
pub use report::{write_failed_rows, FailedRow, RunSummary};
pub use results::{RowOutcome, RowResults};
pub use retry::{Attempted, RetryPolicy};

use crate::csv_processor::Table;
use crate::utils::{sanitize_cell, Result, TranslateError, TranslationJobConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of one driver run.
#[derive(Debug)]
pub struct TranslationOutput {
    pub table: Table,
    pub summary: RunSummary,
    /// Index of the column that received translations in `table`.
    pub output_column_index: usize,
}

/// Distinct source text awaiting translation and the rows that hold it.
struct PendingText {
    text: String,
    rows: Vec<usize>,
}

/// Translates one column of a table row by row.
///
/// Requests go through a bounded worker pool; results are indexed back by
/// row position, so the output keeps the input order whatever the
/// completion order. Rows sharing the same source text cost one request.
/// Successful translations are kept in the translator's memory, so a later
/// run on the same `BatchTranslator` does not pay for them again.
pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    job: TranslationJobConfig,
    memory: TranslationMemory,
}

impl BatchTranslator {
    pub fn new(translator: Arc<dyn Translator>, job: TranslationJobConfig) -> Self {
        Self {
            translator,
            job,
            memory: TranslationMemory::default(),
        }
    }

    /// Rows whose source text is already in `memory` are not sent.
    pub fn with_memory(mut self, memory: TranslationMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn job(&self) -> &TranslationJobConfig {
        &self.job
    }

    /// Fails on anything that would make the run pointless before a single
    /// request is sent. Returns the source column index.
    pub fn validate_against(&self, table: &Table) -> Result<usize> {
        self.job.validate()?;
        let source_idx = table.column_index(&self.job.column)?;
        self.job.row_range(table.len())?;
        Ok(source_idx)
    }

    pub async fn run(&self, table: &Table, cancel: &CancelSignal) -> Result<TranslationOutput> {
        let source_idx = self.validate_against(table)?;
        let range = self.job.row_range(table.len())?;
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let mut results = RowResults::new(table.len());
        let mut pending: Vec<PendingText> = Vec::new();
        let mut pending_by_text: HashMap<&str, usize> = HashMap::new();
        let mut from_memory = 0usize;

        for (index, row) in table.rows().iter().enumerate() {
            let text = row.get(source_idx).unwrap_or_default();

            if !range.contains(&index) {
                // A separate output column still receives known translations,
                // so a resumed run over a narrower range keeps earlier work.
                let known = match &self.job.output_column {
                    Some(_) if !text.trim().is_empty() => self.memory.get(text).await,
                    _ => None,
                };
                let outcome = match known {
                    Some(previous) => {
                        from_memory += 1;
                        RowOutcome::Reused { text: previous }
                    }
                    None => RowOutcome::Skipped,
                };
                results.record(index, outcome)?;
                continue;
            }

            if text.trim().is_empty() {
                results.record(index, RowOutcome::Unchanged)?;
                continue;
            }

            if let Some(previous) = self.memory.get(text).await {
                from_memory += 1;
                results.record(index, RowOutcome::Reused { text: previous })?;
                continue;
            }

            match pending_by_text.get(text) {
                Some(&slot) => pending[slot].rows.push(index),
                None => {
                    pending_by_text.insert(text, pending.len());
                    pending.push(PendingText {
                        text: text.to_string(),
                        rows: vec![index],
                    });
                }
            }
        }

        let memory_entries = self.memory.len().await;
        info!(
            run_id = %run_id,
            total_rows = table.len(),
            start_row = range.start,
            end_row = range.end,
            requests_needed = pending.len(),
            from_memory = from_memory,
            memory_entries = memory_entries,
            concurrency = self.job.max_concurrent_requests,
            "Starting translation run"
        );

        let limiter = RateLimiter::new(
            self.job.max_concurrent_requests,
            self.job.requests_per_minute,
        );
        let policy = RetryPolicy::new(self.job.max_attempts, self.job.base_delay, self.job.max_delay);
        let completed = Arc::new(AtomicUsize::new(0));
        let total_requests = pending.len();

        let mut handles: Vec<(usize, JoinHandle<Attempted<Translation>>)> =
            Vec::with_capacity(pending.len());

        for (slot, item) in pending.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = limiter.acquire() => permit.ok(),
            };
            let Some(permit) = permit else {
                warn!(
                    run_id = %run_id,
                    not_started = pending.len() - slot,
                    "Run cancelled, no further requests will be issued"
                );
                break;
            };

            let request = TranslationRequest {
                text: item.text.clone(),
                source_lang: self.job.source_lang.clone(),
                target_lang: self.job.target_lang.clone(),
            };
            let first_row = item.rows[0];
            let row_count = item.rows.len();
            let translator = Arc::clone(&self.translator);
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            let completed = Arc::clone(&completed);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let attempted = policy
                    .execute(&cancel, |attempt| {
                        let translator = Arc::clone(&translator);
                        let limiter = limiter.clone();
                        let cancel = cancel.clone();
                        let request = request.clone();
                        async move {
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => return Err(TranslateError::Cancelled),
                                _ = limiter.wait_turn() => {}
                            }
                            debug!(row = first_row, attempt = attempt, "Sending translation request");
                            translator.translate(&request).await
                        }
                    })
                    .await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                match &attempted.result {
                    Ok(translation) => info!(
                        row = first_row,
                        rows = row_count,
                        attempts = attempted.attempts,
                        tokens = translation.tokens.unwrap_or(0),
                        progress = %format!("{}/{}", done, total_requests),
                        "Row translated"
                    ),
                    Err(TranslateError::Cancelled) if attempted.attempts == 0 => {
                        debug!(row = first_row, "Row cancelled before its first request")
                    }
                    Err(e) => error!(
                        row = first_row,
                        rows = row_count,
                        attempts = attempted.attempts,
                        error = %e,
                        progress = %format!("{}/{}", done, total_requests),
                        "Row translation failed"
                    ),
                }
                attempted
            });

            handles.push((slot, handle));
        }

        let started_count = handles.len();
        let mut requests = 0u64;
        for (slot, handle) in handles {
            let attempted = match handle.await {
                Ok(attempted) => attempted,
                Err(e) => Attempted {
                    result: Err(TranslateError::Internal(format!(
                        "translation task failed: {}",
                        e
                    ))),
                    attempts: 0,
                },
            };
            requests += u64::from(attempted.attempts);
            self.record_outcome(&mut results, &pending[slot], attempted)
                .await?;
        }

        for item in &pending[started_count..] {
            for &row in &item.rows {
                results.record(row, RowOutcome::Cancelled)?;
            }
        }

        let outcomes = results.into_ordered()?;

        let mut output = table.clone();
        let output_column_index = match &self.job.output_column {
            Some(name) => output.ensure_column(name, ""),
            None => source_idx,
        };

        let mut summary = RunSummary::new(run_id, table.len());
        for (index, outcome) in outcomes.iter().enumerate() {
            summary.count(outcome);
            // Only cells this run wrote are neutralized; everything else keeps
            // its input value.
            if let Some(text) = outcome.translated_text() {
                output.set(index, output_column_index, sanitize_cell(text));
            }
            if let RowOutcome::Failed { reason, attempts } = outcome {
                summary.failed_rows.push(FailedRow {
                    row_index: index,
                    column: self.job.column.clone(),
                    original_content: table.rows()[index]
                        .get(source_idx)
                        .unwrap_or_default()
                        .to_string(),
                    error: reason.clone(),
                    attempts: *attempts,
                });
            }
        }
        summary.requests = requests;
        summary.set_elapsed(started.elapsed());

        info!(
            run_id = %summary.run_id,
            translated = summary.translated,
            reused = summary.reused,
            failed = summary.failed(),
            requests = summary.requests,
            cancelled = summary.cancelled,
            total_tokens = summary.total_tokens,
            elapsed_ms = summary.elapsed_ms,
            "Translation run finished"
        );

        Ok(TranslationOutput {
            table: output,
            summary,
            output_column_index,
        })
    }

    async fn record_outcome(
        &self,
        results: &mut RowResults,
        item: &PendingText,
        attempted: Attempted<Translation>,
    ) -> Result<()> {
        let attempts = attempted.attempts;
        match attempted.result {
            Ok(translation) => {
                self.memory
                    .insert(item.text.clone(), translation.text.clone())
                    .await;

                // The first row pays for the request; duplicates reuse it.
                for (i, &row) in item.rows.iter().enumerate() {
                    let outcome = if i == 0 {
                        RowOutcome::Translated {
                            text: translation.text.clone(),
                            attempts,
                            tokens: translation.tokens,
                        }
                    } else {
                        RowOutcome::Reused {
                            text: translation.text.clone(),
                        }
                    };
                    results.record(row, outcome)?;
                }
            }
            Err(TranslateError::Cancelled) if attempts == 0 => {
                for &row in &item.rows {
                    results.record(row, RowOutcome::Cancelled)?;
                }
            }
            Err(e) => {
                let reason = match &e {
                    TranslateError::Cancelled => {
                        format!("cancelled while retrying after {} attempts", attempts)
                    }
                    e if e.is_transient() => {
                        format!("{} (gave up after {} attempts)", e, attempts)
                    }
                    e => e.to_string(),
                };
                for &row in &item.rows {
                    results.record(
                        row,
                        RowOutcome::Failed {
                            reason: reason.clone(),
                            attempts,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }
}
