use crate::csv_processor::{parse_delimiter, write_table, CsvTableReader};
use crate::translation::{
    load_previous_translations, write_failed_rows, BatchTranslator, CancelSignal, RunSummary,
    TranslationMemory, Translator,
};
use crate::utils::{AppConfig, CsvTranslatorError, Result, TranslationJobConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Translate one column of a CSV file with the Gemini API.
#[derive(Debug, Clone, Parser)]
#[command(name = "csv-column-translator", version, about)]
pub struct Cli {
    /// Input CSV file (first row is the header)
    pub input: String,

    /// Output CSV file
    pub output: String,

    /// Column whose values are translated
    #[arg(short, long)]
    pub column: String,

    /// Target language, e.g. "French" or "fr"
    #[arg(short, long)]
    pub target: String,

    /// Source language; detected by the model when omitted
    #[arg(short, long)]
    pub source: Option<String>,

    /// Write translations to this column (appended if new) instead of
    /// replacing the source column
    #[arg(long)]
    pub output_column: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, default_value = "translator.toml")]
    pub config: String,

    /// First row to translate (0-based, inclusive)
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Row to stop before (0-based, exclusive)
    #[arg(long)]
    pub end: Option<usize>,

    /// Reuse translations already present in the output file
    #[arg(long, requires = "output_column")]
    pub resume: bool,

    /// Maximum rows translated concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Upper bound on requests started per minute
    #[arg(long)]
    pub requests_per_minute: Option<u32>,

    /// Attempts per row before giving up on transient errors
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Stop issuing requests after this many seconds and write what finished
    #[arg(long)]
    pub run_timeout: Option<u64>,

    /// Field delimiter; use '\t' for tab-separated files
    #[arg(long, default_value = ",")]
    pub delimiter: String,

    /// Where to write the JSON list of failed rows
    #[arg(long)]
    pub failed_rows: Option<PathBuf>,

    /// Model name, overriding the config file
    #[arg(long)]
    pub model: Option<String>,
}

impl Cli {
    /// Merges CLI flags over the config file's translation defaults.
    pub fn job_config(&self, config: &AppConfig) -> TranslationJobConfig {
        let mut job = TranslationJobConfig::new(&self.column, &self.target)
            .with_defaults(&config.translation);

        job.source_lang = self.source.clone();
        job.output_column = self.output_column.clone();
        job.start_row = self.start;
        job.end_row = self.end;
        if let Some(concurrency) = self.concurrency {
            job.max_concurrent_requests = concurrency;
        }
        if let Some(rpm) = self.requests_per_minute {
            job.requests_per_minute = Some(rpm);
        }
        if let Some(attempts) = self.max_attempts {
            job.max_attempts = attempts;
        }
        job
    }

    pub fn api_config(&self, config: &AppConfig) -> crate::utils::config::ApiConfig {
        let mut api = config.api.clone();
        if let Some(model) = &self.model {
            api.model = model.clone();
        }
        api
    }

    pub fn api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CsvTranslatorError::ConfigError(
                    "Gemini API key not provided. Use --api-key or set GEMINI_API_KEY (a .env file works too)."
                        .to_string(),
                )
            })
    }

    pub fn failed_rows_path(&self, config: &AppConfig) -> PathBuf {
        self.failed_rows
            .clone()
            .unwrap_or_else(|| config.pipeline.failed_rows_output.clone())
    }
}

/// Load, translate, write. Every fatal condition is checked before the
/// first request.
pub async fn execute(
    cli: &Cli,
    config: &AppConfig,
    translator: Arc<dyn Translator>,
    cancel: &CancelSignal,
) -> Result<RunSummary> {
    let delimiter = parse_delimiter(&cli.delimiter)?;
    let job = cli.job_config(config);
    job.validate()?;

    if cli.resume && job.output_column.is_none() {
        return Err(CsvTranslatorError::ConfigError(
            "--resume needs --output-column; an in-place output no longer holds the source text"
                .to_string(),
        ));
    }

    let table = CsvTableReader::new(&cli.input, delimiter).load()?;
    info!(
        rows = table.len(),
        columns = table.headers().len(),
        input = %cli.input,
        "Loaded input table"
    );

    let mut batch = BatchTranslator::new(translator, job);
    batch.validate_against(&table)?;

    if cli.resume {
        if let Some(output_column) = batch.job().output_column.clone() {
            let previous = load_previous_translations(
                &cli.output,
                &batch.job().column,
                &output_column,
                delimiter,
            )?;
            info!(
                entries = previous.len(),
                output = %cli.output,
                "Resuming from existing output"
            );
            batch = batch.with_memory(TranslationMemory::with_entries(
                previous,
                TranslationMemory::DEFAULT_CAPACITY,
            ));
        }
    }

    let output = batch.run(&table, cancel).await?;

    let written = write_table(&cli.output, &output.table, delimiter)?;
    info!(
        rows = written,
        output = %cli.output,
        column = output
            .table
            .headers()
            .get(output.output_column_index)
            .map(String::as_str)
            .unwrap_or_default(),
        "Output written"
    );

    let report = cli.failed_rows_path(config);
    if output.summary.has_failures() {
        write_failed_rows(&report, &output.summary.failed_rows)?;
        warn!(
            failed = output.summary.failed(),
            report = %report.display(),
            "Some rows could not be translated; see the failure report"
        );
    } else if report.is_file() {
        // A report from an earlier run no longer describes this output.
        std::fs::remove_file(&report)?;
        info!(report = %report.display(), "Removed stale failure report");
    }

    Ok(output.summary)
}
