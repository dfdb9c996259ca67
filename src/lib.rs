pub mod cli;
pub mod csv_processor;
pub mod translation;
pub mod utils;

pub use cli::{execute, Cli};
pub use csv_processor::{CsvStreamWriter, CsvTableReader, Row, Table};
pub use translation::{
    BatchTranslator, CancelHandle, CancelSignal, GeminiClient, RowOutcome, RunSummary,
    TranslationOutput, TranslationRequest, Translator,
};
pub use utils::{AppConfig, CsvTranslatorError, Result, TranslateError, TranslationJobConfig};
