pub mod config;
pub mod errors;

pub use config::{AppConfig, TranslationJobConfig};
pub use errors::{CsvTranslatorError, Result, TranslateError};

/// Neutralizes cells that spreadsheet programs would evaluate as formulas.
pub fn sanitize_cell(value: &str) -> String {
    if value.starts_with('=')
        || value.starts_with('+')
        || value.starts_with('-')
        || value.starts_with('@')
    {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

/// Collapses newlines and runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
