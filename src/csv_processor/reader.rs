use crate::csv_processor::table::{Row, Table};
use crate::utils::{CsvTranslatorError, Result};
use csv::StringRecord;
use std::path::Path;

pub struct CsvTableReader {
    path: String,
    delimiter: u8,
}

impl CsvTableReader {
    pub fn new(path: impl Into<String>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    fn open(&self) -> Result<csv::Reader<std::fs::File>> {
        if !file_exists(&self.path) {
            return Err(CsvTranslatorError::FileNotFound(self.path.clone()));
        }
        let file = std::fs::File::open(&self.path)?;
        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(file))
    }

    /// Loads the whole file. Ragged rows, bad UTF-8 and a missing header row
    /// are reported as errors.
    pub fn load(&self) -> Result<Table> {
        let mut reader = self.open()?;
        let headers = string_record_to_vec(reader.headers()?);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(Row::new(string_record_to_vec(&record)));
        }

        Table::new(headers, rows).map_err(|e| match e {
            CsvTranslatorError::ValidationError(msg) => {
                CsvTranslatorError::ValidationError(format!("{}: {}", self.path, msg))
            }
            other => other,
        })
    }
}

pub fn string_record_to_vec(record: &StringRecord) -> Vec<String> {
    record.iter().map(|s| s.to_string()).collect()
}

pub fn file_exists(path: &str) -> bool {
    Path::new(path).is_file()
}

/// Parses a delimiter argument: a single ASCII character, or `\t` for tab.
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "\\t" | "\t" | "tab" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        s => Err(CsvTranslatorError::ConfigError(format!(
            "delimiter must be a single ASCII character, got '{}'",
            s
        ))),
    }
}
