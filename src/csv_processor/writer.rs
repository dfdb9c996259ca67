use crate::csv_processor::table::Table;
use crate::utils::{CsvTranslatorError, Result};
use csv::Writer;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes rows to a sibling temp file and renames it over the target on
/// `finish`, so an interrupted write never truncates an existing output.
pub struct CsvStreamWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    headers: Vec<String>,
    delimiter: u8,
    writer: Option<Writer<File>>,
    rows_written: usize,
}

impl CsvStreamWriter {
    pub fn new(path: impl AsRef<Path>, headers: Vec<String>, delimiter: u8) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".partial");
        let tmp_path = path.with_file_name(tmp_name);

        Self {
            path,
            tmp_path,
            headers,
            delimiter,
            writer: None,
            rows_written: 0,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.tmp_path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(file);
        writer.write_record(&self.headers)?;
        self.writer = Some(writer);
        Ok(())
    }

    pub fn write_row(&mut self, row: &[String]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            CsvTranslatorError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Writer not initialized",
            ))
        })?;

        writer.write_record(row)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            drop(writer);
            std::fs::rename(&self.tmp_path, &self.path)?;
        }
        Ok(self.rows_written)
    }
}

impl Drop for CsvStreamWriter {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

/// Cells are written as they are in `table`.
pub fn write_table(path: impl AsRef<Path>, table: &Table, delimiter: u8) -> Result<usize> {
    let mut writer = CsvStreamWriter::new(path, table.headers().to_vec(), delimiter);
    writer.initialize()?;
    for row in table.rows() {
        writer.write_row(row.values())?;
    }
    writer.finish()
}
