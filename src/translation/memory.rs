use crate::csv_processor::CsvTableReader;
use crate::utils::{CsvTranslatorError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source text → translation. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct TranslationMemory {
    entries: Arc<RwLock<HashMap<String, String>>>,
    max_size: usize,
}

impl TranslationMemory {
    pub const DEFAULT_CAPACITY: usize = 100_000;

    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_size,
        }
    }

    pub fn with_entries(entries: HashMap<String, String>, max_size: usize) -> Self {
        let entries: HashMap<String, String> = entries.into_iter().take(max_size).collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
            max_size,
        }
    }

    pub async fn get(&self, source: &str) -> Option<String> {
        self.entries.read().await.get(source).cloned()
    }

    /// Ignored once the memory is full; existing entries are never evicted.
    pub async fn insert(&self, source: String, translation: String) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_size && !entries.contains_key(&source) {
            return;
        }
        entries.insert(source, translation);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for TranslationMemory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Reads a previous output file and returns the translations it holds,
/// keyed by source text. A missing file yields an empty map.
pub fn load_previous_translations(
    path: impl AsRef<Path>,
    source_column: &str,
    output_column: &str,
    delimiter: u8,
) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let path_str = path.to_str().ok_or_else(|| {
        CsvTranslatorError::ConfigError(format!("{} is not valid UTF-8", path.display()))
    })?;
    let table = CsvTableReader::new(path_str, delimiter).load()?;
    let source_idx = table.column_index(source_column)?;
    let output_idx = table.column_index(output_column)?;

    let mut previous = HashMap::new();
    for row in table.rows() {
        if let (Some(source), Some(translated)) = (row.get(source_idx), row.get(output_idx)) {
            if !source.trim().is_empty() && !translated.trim().is_empty() {
                previous.insert(source.to_string(), translated.to_string());
            }
        }
    }

    Ok(previous)
}
