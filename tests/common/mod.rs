#![allow(dead_code)]

use async_trait::async_trait;
use csv_column_translator::translation::{CancelHandle, Translation};
use csv_column_translator::{
    Row, Table, TranslateError, TranslationJobConfig, TranslationRequest, Translator,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        headers.iter().map(|s| s.to_string()).collect(),
        rows.iter()
            .map(|r| Row::new(r.iter().map(|s| s.to_string()).collect()))
            .collect(),
    )
    .unwrap()
}

pub fn column(table: &Table, name: &str) -> Vec<String> {
    (0..table.len())
        .map(|i| table.value(i, name).unwrap_or_default().to_string())
        .collect()
}

/// Job with millisecond backoff so retry tests stay fast.
pub fn fast_job(column: &str, target: &str) -> TranslationJobConfig {
    let mut job = TranslationJobConfig::new(column, target);
    job.base_delay = Duration::from_millis(1);
    job.max_delay = Duration::from_millis(5);
    job
}

pub fn french() -> HashMap<String, String> {
    [
        ("Hello", "Bonjour"),
        ("Goodbye", "Au revoir"),
        ("Thank you", "Merci"),
        ("Good night", "Bonne nuit"),
        ("Yes", "Oui"),
        ("No", "Non"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

type Script = HashMap<String, Vec<TranslateError>>;

/// Looks texts up in a dictionary. Unknown texts are rejected as invalid
/// input. Errors can be scripted per text; they are returned in order
/// before the dictionary answer.
pub struct ScriptedTranslator {
    dictionary: HashMap<String, String>,
    script: Mutex<Script>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    started_at: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_on: Option<(String, CancelHandle)>,
}

impl ScriptedTranslator {
    pub fn new(dictionary: HashMap<String, String>) -> Self {
        Self {
            dictionary,
            script: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            started_at: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            cancel_on: None,
        }
    }

    pub fn fail_with(self, text: &str, errors: Vec<TranslateError>) -> Self {
        self.script.lock().unwrap().insert(text.to_string(), errors);
        self
    }

    pub fn delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    /// Triggers `handle` while answering `text`.
    pub fn cancel_on(mut self, text: &str, handle: CancelHandle) -> Self {
        self.cancel_on = Some((text.to_string(), handle));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, text: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == text).count()
    }

    /// When each call began, in call order.
    pub fn started_at(&self) -> Vec<Instant> {
        self.started_at.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslateError> {
        self.calls.lock().unwrap().push(request.text.clone());
        self.started_at.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&request.text) {
            tokio::time::sleep(*delay).await;
        }

        let scripted = {
            let mut script = self.script.lock().unwrap();
            script
                .get_mut(&request.text)
                .filter(|errors| !errors.is_empty())
                .map(|errors| errors.remove(0))
        };

        if let Some((text, handle)) = &self.cancel_on {
            if text == &request.text {
                handle.cancel();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = scripted {
            return Err(error);
        }

        match self.dictionary.get(&request.text) {
            Some(translated) => Ok(Translation {
                text: translated.clone(),
                tokens: Some(10),
            }),
            None => Err(TranslateError::InvalidRequest {
                status: 400,
                message: format!("cannot translate '{}'", request.text),
            }),
        }
    }
}

pub fn rate_limited() -> TranslateError {
    TranslateError::from_status(429, "RESOURCE_EXHAUSTED".to_string(), None)
}
