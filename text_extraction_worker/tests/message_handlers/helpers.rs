use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use once_cell::sync::Lazy;
use serde_json::json;
use text_extraction_worker::{
    domain::services::{concurrency_limiter::ConcurrencyLimiter, drain_controller::DrainController},
    handlers::handler_pdf_job::{HandlePdfJobError, PdfJobHandler},
    ports::{
        dead_letter::DeadLetterHook,
        text_extractor::{TextExtractionError, TextExtractor},
    },
};
use tokio::sync::Semaphore;

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "message_handlers_tests".to_string();

    // The sink is part of the type returned by `get_tracing_subscriber`: one branch per sink
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber);
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber);
    };
});

/// Bunyan records written while a `LogRecorder::start` guard is alive, on the current thread
#[derive(Clone, Default)]
pub struct LogRecorder {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogRecorder {
    /// Records the traces of the current thread until the returned guard is dropped
    ///
    /// Tasks spawned on a `current_thread` runtime are recorded as well.
    pub fn start() -> (Self, tracing::subscriber::DefaultGuard) {
        Lazy::force(&TRACING);

        let recorder = Self::default();
        let sink = recorder.clone();
        let subscriber = get_tracing_subscriber(
            "message_handlers_tests".to_string(),
            "info".to_string(),
            move || sink.clone(),
        );

        (recorder, tracing::subscriber::set_default(subscriber))
    }

    pub fn records(&self) -> Vec<serde_json::Value> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Records of `error` level whose message ends with `message`
    ///
    /// Bunyan prefixes the message of an event with the name of its span.
    pub fn errors_with_message(&self, message: &str) -> Vec<serde_json::Value> {
        self.records()
            .into_iter()
            .filter(|record| {
                record["level"] == 50
                    && record["msg"]
                        .as_str()
                        .map_or(false, |msg| msg.ends_with(message))
            })
            .collect()
    }
}

impl Write for LogRecorder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A pdf job handler wired with test doubles
pub struct TestHandler {
    pub handler: PdfJobHandler,
    pub concurrency_limiter: ConcurrencyLimiter,
    pub drain_controller: DrainController,
}

impl TestHandler {
    pub fn new(text_extractor: Arc<dyn TextExtractor>, max_concurrent_extractions: usize) -> Self {
        Lazy::force(&TRACING);

        let concurrency_limiter = ConcurrencyLimiter::new(max_concurrent_extractions);
        let drain_controller = DrainController::new();
        let handler = PdfJobHandler::new(
            text_extractor,
            concurrency_limiter.clone(),
            drain_controller.clone(),
        );

        Self {
            handler,
            concurrency_limiter,
            drain_controller,
        }
    }

    /// Waits for every dispatched extraction, failing the test if it takes too long
    pub async fn wait_for_extractions(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.drain_controller.wait_all())
            .await
            .expect("extractions did not complete in time");
    }
}

/// Builds a message payload, the lists do not need to be aligned
pub fn job_payload(file_paths: &[&str], file_names: &[&str], output_path: &Path) -> Vec<u8> {
    json!({
        "id": "job_1700000000_ab12cd34",
        "create_timestamp": 1_700_000_000,
        "file_path_list": file_paths,
        "file_name_list": file_names,
        "output_path": output_path,
    })
    .to_string()
    .into_bytes()
}

/// Extractor answering from a fixed table, failing for unknown paths
#[derive(Default)]
pub struct StubTextExtractor {
    texts: HashMap<PathBuf, String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl StubTextExtractor {
    pub fn with_text(mut self, file_path: &str, text: &str) -> Self {
        self.texts.insert(PathBuf::from(file_path), text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextExtractor for StubTextExtractor {
    async fn extract_text(&self, file_path: &Path) -> Result<String, TextExtractionError> {
        self.calls.lock().unwrap().push(file_path.to_path_buf());

        self.texts
            .get(file_path)
            .cloned()
            .ok_or_else(|| TextExtractionError::UnexpectedStatus(422))
    }
}

/// Extractor recording how many calls run at the same time
pub struct ConcurrencyProbeExtractor {
    delay: Duration,
    current: AtomicUsize,
    max: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcurrencyProbeExtractor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            current: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for ConcurrencyProbeExtractor {
    async fn extract_text(&self, file_path: &Path) -> Result<String, TextExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("text of {}", file_path.display()))
    }
}

/// Extractor blocking every call until released by the test
pub struct GatedTextExtractor {
    gate: Semaphore,
    started: AtomicUsize,
}

impl GatedTextExtractor {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, nb_calls: usize) {
        self.gate.add_permits(nb_calls);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for GatedTextExtractor {
    async fn extract_text(&self, file_path: &Path) -> Result<String, TextExtractionError> {
        self.started.fetch_add(1, Ordering::SeqCst);

        // The gate is never closed, a closed one answers like an unavailable service
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TextExtractionError::UnexpectedStatus(503))?;
        permit.forget();

        Ok(format!("text of {}", file_path.display()))
    }
}

/// Dead letter hook keeping the rejected payloads
#[derive(Default)]
pub struct RecordingDeadLetterHook {
    rejected: Mutex<Vec<(Vec<u8>, String)>>,
}

impl RecordingDeadLetterHook {
    pub fn rejected(&self) -> Vec<(Vec<u8>, String)> {
        self.rejected.lock().unwrap().clone()
    }
}

impl DeadLetterHook for RecordingDeadLetterHook {
    fn on_rejected(&self, payload: &[u8], error: &HandlePdfJobError) {
        self.rejected
            .lock()
            .unwrap()
            .push((payload.to_vec(), error.to_string()));
    }
}

/// Names of the files in a directory, sorted
pub fn file_names_in(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
