use std::{path::PathBuf, sync::Arc};

use common::{
    dtos::pdf_job::{PdfJob, PdfJobParsingError, PdfJobValidationError},
    helper::error_chain_fmt,
};
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    domain::{
        entities::extraction_task::ExtractionTask,
        services::{
            concurrency_limiter::ConcurrencyLimiter,
            drain_controller::{DrainController, InFlightGuard},
        },
    },
    ports::{dead_letter::DeadLetterHook, text_extractor::TextExtractor},
};

/// Number of characters of an extracted text written in the debug logs
const TEXT_PREVIEW_LEN: usize = 200;

/// A pdf job that was parsed and validated, ready to be dispatched
#[derive(Debug)]
pub struct AcceptedPdfJob {
    pub job_id: String,
    pub tasks: Vec<ExtractionTask>,
}

/// A pdf job whose extraction tasks have all been launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedPdfJob {
    pub job_id: String,
    pub nb_tasks: usize,
}

/// Fans a pdf job out into one extraction task per file
///
/// Handling a message is done in two phases:
/// - `accept`: parses and validates the job, no side effect
/// - `dispatch`: launches the extraction tasks in the background and returns right away
///
/// The message can be acknowledged as soon as `dispatch` returns: an acknowledgment means
/// the job was received, not that its files were extracted. If the process crashes before the
/// tasks complete, their results are lost. Slow files never block the consumption of the
/// next messages.
///
/// Cloning the handler shares the extractor, the permits and the drain controller.
#[derive(Clone)]
pub struct PdfJobHandler {
    text_extractor: Arc<dyn TextExtractor>,
    concurrency_limiter: ConcurrencyLimiter,
    drain_controller: DrainController,
    dead_letter_hook: Option<Arc<dyn DeadLetterHook>>,
}

impl PdfJobHandler {
    pub fn new(
        text_extractor: Arc<dyn TextExtractor>,
        concurrency_limiter: ConcurrencyLimiter,
        drain_controller: DrainController,
    ) -> Self {
        Self {
            text_extractor,
            concurrency_limiter,
            drain_controller,
            dead_letter_hook: None,
        }
    }

    /// Hands the rejected messages over to `hook` before they are dropped
    pub fn with_dead_letter_hook(mut self, hook: Arc<dyn DeadLetterHook>) -> Self {
        self.dead_letter_hook = Some(hook);
        self
    }

    /// Handles a message payload: accepts the job then dispatches its extraction tasks
    ///
    /// Must be called from within a tokio runtime. Returns once every task is launched.
    /// On a rejected message, no task is launched.
    pub fn on_message(&self, payload: &[u8]) -> Result<DispatchedPdfJob, HandlePdfJobError> {
        match self.accept(payload) {
            Ok(accepted_job) => Ok(self.dispatch(accepted_job)),
            Err(error) => {
                if let Some(hook) = &self.dead_letter_hook {
                    hook.on_rejected(payload, &error);
                }
                Err(error)
            }
        }
    }

    #[tracing::instrument(name = "Accepting pdf job", skip(self, payload))]
    pub fn accept(&self, payload: &[u8]) -> Result<AcceptedPdfJob, HandlePdfJobError> {
        let job = PdfJob::try_parsing(payload)?;
        let job_id = job.id.clone();

        let tasks = ExtractionTask::try_from_job(job)?;

        info!("Processing PDF job: {} with {} files", job_id, tasks.len());

        Ok(AcceptedPdfJob { job_id, tasks })
    }

    /// Launches every extraction task of the job without waiting for them
    ///
    /// Each task is registered in the drain controller before being spawned.
    #[tracing::instrument(name = "Dispatching pdf job", skip(self, accepted_job), fields(job_id = %accepted_job.job_id))]
    pub fn dispatch(&self, accepted_job: AcceptedPdfJob) -> DispatchedPdfJob {
        let AcceptedPdfJob { job_id, tasks } = accepted_job;
        let nb_tasks = tasks.len();

        for task in tasks {
            let in_flight_guard = self.drain_controller.register();
            let span = info_span!(
                "Extracting text",
                job_id = %task.job_id,
                file_name = %task.file_name,
            );

            tokio::spawn(
                run_extraction_task(
                    task,
                    self.text_extractor.clone(),
                    self.concurrency_limiter.clone(),
                    in_flight_guard,
                )
                .instrument(span),
            );
        }

        info!(
            "PDF job {} queued for text extraction ({} files)",
            job_id, nb_tasks
        );

        DispatchedPdfJob { job_id, nb_tasks }
    }
}

/// Extracts the text of one file and writes it in the output directory
///
/// Failures are logged and end the task: they are never retried and never affect the
/// other files of the job. The permit and the drain registration are released on every
/// exit path.
pub async fn run_extraction_task(
    task: ExtractionTask,
    text_extractor: Arc<dyn TextExtractor>,
    concurrency_limiter: ConcurrencyLimiter,
    _in_flight_guard: InFlightGuard,
) {
    let _permit = match concurrency_limiter.acquire().await {
        Ok(permit) => permit,
        Err(error) => {
            error!(?error, "No permit available for {}", task.file_name);
            return;
        }
    };

    info!(
        "Starting text extraction for job: {} (file: {})",
        task.job_id, task.file_name
    );

    let text = match text_extractor.extract_text(&task.source_path).await {
        Ok(text) => text,
        Err(error) => {
            error!(
                ?error,
                source_path = %task.source_path.display(),
                "Failed to extract text from {}", task.file_name
            );
            return;
        }
    };

    info!(
        "Successfully extracted text from {} ({} characters)",
        task.file_name,
        text.chars().count()
    );

    match save_extracted_text(&task, &text).await {
        Ok(output_file_path) => {
            info!(
                "Successfully saved text to file: {}",
                output_file_path.display()
            );
        }
        Err(error) => {
            error!(?error, "Failed to save text file for {}", task.file_name);
            return;
        }
    }

    let preview: String = text.chars().take(TEXT_PREVIEW_LEN).collect();
    debug!(%preview, "Text preview");
}

/// Writes the extracted text to `<output_path>/<file name without extension>.txt`
///
/// The output directory and its parents are created if needed.
#[tracing::instrument(name = "Saving extracted text", skip(task, text), fields(file_name = %task.file_name))]
pub async fn save_extracted_text(
    task: &ExtractionTask,
    text: &str,
) -> Result<PathBuf, SaveExtractedTextError> {
    tokio::fs::create_dir_all(&task.output_path)
        .await
        .map_err(|e| SaveExtractedTextError::CreateOutputDirectory(task.output_path.clone(), e))?;

    let output_file_path = task.output_file_path();

    tokio::fs::write(&output_file_path, text)
        .await
        .map_err(|e| SaveExtractedTextError::WriteFile(output_file_path.clone(), e))?;

    Ok(output_file_path)
}

#[derive(thiserror::Error)]
pub enum HandlePdfJobError {
    #[error(transparent)]
    Decode(#[from] PdfJobParsingError),
    #[error(transparent)]
    Validation(#[from] PdfJobValidationError),
}

impl std::fmt::Debug for HandlePdfJobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum SaveExtractedTextError {
    #[error("Failed to create output directory {}", .0.display())]
    CreateOutputDirectory(PathBuf, #[source] std::io::Error),
    #[error("Failed to write text file {}", .0.display())]
    WriteFile(PathBuf, #[source] std::io::Error),
}

impl std::fmt::Debug for SaveExtractedTextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
