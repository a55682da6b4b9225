use std::time::Duration;

use common::{
    dtos::pdf_job::{PdfJob, PdfJobSerializationError},
    helper::error_chain_fmt,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ports::message_publisher::{DeliveryAck, MessagePublisher, MessagePublisherError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Retry policy of a job submission
#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    /// Number of publishing attempts before giving up. 0 is handled as 1.
    pub max_attempts: u32,
    /// Bound of a single attempt, an attempt running out of time counts as failed
    pub attempt_timeout: Duration,
    /// Wait between two attempts
    pub retry_delay: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub job_id: String,
    /// Number of attempts it took, the last one being the successful one
    pub attempts: u32,
    pub ack: DeliveryAck,
}

/// Hands a job over to the queue, retrying on failure
///
/// Returns as soon as one attempt is acknowledged by the broker. Between two failed
/// attempts, waits `retry_delay` unless `cancel_token` is cancelled, in which case
/// it returns right away without any further attempt.
///
/// The job is published with its id as message key.
#[tracing::instrument(
    name = "Submitting pdf job",
    skip(publisher, job, cancel_token),
    fields(job_id = %job.id)
)]
pub async fn submit_pdf_job<P>(
    publisher: &P,
    job: &PdfJob,
    options: SubmitOptions,
    cancel_token: &CancellationToken,
) -> Result<SubmissionReceipt, SubmitPdfJobError>
where
    P: MessagePublisher + ?Sized,
{
    let payload = job.to_bytes()?;
    let max_attempts = options.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let publishing = publisher.publish(&job.id, &payload);

        let error = match tokio::time::timeout(options.attempt_timeout, publishing).await {
            Ok(Ok(ack)) => {
                info!(attempt, ?ack, "Pdf job submitted");
                return Ok(SubmissionReceipt {
                    job_id: job.id.clone(),
                    attempts: attempt,
                    ack,
                });
            }
            Ok(Err(error)) => error,
            Err(_elapsed) => MessagePublisherError::Timeout,
        };

        warn!(
            ?error,
            "Attempt {}/{} failed to send message", attempt, max_attempts
        );

        if attempt < max_attempts {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    warn!(attempt, "Submission cancelled while waiting to retry");
                    return Err(SubmitPdfJobError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(options.retry_delay) => {}
            }
        }
    }

    Err(SubmitPdfJobError::AttemptsExhausted {
        attempts: max_attempts,
    })
}

#[derive(thiserror::Error)]
pub enum SubmitPdfJobError {
    #[error("Failed to send message after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
    #[error("Submission cancelled after {attempts} attempts, the job was not delivered")]
    Cancelled { attempts: u32 },
    #[error(transparent)]
    Serialization(#[from] PdfJobSerializationError),
}

impl std::fmt::Debug for SubmitPdfJobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
