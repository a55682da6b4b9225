use crate::handlers::handler_pdf_job::HandlePdfJobError;

/// Receives the messages rejected by the pdf job handler
///
/// Without any hook, rejected messages are logged and dropped: they are acknowledged
/// anyway so they are never redelivered.
pub trait DeadLetterHook: Send + Sync {
    fn on_rejected(&self, payload: &[u8], error: &HandlePdfJobError);
}
