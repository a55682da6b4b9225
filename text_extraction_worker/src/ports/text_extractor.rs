use std::path::Path;

use async_trait::async_trait;
use common::helper::error_chain_fmt;

/// Extracts the text of a file, usually by calling an external service
///
/// Implementations bound the call with their own timeout.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, file_path: &Path) -> Result<String, TextExtractionError>;
}

#[derive(thiserror::Error)]
pub enum TextExtractionError {
    #[error("Failed to open file {0}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to send request to the extraction service")]
    Request(#[from] reqwest::Error),
    #[error("Extraction service returned status: {0}")]
    UnexpectedStatus(u16),
}

impl std::fmt::Debug for TextExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
