use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    StatusCode,
};
use tracing::info;

use crate::ports::text_extractor::{TextExtractionError, TextExtractor};

/// Extracts text with an Apache Tika server
///
/// The whole file is sent in the body of a `PUT /tika` request, the plain text is
/// read from the response.
#[derive(Clone)]
pub struct TikaTextExtractor {
    base_url: String,
    client: reqwest::Client,
}

impl TikaTextExtractor {
    /// # Arguments
    /// - `base_url`: url of the Tika server, ex: `http://localhost:9998`
    /// - `timeout`: bound of a whole extraction request
    pub fn try_new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextExtractor for TikaTextExtractor {
    #[tracing::instrument(name = "Extracting text with Tika", skip(self))]
    async fn extract_text(&self, file_path: &Path) -> Result<String, TextExtractionError> {
        let file = tokio::fs::read(file_path)
            .await
            .map_err(|e| TextExtractionError::FileRead(file_path.display().to_string(), e))?;

        let response = self
            .client
            .put(format!("{}/tika", self.base_url))
            .header(ACCEPT, "text/plain")
            .header(CONTENT_TYPE, "application/pdf")
            .body(file)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TextExtractionError::UnexpectedStatus(status.as_u16()));
        }

        let text = response.text().await?;
        info!(nb_chars = text.chars().count(), "Tika response received");

        Ok(text)
    }
}
