use std::path::PathBuf;

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::helper::error_chain_fmt;

/// Number of random bytes in a job id, hex encoded after the creation timestamp
pub const JOB_ID_RANDOM_BYTES: usize = 8;

/// Represents a request for a job to extract the text of several PDF files
///
/// Created once by the producer, sent as the payload of a queue message and parsed
/// unchanged by the worker. The file lists are index-aligned: `file_names[i]` is the
/// display name of `file_paths[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfJob {
    /// Unique id, also used as the message key
    pub id: String,

    /// Creation time, in seconds since epoch
    #[serde(rename = "create_timestamp")]
    pub created_at: i64,

    /// Absolute paths of the files to extract
    #[serde(rename = "file_path_list")]
    pub file_paths: Vec<PathBuf>,

    /// Display names of the files, same order as `file_paths`
    #[serde(rename = "file_name_list")]
    pub file_names: Vec<String>,

    /// Directory in which the extracted texts are written
    pub output_path: PathBuf,
}

impl PdfJob {
    /// Creates a job with a freshly generated id and the current timestamp
    ///
    /// The file lists are expected to be validated by the caller.
    pub fn new(file_paths: Vec<PathBuf>, file_names: Vec<String>, output_path: PathBuf) -> Self {
        Self {
            id: new_job_id(),
            created_at: Utc::now().timestamp(),
            file_paths,
            file_names,
            output_path,
        }
    }

    pub fn nb_files(&self) -> usize {
        self.file_paths.len()
    }

    /// Encodes the job into the bytes of a queue message payload
    ///
    /// Only fails if a path can not be represented as UTF-8.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PdfJobSerializationError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a queue message payload into a job
    ///
    /// Unknown fields are ignored, so newer producers can add fields without breaking
    /// older workers.
    pub fn try_parsing(data: &[u8]) -> Result<Self, PdfJobParsingError> {
        let data = std::str::from_utf8(data)?;
        let job = serde_json::from_str(data)
            .map_err(|e| PdfJobParsingError::InvalidJsonData(e, data.to_string()))?;

        Ok(job)
    }

    /// Checks that the file path list and the file name list are index-aligned
    pub fn validate(&self) -> Result<(), PdfJobValidationError> {
        if self.file_paths.len() != self.file_names.len() {
            return Err(PdfJobValidationError::MismatchedFileLists {
                job_id: self.id.clone(),
                nb_paths: self.file_paths.len(),
                nb_names: self.file_names.len(),
            });
        }

        Ok(())
    }
}

/// Generates a job id: `job_<epoch seconds>_<hex encoded random bytes>`
///
/// No coordination between producers is needed, collisions would require two jobs
/// created during the same second drawing the same 64 random bits.
pub fn new_job_id() -> String {
    let mut random_bytes = [0u8; JOB_ID_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    format!(
        "job_{}_{}",
        Utc::now().timestamp(),
        hex::encode(random_bytes)
    )
}

#[derive(thiserror::Error)]
pub enum PdfJobSerializationError {
    #[error("Job could not be encoded into JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl std::fmt::Debug for PdfJobSerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum PdfJobParsingError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid JSON job: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for PdfJobParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum PdfJobValidationError {
    #[error(
        "File path list ({nb_paths}) and file name list ({nb_names}) have different lengths for job {job_id}"
    )]
    MismatchedFileLists {
        job_id: String,
        nb_paths: usize,
        nb_names: usize,
    },
}

impl std::fmt::Debug for PdfJobValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
