use std::path::PathBuf;

use common::dtos::pdf_job::{PdfJob, PdfJobValidationError};

pub const EXTRACTED_TEXT_EXTENSION: &str = "txt";

/// Extraction of a single file of a pdf job
///
/// Owned by the asynchronous task running it, and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTask {
    pub job_id: String,
    pub source_path: PathBuf,
    pub file_name: String,
    pub output_path: PathBuf,
}

impl ExtractionTask {
    /// Builds one task per file of a job, in the job order
    ///
    /// Each task binds `file_paths[i]` with `file_names[i]`. A job whose lists are not
    /// index-aligned gives no task at all.
    pub fn try_from_job(job: PdfJob) -> Result<Vec<Self>, PdfJobValidationError> {
        job.validate()?;

        let PdfJob {
            id,
            file_paths,
            file_names,
            output_path,
            ..
        } = job;

        let tasks = file_paths
            .into_iter()
            .zip(file_names)
            .map(|(source_path, file_name)| Self {
                job_id: id.clone(),
                source_path,
                file_name,
                output_path: output_path.clone(),
            })
            .collect();

        Ok(tasks)
    }

    /// Path of the file the extracted text is written to
    ///
    /// The display name without its extension, with a `.txt` extension, in the output directory:
    /// `report.v2.pdf` gives `<output_path>/report.v2.txt`
    ///
    /// The extension starts at the last dot of the name, even a leading one: `.pdf` gives
    /// `<output_path>/.txt`.
    pub fn output_file_path(&self) -> PathBuf {
        let base_name = match self.file_name.rfind('.') {
            Some(dot_index) if !self.file_name[dot_index..].contains('/') => {
                &self.file_name[..dot_index]
            }
            _ => self.file_name.as_str(),
        };

        self.output_path
            .join(format!("{}.{}", base_name, EXTRACTED_TEXT_EXTENSION))
    }
}
