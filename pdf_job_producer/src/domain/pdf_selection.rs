use std::path::{Path, PathBuf};

use common::{dtos::pdf_job::PdfJob, helper::error_chain_fmt};
use tracing::info;

pub const PDF_EXTENSION: &str = "pdf";

/// Builds a job from a comma separated list of PDF files
///
/// Each non-empty entry, once trimmed, must be an existing file with a `.pdf` extension.
/// It is converted into an absolute path, the display name being its last component.
/// Symbolic links are kept as given: the display name is the one of the link.
///
/// # Arguments
/// - `pdf_file_paths`: comma separated list of paths, ex: `./a.pdf, /books/b.pdf`
/// - `output_path`: directory in which the workers will write the extracted texts
#[tracing::instrument(name = "Selecting PDF files")]
pub fn create_job_from_paths(
    pdf_file_paths: &str,
    output_path: &Path,
) -> Result<PdfJob, PdfSelectionError> {
    let mut file_paths = vec![];
    let mut file_names = vec![];

    for path in pdf_file_paths.split(',').map(str::trim) {
        if path.is_empty() {
            continue;
        }

        let (absolute_path, file_name) = select_pdf_file(Path::new(path))?;
        file_paths.push(absolute_path);
        file_names.push(file_name);
    }

    if file_paths.is_empty() {
        return Err(PdfSelectionError::NoValidPdfFiles);
    }

    let job = PdfJob::new(file_paths, file_names, output_path.to_path_buf());
    info!(job_id = %job.id, nb_files = job.nb_files(), "Created pdf job");

    Ok(job)
}

/// Checks a single path and returns its absolute form with its display name
fn select_pdf_file(path: &Path) -> Result<(PathBuf, String), PdfSelectionError> {
    if !path.exists() {
        return Err(PdfSelectionError::FileNotFound(path.to_path_buf()));
    }

    if path.extension().and_then(|extension| extension.to_str()) != Some(PDF_EXTENSION) {
        return Err(PdfSelectionError::NotAPdf(path.to_path_buf()));
    }

    let absolute_path = std::path::absolute(path)
        .map_err(|e| PdfSelectionError::AbsolutePath(path.to_path_buf(), e))?;

    let file_name = absolute_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PdfSelectionError::NotAPdf(path.to_path_buf()))?;

    Ok((absolute_path, file_name))
}

#[derive(thiserror::Error)]
pub enum PdfSelectionError {
    #[error("File does not exist: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("File is not a PDF: {}", .0.display())]
    NotAPdf(PathBuf),
    #[error("Failed to get the absolute path of {}", .0.display())]
    AbsolutePath(PathBuf, #[source] std::io::Error),
    #[error("No valid PDF files provided")]
    NoValidPdfFiles,
}

impl std::fmt::Debug for PdfSelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
