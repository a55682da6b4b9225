use std::path::PathBuf;

use clap::Parser;

/// Sends a job extracting the text of PDF files to the extraction workers
#[derive(Debug, Parser)]
#[command(name = "pdf_job_producer", version)]
pub struct Cli {
    /// Comma separated list of PDF files, ex: `./a.pdf,./books/b.pdf`
    pub pdf_file_paths: String,

    /// Directory in which the workers will write the extracted texts
    pub output_path: PathBuf,
}
