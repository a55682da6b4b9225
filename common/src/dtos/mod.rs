pub mod pdf_job;
