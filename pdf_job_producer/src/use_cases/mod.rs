pub mod submit_pdf_job;
