pub mod handler_pdf_job;
pub mod kafka_consumer;
