pub mod extraction_task;
