pub mod concurrency_limiter;
pub mod drain_controller;
