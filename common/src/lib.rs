pub mod dtos;
pub mod helper;
pub mod telemetry;
