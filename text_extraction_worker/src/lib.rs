pub mod adapters;
pub mod configuration;
pub mod domain;
pub mod handlers;
pub mod ports;
pub mod startup;
