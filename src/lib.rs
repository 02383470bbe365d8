pub mod configuration;
pub mod db;
pub mod models;
pub mod orchestrator;
pub mod probes;
pub mod services;
pub mod telemetry;
