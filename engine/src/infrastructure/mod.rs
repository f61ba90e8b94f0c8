/// Audit logging for session lifecycle events.
pub mod audit;
/// Configuration management for the engine.
pub mod config;
/// Telemetry setup for structured logging.
pub mod telemetry;
