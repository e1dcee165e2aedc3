/*
[INPUT]:  Public API exports for alpaca-trading-stream crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod handler;

// Re-export main types for convenience
pub use config::RunnerConfig;
pub use handler::log_trade_update;
