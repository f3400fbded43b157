//! Observability: structured logging and metrics.

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, init_logging};
