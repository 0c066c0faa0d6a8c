//! Process-wide tracing/logging setup for engine hosts.

pub mod tracing;

pub use tracing::{init, init_with_format, LogFormat};
