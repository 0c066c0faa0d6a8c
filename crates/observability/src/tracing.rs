//! Tracing/logging initialization.
//!
//! The engine crates emit structured events (order ids, domain names,
//! amounts as fields); this module wires them to stderr. Interactive runs
//! want plain lines, deployments want JSON, so the format is selectable via
//! `NAMEGRID_LOG_FORMAT` (`plain` or `json`). Filtering follows `RUST_LOG`.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("NAMEGRID_LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            _ => Self::Plain,
        }
    }
}

/// Initialize tracing with the format taken from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    init_with_format(LogFormat::from_env());
}

/// Initialize tracing with an explicit output format.
pub fn init_with_format(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init_with_format(LogFormat::Plain);
        init_with_format(LogFormat::Json);
        init();
    }
}
