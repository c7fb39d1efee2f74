//! Logging configuration for order-insight.
//!
//! Diagnostics go to stderr so that answers printed on stdout stay clean
//! for piping.

use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` when set, otherwise `default_level`,
/// otherwise `info`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to stderr.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_stderr_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_filter_uses_default_level() {
        if std::env::var("RUST_LOG").is_err() {
            let filter = env_filter("order_insight=debug");
            assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        }
    }

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        if std::env::var("RUST_LOG").is_err() {
            let filter = env_filter("order_insight=verbose");
            assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        }
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_stderr_logging("warn");
        init_stderr_logging("debug");
    }
}
