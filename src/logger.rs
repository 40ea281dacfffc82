//! Log output for herd's binaries.
//!
//! The library itself only emits `tracing` events; installing a subscriber is up to the
//! application. [init] installs the one the `herd-match` binary uses.

use tracing_subscriber::EnvFilter;

/// The filter used when neither `RUST_LOG` nor the configuration sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Chooses the log filter. `RUST_LOG` wins over the configured level, which wins over
/// [DEFAULT_LOG_LEVEL].
///
/// An unparseable `RUST_LOG` is ignored.
pub fn filter(rust_log: Option<&str>, configured: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| configured.and_then(|directives| EnvFilter::try_new(directives).ok()))
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs a global subscriber that writes to stderr, leaving stdout for results.
///
/// If a global subscriber is already set, this does nothing.
pub fn init(configured: Option<&str>) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(rust_log.as_deref(), configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence() {
        assert_eq!("trace", filter(Some("trace"), Some("info")).to_string());
        assert_eq!("info", filter(None, Some("info")).to_string());
        assert_eq!("warn", filter(None, None).to_string());
    }

    #[test]
    fn invalid_directives_fall_through() {
        assert_eq!("info", filter(Some("herd=notalevel"), Some("info")).to_string());
        assert_eq!("warn", filter(None, Some("herd=loud")).to_string());
    }

    #[test]
    fn init_is_idempotent() {
        init(Some("debug"));
        init(None);
    }
}
