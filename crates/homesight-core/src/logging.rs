//! Process-wide structured logging.

use once_cell::sync::OnceCell;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Initialise the global tracing subscriber.
///
/// Reads the filter from `RUST_LOG` (default `info`). Safe to call more
/// than once; only the first call installs a subscriber.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_idempotent() {
        init_logging();
        init_logging();
    }
}
