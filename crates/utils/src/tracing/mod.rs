use lazyclean_core::LOG_ENV_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Reads the filter from `LAZYCLEAN_LOG`, falling back to `info`, and writes
/// compact lines to stderr. Fails if a global subscriber is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .with_target(false)
        .with_thread_names(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Create the span a cleanup worker holds while it waits on its queue
pub fn worker_span(worker_name: &str) -> Span {
    span!(Level::DEBUG, "cleaner_wait", worker = %worker_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_only_once() {
        // Another test binary may have installed a subscriber first, so only
        // the second call is guaranteed to fail.
        let _ = init();
        assert!(init().is_err());
    }

    #[test]
    fn test_worker_span_metadata() {
        let span = worker_span("lazyclean-cleaner");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "cleaner_wait");
            assert_eq!(*metadata.level(), Level::DEBUG);
        }
    }
}
