use tracing_subscriber::EnvFilter;

/// Initializes global tracing output. `RUST_LOG` wins when set; otherwise the
/// configured `LOG_LEVEL` setting is used as the default filter.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
