use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Initialise the diagnostic stream. All engine and stage diagnostics go to
/// stderr; stdout is reserved for pipeline data.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .init();
}
