use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber on stderr so stdout stays free for progress output.
/// `RUST_LOG` directives are layered on top of `log_level`.
pub fn setup_logger(log_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Logger has already been set up, continuing...");
    }
}
