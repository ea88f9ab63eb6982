// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins when set; otherwise
/// the crate logs at info, or at debug with `verbose`. The HTML parser
/// crates stay at warn either way.
pub fn setup_logging(verbose: bool) {
    let default = if verbose {
        "course_extractor=debug,html5ever=warn,selectors=warn,info"
    } else {
        "html5ever=warn,selectors=warn,info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(verbose).init();

    tracing::debug!("Logging setup complete.");
}
