//! Tracing subscriber setup for the binaries

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber writing to stderr
///
/// `RUST_LOG` takes precedence; otherwise this library and the binary log
/// at `default_level` and everything else at `warn`. Calling it twice
/// keeps the first subscriber.
///
/// # Arguments
///
/// * `bin_name` - Target name of the calling binary
/// * `default_level` - Level used when `RUST_LOG` is unset
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,{}={default_level},{bin_name}={default_level}",
            env!("CARGO_CRATE_NAME")
        ))
    });

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
