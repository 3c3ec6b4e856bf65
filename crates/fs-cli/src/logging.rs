//! Terminal subscriber for the `log` records emitted by the library crates.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,fs_core=debug,fs_sql=debug,fs_quality=debug,fs_db=debug,fs_meta=debug,fs_build=debug"
    } else {
        "warn"
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the `--verbose` default.
///
/// The default `tracing-log` feature bridges `log` records into the subscriber.
pub(crate) fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .try_init();
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
