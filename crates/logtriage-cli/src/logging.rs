//! Tracing initialization.

use tracing_subscriber::EnvFilter;

/// Default directive for a `-v` count.
fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Pick the filter directive: `RUST_LOG`, then `-v`, then the config file.
fn directive(env: Option<String>, verbose: u8, configured: Option<&str>) -> String {
    if let Some(env) = env.filter(|s| !s.trim().is_empty()) {
        return env;
    }
    if verbose > 0 {
        return verbosity_directive(verbose).to_string();
    }
    configured.unwrap_or("warn").to_string()
}

/// Install the stderr subscriber.
pub fn init_tracing(verbose: u8, configured: Option<&str>) {
    let directive = directive(std::env::var("RUST_LOG").ok(), verbose, configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
