use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Map `-v` occurrences to a default filter directive.
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,pipspeed=info",
        2 => "info,pipspeed=debug",
        _ => "trace",
    }
}

/// Initialize structured logging on stderr.
///
/// `RUST_LOG` wins over the verbosity flag when it is set.
pub fn init(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
