//! Logging setup for the broker binary and tests.

use tracing::Level;

/// Reads a `log.level` setting. Accepts the `tracing` level names in any
/// case plus `warning`; anything else logs at `info`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "warning" => Level::WARN,
        other => other.parse().unwrap_or(Level::INFO),
    }
}

/// Sends broker events at `level` and above to standard output.
///
/// Returns `false` if a global subscriber was already installed, which
/// happens whenever several tests set up logging in one process.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_writer(std::io::stdout)
        .try_init()
        .is_ok()
}
