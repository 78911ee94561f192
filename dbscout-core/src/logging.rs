//! Tracing setup for the dbscout CLI and library consumers.

use tracing::Level;

use crate::Result;

/// Maps the CLI's `-q`/`-v` flags onto a tracing level. Quiet always
/// wins; verbosity saturates at TRACE.
fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global tracing subscriber.
///
/// Logs go to stderr; stdout is reserved for command output so piped
/// JSON and row counts stay parseable.
///
/// # Example
/// ```rust,no_run
/// use dbscout_core::logging::init_logging;
///
/// // Initialize at DEBUG level
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::DbScoutError::configuration(format!("Failed to initialize logging: {e}"))
        })?;

    Ok(())
}
