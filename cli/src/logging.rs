//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `~/.config/chatfx/chatfx.log` (or platform equivalent)
//! with 10 MB size-based rotation. Set `DEBUG_LOGGING=1` to enable debug
//! output for chatfx crates.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize logging with dual-output (file + stdout).
///
/// Returns a `WorkerGuard` that MUST be held for the application lifetime
/// to ensure all buffered logs are flushed on shutdown.
///
/// # Behavior
/// - **File output:** written to `~/.config/chatfx/chatfx.log`
/// - **Stdout output:** INFO+ by default, DEBUG+ for chatfx crates when `DEBUG_LOGGING=1`
/// - **Rotation:** Size-based at 10 MB, keeps only latest rotated file
///
/// # Fallback
/// If log directory creation fails, returns `None` and falls back to stdout-only logging.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    // Config directory: ~/.config/chatfx on Linux, %APPDATA%/chatfx on Windows
    let log_dir = match dirs::config_dir() {
        Some(config) => config.join("chatfx"),
        None => {
            init_stdout_only(debug_logging);
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // Can't use tracing yet since subscriber not initialized
        eprintln!(
            "Failed to create log directory {:?}: {}, using stdout only",
            log_dir, e
        );
        init_stdout_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("chatfx.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024), // 10 MB
        1, // Keep only the latest rotated file (chatfx.log and chatfx.log.1)
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stdout_only(debug_logging);
            return None;
        }
    };

    // Wrap in non-blocking writer for async-safe logging
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer: no ANSI colors
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let filter = EnvFilter::new(filter_directive(debug_logging));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter)
        .init();

    tracing::info!(
        log_file = ?log_path,
        debug_logging,
        "chatfx logging initialized"
    );

    Some(guard)
}

/// Fallback: Initialize stdout-only logging when file logging fails.
fn init_stdout_only(debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let filter = EnvFilter::new(filter_directive(debug_logging));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter)
        .init();

    tracing::info!(debug_logging, "chatfx logging initialized (stdout only)");
}

fn filter_directive(debug_logging: bool) -> &'static str {
    if debug_logging {
        "info,chatfx_core=debug,chatfx_cli=debug"
    } else {
        "info"
    }
}
