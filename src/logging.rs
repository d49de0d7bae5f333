//! Logging initialisation for attest-board.
//!
//! Stderr output is always on, filtered by `RUST_LOG` (default `warn`). When
//! `ATTEST_LOG=1`, structured logs are additionally written to
//! `attest-board/attest-board.log` under the OS log directory and the default
//! filter is raised to `info`.
//!
//! The returned guard must be kept alive for the duration of the process so
//! that buffered file output is flushed on exit.

use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialise the global tracing subscriber. Call once from `main`.
pub fn init() -> LogGuard {
    let file_logging = std::env::var("ATTEST_LOG").as_deref() == Ok("1");
    let default_filter = if file_logging { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    if !file_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return LogGuard { _file_guard: None };
    }

    let dir = log_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    let _ = std::fs::create_dir_all(&dir);
    let (non_blocking, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "attest-board.log"));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(target: "logging", dir = %dir.display(), "File logging enabled");
    LogGuard {
        _file_guard: Some(guard),
    }
}

fn log_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("attest-board"));
    }
    let mut p = PathBuf::from(std::env::var("HOME").ok()?);
    #[cfg(target_os = "macos")]
    {
        p.push("Library");
        p.push("Logs");
    }
    #[cfg(not(target_os = "macos"))]
    {
        p.push(".local");
        p.push("state");
    }
    p.push("attest-board");
    Some(p)
}
