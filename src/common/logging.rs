//! Logging and tracing configuration
//!
//! The CLI logs compactly to stderr. Suite runs additionally write a
//! detailed log file so a failing pipeline can be reconstructed afterwards.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::paths;

const RUN_LOG_FILE: &str = "run.log";

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flowprobe=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

/// Initialize tracing for a suite run (file + stderr logging)
///
/// Writes to `<log_dir>/run.log`, falling back to the platform log dir when
/// `log_dir` is `None`. The returned guard must be held for the lifetime of
/// the run or buffered lines are lost.
pub fn init_run(log_dir: Option<&Path>) -> Option<(PathBuf, WorkerGuard)> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flowprobe=debug,info"));

    let dir = log_dir.map(Path::to_path_buf).or_else(paths::log_dir);

    if let Some(dir) = dir {
        let appender = std::fs::create_dir_all(&dir).ok().and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(RUN_LOG_FILE)
                .build(&dir)
                .ok()
        });

        if let Some(appender) = appender {
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

            let stderr_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact();

            let initialized = tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(stderr_layer)
                .try_init()
                .is_ok();

            if initialized {
                return Some((dir.join(RUN_LOG_FILE), guard));
            }
            return None;
        }
        eprintln!("Warning: Could not open log file in {}", dir.display());
    }

    // Fallback: stderr only
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();

    None
}
