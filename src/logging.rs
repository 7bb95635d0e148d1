//! Subscriber setup (stdout and optional daily file) and the per-request run log.

use crate::config::LoggerConfig;
use crate::error::ConfigError;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Paths whose requests are written to the run log.
pub const RUN_LOG_PREFIXES: [&str; 2] = ["/admin/", "/app/"];

/// Install the global subscriber. `RUST_LOG` wins over `cfg.level`.
/// Keep the returned guard alive for as long as file output should be flushed.
pub fn init(cfg: &LoggerConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let (file_layer, guard) = if cfg.path.trim().is_empty() {
        (None, None)
    } else {
        std::fs::create_dir_all(&cfg.path).map_err(|e| ConfigError::Load(format!("{}: {}", cfg.path, e)))?;
        let (writer, guard) = non_blocking(rolling::daily(&cfg.path, format!("{}.log", cfg.file)));
        let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);
        (Some(layer), Some(guard))
    };
    let stdout_layer = cfg.stdout.then(|| fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("logger: {}", e)))?;
    Ok(guard)
}

pub fn is_run_logged(path: &str) -> bool {
    RUN_LOG_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Middleware: method, path, status and elapsed time of admin/app requests.
pub async fn run_log(req: Request, next: Next) -> Response {
    if !is_run_logged(req.uri().path()) {
        return next.run(req).await;
    }
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let res = next.run(req).await;
    tracing::info!(
        target: "run_log",
        method = %method,
        path = %path,
        status = res.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    res
}
