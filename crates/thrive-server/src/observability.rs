//! Process-wide tracing subscriber.
//!
//! The filter sits behind a reload layer so the level from the loaded
//! configuration can replace the bootstrap level once the file is parsed.
//! An explicit `RUST_LOG` always wins over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

/// Noisy dependencies are held at `warn` unless the level asks for more.
fn directives(level: &str) -> String {
    match level.trim() {
        "trace" | "debug" => level.trim().to_string(),
        other => format!("{other},sqlx=warn,hyper=warn,reqwest=warn"),
    }
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(directives(level)).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

pub fn init_tracing() {
    let filter = if rust_log_set() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for("info"))
    } else {
        filter_for("info")
    };
    let (layer, handle) = reload::Layer::new(filter);
    if FILTER.set(handle).is_err() {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Swaps in `logging.level` from the configuration.
pub fn apply_logging_level(level: &str) {
    if rust_log_set() {
        return;
    }
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(e) = handle.reload(filter_for(level)) {
        tracing::warn!(error = %e, level, "could not change log level");
    }
}

pub fn shutdown_tracing() {
    tracing::info!("thrive server stopped");
}
