//! Logging setup for the daemon.
//!
//! Always logs to a daily-rotated file under `log.dir`. In the foreground the
//! same events also go to stderr. `RUST_LOG` overrides the level chosen by
//! `system.debug`.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE: &str = "toptalk.log";

fn filter(debug: bool) -> EnvFilter {
    let default = if debug {
        "toptalk=debug,toptalk_core=debug,toptalk_feeds=debug"
    } else {
        "toptalk=info,toptalk_core=info,toptalk_feeds=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Keep the returned guard alive for the life
/// of the process or buffered file output is lost.
///
/// Must run after daemonizing: the file writer owns a background thread.
pub fn init(dir: &Path, debug: bool, foreground: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(filter(debug));

    let stderr_layer = foreground.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter(debug))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(guard)
}
