use std::path::Path;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

use super::filter::CrateLevelFilter;
use super::format::MustakshifFormat;
use crate::config::LoggingConfig;
use crate::error::Context;
use crate::error::Result;

/// Keeps the non-blocking writers flushing. Drop it only at process exit.
#[must_use]
pub struct TracingGuard {
    _guards: Vec<WorkerGuard>,
    pub directory: PathBuf,
}

fn appender(
    directory: &Path,
    engine_name: &str,
) -> RollingFileAppender {
    RollingFileAppender::new(Rotation::DAILY, directory, format!("{}.log", engine_name))
}

pub fn setup_tracing(
    logging_config: &LoggingConfig,
    engine_name: &str,
) -> Result<TracingGuard> {
    let base_logs_dir = PathBuf::from(logging_config.directory.as_deref().unwrap_or(".logs"));
    let debug_dir = base_logs_dir.join("debug");
    let error_dir = base_logs_dir.join("error");

    for dir in [&base_logs_dir, &debug_dir, &error_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("create_logs_directory::{}", dir.display()))?;
    }

    let (non_blocking_debug, debug_guard) = tracing_appender::non_blocking(appender(&debug_dir, engine_name));
    let (non_blocking_error, error_guard) = tracing_appender::non_blocking(appender(&error_dir, engine_name));
    #[allow(unused_mut)]
    let mut guards = vec![debug_guard, error_guard];

    let format = MustakshifFormat::new(engine_name);

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::default()
                .with_ansi(false)
                .event_format(format.clone())
                .with_writer(non_blocking_debug)
                .with_filter(CrateLevelFilter::DEBUG_ONLY),
        )
        .with(
            tracing_subscriber::fmt::Layer::default()
                .with_ansi(false)
                .event_format(format.clone())
                .with_writer(non_blocking_error)
                .with_filter(CrateLevelFilter::ERROR_WARN),
        );

    #[cfg(feature = "prod")]
    let subscriber = subscriber.with(
        tracing_subscriber::fmt::Layer::default()
            .with_ansi(true)
            .event_format(format.clone())
            .with_writer(std::io::stderr)
            .with_filter(CrateLevelFilter::ERROR_ONLY),
    );

    #[cfg(feature = "dev")]
    let subscriber = {
        let (non_blocking_info, info_guard) = tracing_appender::non_blocking(appender(&base_logs_dir, engine_name));
        guards.push(info_guard);

        subscriber
            .with(
                tracing_subscriber::fmt::Layer::default()
                    .with_ansi(true)
                    .event_format(format.clone())
                    .with_writer(std::io::stderr)
                    .with_filter(CrateLevelFilter::INFO_AND_ABOVE),
            )
            .with(
                tracing_subscriber::fmt::Layer::default()
                    .with_ansi(false)
                    .event_format(format.clone())
                    .with_writer(non_blocking_info)
                    .with_filter(CrateLevelFilter::INFO_AND_ABOVE),
            )
    };

    tracing::subscriber::set_global_default(subscriber).context("set_global_tracing_subscriber")?;

    tracing::info!(
        "{}_logging_started::debug_logs::{}::error_logs::{}",
        engine_name,
        debug_dir.display(),
        error_dir.display()
    );

    Ok(TracingGuard {
        _guards: guards,
        directory: base_logs_dir,
    })
}
