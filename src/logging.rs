//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing-subscriber` una sola vez al arrancar. `RUST_LOG`
//! tiene prioridad sobre el nivel configurado.

use crate::config::LogFormat;
use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Instala el subscriber global
pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize logging")
}

/// `RUST_LOG` si está definido; si no, `level`. Un nivel inválido cae a `info`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| {
            eprintln!("Warning: invalid log level '{}', using info", level);
            EnvFilter::new("info")
        })
}
