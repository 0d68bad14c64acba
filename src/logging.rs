// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup for host applications.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{CoordinatorConfig, LogFormat, DEFAULT_LOG_FILTER};

/// Error returned when a global subscriber is already installed.
pub type InitError = tracing_subscriber::util::TryInitError;

/// Build the level filter from `RUST_LOG`, falling back to `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global tracing subscriber.
///
/// Call once at startup; a second call returns an error and leaves the
/// existing subscriber in place.
pub fn init_tracing(format: LogFormat) -> Result<(), InitError> {
    let layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init()
}

/// Install the global subscriber in the configured `LOG_FORMAT`.
pub fn init_from_config(config: &CoordinatorConfig) -> Result<(), InitError> {
    init_tracing(config.log_format)
}
