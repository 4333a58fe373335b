// SPDX-License-Identifier: Apache-2.0

use tervyx_index_core::{ENV_TERVYX_LOG_JSON, ENV_TERVYX_LOG_LEVEL};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LogFlags {
    pub quiet: bool,
    pub verbose: u8,
    pub json: bool,
}

fn env_bool(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn build_filter(flags: LogFlags) -> EnvFilter {
    match (flags.verbose, flags.quiet) {
        (0, true) => EnvFilter::new("warn"),
        (1, _) => EnvFilter::new("debug"),
        (v, _) if v > 1 => EnvFilter::new("trace"),
        _ => EnvFilter::try_from_env(ENV_TERVYX_LOG_LEVEL)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Installs the process subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub(crate) fn init_tracing(flags: LogFlags) {
    let filter = build_filter(flags);
    if flags.json || env_bool(ENV_TERVYX_LOG_JSON) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
