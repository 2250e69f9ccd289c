use shellward_config::DebugConfig;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Targets traced when `[debug].trace_targets` is empty.
const DEFAULT_TRACE_TARGETS: &[&str] = &[
    "shellward",
    "shellward_bash_runner",
    "shellward_config",
    "shellward_commons",
];

/// Install an env-driven subscriber when `RUST_LOG` is set. Returns whether
/// one was installed.
pub(crate) fn initialize_tracing() -> bool {
    if std::env::var("RUST_LOG").is_err() {
        return false;
    }

    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::FULL);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        tracing::warn!(error = %err, "tracing already initialized; skipping env tracing setup");
    }
    true
}

pub(crate) fn initialize_tracing_from_config(debug: &DebugConfig) {
    let filter = debug.filter_directive(DEFAULT_TRACE_TARGETS);
    let env_filter = tracing_subscriber::EnvFilter::new(&filter);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::FULL)
        .with_ansi(false);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => tracing::info!(%filter, "Debug tracing enabled"),
        Err(err) => {
            tracing::warn!(
                error = %err,
                "tracing already initialized; skipping config tracing setup"
            );
        }
    }
}
