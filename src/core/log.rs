use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber.
///
/// One-shot commands stay silent unless `verbose`; long running ones (the
/// server and its schedulers) log at info so every tick leaves a trace.
/// `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool, long_running: bool) {
    let (level_filter, level) = match (verbose, long_running) {
        (true, _) => (LevelFilter::DEBUG, "debug"),
        (false, true) => (LevelFilter::INFO, "info"),
        (false, false) => (LevelFilter::OFF, "off"),
    };
    let app_filter = Targets::new().with_target("fxtrack", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty())
        .with(app_filter)
        .with(env_filter)
        .init();
}
