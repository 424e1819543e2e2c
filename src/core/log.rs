use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber.
///
/// The service and request tracing log at info by default and at debug with
/// `verbose`. `RUST_LOG`, when set, narrows everything further.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let service_targets = Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), level)
        .with_target("tower_http", level)
        .with_default(LevelFilter::WARN);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(service_targets)
        .with(env_filter)
        .init();
}
