use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter used when `RUST_LOG` is unset: the crate at info (debug when verbose),
/// everything else at warn.
fn default_filter(verbose: bool) -> Targets {
    let level_filter = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    Targets::new()
        .with_target("kurs_emas", level_filter)
        .with_default(LevelFilter::WARN)
}

/// Exactly one of the two filters is active; a set `RUST_LOG` replaces the default.
fn select_filters(
    verbose: bool,
    env_filter: Option<EnvFilter>,
) -> (Option<Targets>, Option<EnvFilter>) {
    match env_filter {
        Some(env_filter) => (None, Some(env_filter)),
        None => (Some(default_filter(verbose)), None),
    }
}

/// Installs the global subscriber.
pub fn init_logging(verbose: bool) {
    let (app_filter, env_filter) = select_filters(verbose, EnvFilter::try_from_default_env().ok());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(app_filter)
        .with(env_filter)
        .init();
}
