pub mod admin; // Reviewer onboarding, settings, payouts, fulfillment
pub mod config;
pub mod db;
pub mod earnings; // Reviewer earnings dashboard
pub mod intake; // Questionnaire submission
pub mod models;
pub mod review; // Review queue and decisions
pub mod screening; // Risk flag engine

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors RUST_LOG, falling back to `config::default_log_filter()`. Safe to
/// call more than once; later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
