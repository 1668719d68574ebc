use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppSettings;
use crate::core::{AppError, Result};

/// Default filter when `RUST_LOG` is not set
pub fn default_directives(settings: &AppSettings) -> String {
    format!(
        "service_layout={},actix_web=info,sqlx=warn",
        settings.logging_level
    )
}

/// Install the global tracing subscriber.
///
/// Debug builds of the settings get the human-readable formatter, everything
/// else logs JSON lines.
pub fn init_tracing(settings: &AppSettings) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(settings).into());

    let pretty = settings.debug.then(tracing_subscriber::fmt::layer);
    let json = (!settings.debug).then(|| tracing_subscriber::fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
        .map_err(|e| AppError::configuration(format!("Failed to initialize tracing: {}", e)))
}
