//! Logging configuration for IndoRAG

use std::path::Path;

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::config::AppConfig;
use crate::Result;

/// Initialize logging from the application configuration.
///
/// Console output always goes to stderr; when `logging.file_output` is set,
/// a daily-rolling file under `logs/` is added as a second layer.
pub fn init_logging(config: Option<&AppConfig>) -> Result<()> {
    let level = config.map_or("info", |c| c.logging.level.as_str());
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},indorag={level}")));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.is_some_and(|c| c.logging.file_output) {
        let logs_dir = Path::new("logs");
        if !logs_dir.exists() {
            std::fs::create_dir_all(logs_dir)?;
        }

        let file_appender = tracing_appender::rolling::daily("logs", "indorag.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);

        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        // Keep the appender guard alive for the process lifetime
        std::mem::forget(guard);

        tracing::info!("Logging initialized with level: {level} - console and file output enabled");
        tracing::info!("Log files will be saved to: logs/indorag.log.YYYY-MM-DD");
    } else {
        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .init();

        tracing::debug!("Logging initialized with level: {level}");
    }

    Ok(())
}

/// Initialize logging with a custom log level, overriding the configuration.
pub fn init_logging_with_level(level: &str) -> Result<()> {
    let env_filter = EnvFilter::new(format!("{level},indorag={level}"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    tracing::debug!("Logging initialized with level: {level}");
    Ok(())
}

/// Initialize simple logging for testing
pub fn init_simple_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_initialization() {
        // Only checks that initialization does not panic; a second call in the
        // same process returns an error from the global subscriber, which is fine.
        let _ = init_simple_logging();
    }
}
