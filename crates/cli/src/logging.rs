use lunchly_core::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so stdout stays a clean
/// JSON command outcome. `RUST_LOG` wins over the configured level when set.
///
/// Calling this twice is harmless; the second subscriber is rejected and the
/// error is returned to the caller.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))
}

#[cfg(test)]
mod tests {
    use lunchly_core::config::{LogFormat, LoggingConfig};

    #[test]
    fn second_init_reports_an_error_instead_of_panicking() {
        let config = LoggingConfig { level: "debug".to_string(), format: LogFormat::Json };

        let _ = super::init(&config);
        assert!(super::init(&config).is_err());
    }
}
