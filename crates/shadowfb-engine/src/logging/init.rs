use std::sync::Once;

/// Logger configuration for a host that has not installed its own logger.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "shadowfb_engine=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Never,
        }
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger once.
///
/// Subsequent calls are ignored, as is the case where the host process already
/// registered a `log` backend.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            log::debug!("a logger is already installed; keeping it");
            return;
        }

        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_ignored() {
        init_logging(LoggingConfig {
            env_filter: Some("shadowfb_engine=trace".into()),
            ..Default::default()
        });
        init_logging(LoggingConfig::default());
        log::debug!("still logging");
    }
}
