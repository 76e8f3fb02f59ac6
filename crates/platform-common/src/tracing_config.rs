//! `tracing` bootstrap, grounded on `rust-common::tracing_config` from the
//! auth-platform teacher: one struct, one `init` function, called once from
//! `main`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing configuration for the control plane binary.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to every span.
    pub service_name: String,
    /// Default log level filter, overridden by `RUST_LOG` if set.
    pub log_level: String,
    /// Emit JSON instead of human-readable output.
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "kms-api".to_string(),
            log_level: "info".to_string(),
            json_output: true,
        }
    }
}

impl TracingConfig {
    /// Override the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Override the default log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switch to pretty (non-JSON) output, typically for local development.
    #[must_use]
    pub const fn with_pretty_output(mut self) -> Self {
        self.json_output = false;
        self
    }
}

/// Install the global `tracing` subscriber. Idempotent: a second call is a
/// harmless no-op (`try_init` swallows the "already set" error).
pub fn init_tracing(config: &TracingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_output {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_json() {
        let config = TracingConfig::default();
        assert!(config.json_output);
        assert_eq!(config.service_name, "kms-api");
    }

    #[test]
    fn builder_overrides_apply() {
        let config = TracingConfig::default()
            .with_service_name("custom")
            .with_log_level("debug")
            .with_pretty_output();

        assert_eq!(config.service_name, "custom");
        assert_eq!(config.log_level, "debug");
        assert!(!config.json_output);
    }
}
