use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::channel::ChannelsConfig;
use crate::dispatch::DispatchConfig;
use crate::quota::QuotaConfig;

/// Service settings.
///
/// Sources, later ones overriding earlier ones: built-in defaults,
/// `config/default`, `config/{RUN_MODE}`, then `ARA_`-prefixed environment
/// variables with `__` between path segments, e.g.
/// `ARA_QUOTA__BUDGET__MESSAGES=1000` or `ARA_DISPATCH__SEND_TIMEOUT_MS=5000`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// When set, `X-API-Key` must match on every `/api/v1` request
    pub key: Option<String>,
}

/// OpenTelemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    /// Export spans over OTLP
    #[serde(default)]
    pub enabled: bool,
    /// OTLP gRPC endpoint
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    /// Service name reported in traces
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Trace sampling ratio (0.0 - 1.0)
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_body_limit() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "ara-fanout-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("quota.policy", "soft")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            .add_source(
                Environment::with_prefix("ARA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{QuotaDimension, QuotaPolicy};

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.server_addr(), "0.0.0.0:8081");
        assert!(settings.api.key.is_none());
        assert_eq!(settings.quota.policy, QuotaPolicy::Soft);
        assert!(settings.dispatch.max_concurrent_sends.is_none());
        assert!(settings.dispatch.send_timeout_ms.is_none());
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_deserialize_from_layered_source() {
        let settings: Settings = Config::builder()
            .set_default("server.port", 9000)
            .unwrap()
            .set_override("quota.policy", "strict")
            .unwrap()
            .set_override("quota.budget.messages", 10)
            .unwrap()
            .set_override("dispatch.send_timeout_ms", 250)
            .unwrap()
            .set_override("channels.chat.endpoint", "http://chat.internal/hook")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.quota.policy, QuotaPolicy::Strict);
        assert_eq!(settings.quota.budget.limit(QuotaDimension::Messages), Some(10));
        assert_eq!(settings.quota.budget.limit(QuotaDimension::Email), None);
        assert_eq!(settings.dispatch.send_timeout_ms, Some(250));
        assert_eq!(
            settings.channels.chat.endpoint.as_deref(),
            Some("http://chat.internal/hook")
        );
        assert_eq!(settings.channels.email.smtp_port, 25);
    }
}
