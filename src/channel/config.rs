//! Delivery channel configuration

use serde::Deserialize;

/// Configuration for the webhook channel
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Whole-request timeout in milliseconds
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// User-Agent header sent with every delivery
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Configuration for the SMTP email channel
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Sender mailbox, e.g. `Ara <noreply@example.com>`
    #[serde(default = "default_from")]
    pub from: String,
    /// Optional relay credentials
    pub username: Option<String>,
    pub password: Option<String>,
    /// SMTP command timeout in milliseconds
    #[serde(default = "default_smtp_timeout_ms")]
    pub timeout_ms: u64,
}

/// Configuration for the chat gateway channel
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Incoming-webhook style gateway endpoint. Chat sends fail with 503 when unset.
    pub endpoint: Option<String>,
    /// Whole-request timeout in milliseconds
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

/// All channel configuration, one section per channel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_http_timeout_ms() -> u64 {
    10_000 // 10 seconds
}

fn default_user_agent() -> String {
    concat!("ara-fanout-service/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_from() -> String {
    "Ara Notifications <noreply@ara.local>".to_string()
}

fn default_smtp_timeout_ms() -> u64 {
    30_000 // 30 seconds
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from: default_from(),
            username: None,
            password: None,
            timeout_ms: default_smtp_timeout_ms(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_http_timeout_ms(),
        }
    }
}
