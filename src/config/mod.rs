mod settings;

pub use settings::{ApiConfig, OtelConfig, ServerConfig, Settings};

pub use crate::channel::{ChannelsConfig, ChatConfig, EmailConfig, WebhookConfig};
pub use crate::dispatch::DispatchConfig;
pub use crate::quota::QuotaConfig;
