//! Delivery channels and recipient resolution.
//!
//! # Channel Architecture
//!
//! Every delivery mechanism implements [`Channel`], a two-operation
//! capability:
//!
//! - `estimate_usage`: record the quota cost of one recipient, no I/O
//! - `send`: attempt delivery and report the outcome
//!
//! Recipients are scheme-qualified (`email:…`, `webhook:…`, `chat:…`) and the
//! [`ChannelResolver`] maps the scheme to a registered channel. Adding a new
//! kind of channel means registering another implementation; the dispatcher
//! does not change.
//!
//! Use `create_channel_resolver()` to build a resolver with the built-in
//! channels from configuration.

mod chat;
mod config;
mod email;
mod resolver;
mod types;
mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::quota::{QuotaCounters, QuotaDimension};

pub use chat::ChatChannel;
pub use config::{ChannelsConfig, ChatConfig, EmailConfig, WebhookConfig};
pub use email::EmailChannel;
pub use resolver::ChannelResolver;
pub use types::{ChannelError, ChannelMessageResponse, Recipient};
pub use webhook::WebhookChannel;

/// A delivery mechanism for one kind of recipient.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Recipient scheme this channel serves, lowercase
    fn scheme(&self) -> &str;

    /// Quota dimension charged per send, in addition to `messages`
    fn kind(&self) -> QuotaDimension;

    /// Add this recipient's quota cost to `accumulator` without sending.
    fn estimate_usage(
        &self,
        _ref_tag: &str,
        _recipient: &Recipient,
        _payload: &Value,
        accumulator: &QuotaCounters,
    ) {
        accumulator.increment(QuotaDimension::Messages);
        accumulator.increment(self.kind());
    }

    /// Attempt delivery.
    ///
    /// Ordinary delivery failures are reported as a non-OK response, never
    /// raised. `counters` is shared with every other send of the same
    /// message and may be incremented concurrently.
    async fn send(
        &self,
        ref_tag: &str,
        recipient: &Recipient,
        payload: &Value,
        counters: &QuotaCounters,
    ) -> ChannelMessageResponse;
}

/// Create a resolver with the built-in email, webhook and chat channels.
pub fn create_channel_resolver(config: &ChannelsConfig) -> Result<ChannelResolver, ChannelError> {
    let resolver = ChannelResolver::new();
    resolver.register(Arc::new(WebhookChannel::new(&config.webhook)?));
    resolver.register(Arc::new(EmailChannel::new(&config.email)?));
    resolver.register(Arc::new(ChatChannel::new(&config.chat)?));

    tracing::info!(
        schemes = ?resolver.schemes(),
        chat_gateway = config.chat.endpoint.is_some(),
        smtp_host = %config.email.smtp_host,
        "Delivery channels registered"
    );

    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_channel_resolver_registers_builtin_schemes() {
        let resolver = create_channel_resolver(&ChannelsConfig::default()).unwrap();
        assert_eq!(resolver.schemes(), vec!["chat", "email", "webhook"]);
    }

    #[test]
    fn test_create_channel_resolver_rejects_bad_sender() {
        let mut config = ChannelsConfig::default();
        config.email.from = "not an address".to_string();
        assert!(matches!(
            create_channel_resolver(&config),
            Err(ChannelError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_estimate_charges_messages_and_kind() {
        let resolver = create_channel_resolver(&ChannelsConfig::default()).unwrap();
        let counters = QuotaCounters::new();

        for identifier in ["email:a@example.com", "chat:#ops", "chat:#dev"] {
            let (channel, recipient) = resolver.resolve(identifier).unwrap();
            channel.estimate_usage("ref-1", &recipient, &Value::Null, &counters);
        }

        assert_eq!(counters.get(QuotaDimension::Messages), 3);
        assert_eq!(counters.get(QuotaDimension::Email), 1);
        assert_eq!(counters.get(QuotaDimension::Chat), 2);
        assert_eq!(counters.get(QuotaDimension::Webhook), 0);
    }
}
