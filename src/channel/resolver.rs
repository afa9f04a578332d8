//! Scheme-keyed channel registry

use std::sync::Arc;

use dashmap::DashMap;

use super::types::{ChannelError, Recipient};
use super::Channel;

/// Maps recipient schemes to channel implementations.
#[derive(Default)]
pub struct ChannelResolver {
    channels: DashMap<String, Arc<dyn Channel>>,
}

impl ChannelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_channel(self, channel: Arc<dyn Channel>) -> Self {
        self.register(channel);
        self
    }

    /// Register `channel` under its scheme, returning any channel it replaced
    pub fn register(&self, channel: Arc<dyn Channel>) -> Option<Arc<dyn Channel>> {
        let scheme = channel.scheme().to_ascii_lowercase();
        let previous = self.channels.insert(scheme.clone(), channel);
        if previous.is_some() {
            tracing::info!(scheme = %scheme, "Replaced registered channel");
        }
        previous
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<_> = self.channels.iter().map(|e| e.key().clone()).collect();
        schemes.sort();
        schemes
    }

    /// Resolve a recipient identifier to its channel
    pub fn resolve(
        &self,
        identifier: &str,
    ) -> Result<(Arc<dyn Channel>, Recipient), ChannelError> {
        let recipient = Recipient::parse(identifier)?;
        let channel = self
            .channels
            .get(recipient.scheme())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChannelError::UnknownChannelKind(recipient.scheme().to_string()))?;
        Ok((channel, recipient))
    }
}

impl std::fmt::Debug for ChannelResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelResolver")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::channel::ChannelMessageResponse;
    use crate::quota::{QuotaCounters, QuotaDimension};

    struct NamedChannel(&'static str, &'static str);

    #[async_trait]
    impl Channel for NamedChannel {
        fn scheme(&self) -> &str {
            self.0
        }

        fn kind(&self) -> QuotaDimension {
            QuotaDimension::Chat
        }

        async fn send(
            &self,
            _ref_tag: &str,
            _recipient: &Recipient,
            _payload: &Value,
            _counters: &QuotaCounters,
        ) -> ChannelMessageResponse {
            ChannelMessageResponse::new(200, self.1)
        }
    }

    #[tokio::test]
    async fn test_resolve_by_scheme() {
        let resolver = ChannelResolver::new().with_channel(Arc::new(NamedChannel("chat", "first")));

        let (channel, recipient) = resolver.resolve("CHAT:#ops").unwrap();
        assert_eq!(channel.scheme(), "chat");
        assert_eq!(recipient.address(), "#ops");

        let response = channel
            .send("ref", &recipient, &Value::Null, &QuotaCounters::new())
            .await;
        assert_eq!(response.status_text, "first");
    }

    #[test]
    fn test_unknown_scheme() {
        let resolver = ChannelResolver::new().with_channel(Arc::new(NamedChannel("chat", "first")));
        let err = resolver.resolve("fax:+15551234").err().unwrap();
        assert_eq!(err, ChannelError::UnknownChannelKind("fax".to_string()));
    }

    #[test]
    fn test_invalid_identifier() {
        let resolver = ChannelResolver::new();
        assert!(matches!(
            resolver.resolve("no-scheme-here"),
            Err(ChannelError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_register_replaces_existing() {
        let resolver = ChannelResolver::new().with_channel(Arc::new(NamedChannel("chat", "first")));
        let previous = resolver.register(Arc::new(NamedChannel("chat", "second")));
        assert!(previous.is_some());
        assert_eq!(resolver.schemes(), vec!["chat"]);

        let (channel, recipient) = resolver.resolve("chat:#ops").unwrap();
        let response = channel
            .send("ref", &recipient, &Value::Null, &QuotaCounters::new())
            .await;
        assert_eq!(response.status_text, "second");
    }
}
