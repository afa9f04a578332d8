//! Chat delivery through an incoming-webhook style gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;

use crate::quota::{QuotaCounters, QuotaDimension};

use super::config::ChatConfig;
use super::types::{payload_text, ChannelError, ChannelMessageResponse, Recipient};
use super::webhook::{http_outcome, parse_http_url, REF_TAG_HEADER};
use super::Channel;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatPost<'a> {
    channel: &'a str,
    text: String,
    ref_tag: &'a str,
}

/// Posts `{channel, text, refTag}` to the configured gateway.
/// The recipient address is the chat channel name (`chat:#ops`).
pub struct ChatChannel {
    client: Client,
    endpoint: Option<Url>,
}

impl ChatChannel {
    pub fn new(config: &ChatConfig) -> Result<Self, ChannelError> {
        let endpoint = match config.endpoint.as_deref() {
            Some(raw) => Some(parse_http_url(raw).ok_or_else(|| {
                ChannelError::Configuration(format!("invalid chat endpoint: {raw}"))
            })?),
            None => None,
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ChannelError::Configuration(format!("chat client: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Channel for ChatChannel {
    fn scheme(&self) -> &str {
        "chat"
    }

    fn kind(&self) -> QuotaDimension {
        QuotaDimension::Chat
    }

    async fn send(
        &self,
        ref_tag: &str,
        recipient: &Recipient,
        payload: &Value,
        _counters: &QuotaCounters,
    ) -> ChannelMessageResponse {
        let Some(endpoint) = &self.endpoint else {
            return ChannelMessageResponse::unavailable("chat gateway not configured");
        };

        let post = ChatPost {
            channel: recipient.address(),
            text: payload_text(payload),
            ref_tag,
        };

        let result = self
            .client
            .post(endpoint.clone())
            .header(REF_TAG_HEADER, ref_tag)
            .json(&post)
            .send()
            .await;

        http_outcome(result)
    }
}
