//! HTTP webhook delivery

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::quota::{QuotaCounters, QuotaDimension};

use super::config::WebhookConfig;
use super::types::{ChannelError, ChannelMessageResponse, Recipient};
use super::Channel;

pub(super) const REF_TAG_HEADER: &str = "X-Ref-Tag";
const DELIVERY_ID_HEADER: &str = "X-Delivery-Id";

/// Body posted to webhook endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEnvelope<'a> {
    ref_tag: &'a str,
    recipient: &'a str,
    delivery_id: Uuid,
    sent_at: DateTime<Utc>,
    message: &'a Value,
}

/// Posts the message as JSON to the URL in the recipient address
/// (`webhook:https://hooks.example.com/notify`).
pub struct WebhookChannel {
    client: Client,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ChannelError::Configuration(format!("webhook client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn scheme(&self) -> &str {
        "webhook"
    }

    fn kind(&self) -> QuotaDimension {
        QuotaDimension::Webhook
    }

    async fn send(
        &self,
        ref_tag: &str,
        recipient: &Recipient,
        payload: &Value,
        _counters: &QuotaCounters,
    ) -> ChannelMessageResponse {
        let url = match parse_http_url(recipient.address()) {
            Some(url) => url,
            None => {
                return ChannelMessageResponse::bad_request(format!(
                    "invalid webhook url: {}",
                    recipient.address()
                ))
            }
        };

        let envelope = WebhookEnvelope {
            ref_tag,
            recipient: recipient.identifier(),
            delivery_id: Uuid::new_v4(),
            sent_at: Utc::now(),
            message: payload,
        };

        let result = self
            .client
            .post(url)
            .header(REF_TAG_HEADER, ref_tag)
            .header(DELIVERY_ID_HEADER, envelope.delivery_id.to_string())
            .json(&envelope)
            .send()
            .await;

        let response = http_outcome(result);
        if !response.is_ok() {
            tracing::debug!(
                ref_tag = %ref_tag,
                delivery_id = %envelope.delivery_id,
                status_code = response.status_code,
                status_text = %response.status_text,
                "Webhook delivery failed"
            );
        }
        response
    }
}

/// Accept only absolute http(s) URLs
pub(super) fn parse_http_url(address: &str) -> Option<Url> {
    Url::parse(address)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Map an HTTP exchange onto a recipient outcome.
///
/// Any 2xx is OK; other statuses are passed through; transport failures
/// become 504 (timeout) or 502.
pub(super) fn http_outcome(
    result: Result<reqwest::Response, reqwest::Error>,
) -> ChannelMessageResponse {
    match result {
        Ok(response) if response.status().is_success() => ChannelMessageResponse::ok(),
        Ok(response) => {
            let status = response.status();
            ChannelMessageResponse::new(
                status.as_u16(),
                status
                    .canonical_reason()
                    .unwrap_or("endpoint rejected delivery"),
            )
        }
        Err(e) if e.is_timeout() => {
            ChannelMessageResponse::gateway_timeout(format!("endpoint timed out: {e}"))
        }
        Err(e) => ChannelMessageResponse::bad_gateway(format!("endpoint unreachable: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn channel(timeout_ms: u64) -> WebhookChannel {
        WebhookChannel::new(&WebhookConfig {
            timeout_ms,
            ..WebhookConfig::default()
        })
        .unwrap()
    }

    fn recipient(url: &str) -> Recipient {
        Recipient::parse(&format!("webhook:{url}")).unwrap()
    }

    #[tokio::test]
    async fn test_successful_delivery_posts_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hook")
                    .header("X-Ref-Tag", "ref-42")
                    .json_body_partial(r#"{"refTag": "ref-42", "message": {"text": "hi"}}"#);
                then.status(202);
            })
            .await;

        let response = channel(1_000)
            .send(
                "ref-42",
                &recipient(&server.url("/hook")),
                &json!({"text": "hi"}),
                &QuotaCounters::new(),
            )
            .await;

        mock.assert_async().await;
        assert_eq!(response, ChannelMessageResponse::ok());
    }

    #[tokio::test]
    async fn test_rejection_keeps_remote_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(410);
            })
            .await;

        let response = channel(1_000)
            .send(
                "ref",
                &recipient(&server.url("/hook")),
                &Value::Null,
                &QuotaCounters::new(),
            )
            .await;

        assert_eq!(response.status_code, 410);
        assert_eq!(response.status_text, "Gone");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_gateway_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/slow");
                then.status(200).delay(Duration::from_millis(500));
            })
            .await;

        let response = channel(50)
            .send(
                "ref",
                &recipient(&server.url("/slow")),
                &Value::Null,
                &QuotaCounters::new(),
            )
            .await;

        assert_eq!(response.status_code, ChannelMessageResponse::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_bad_gateway() {
        let response = channel(1_000)
            .send(
                "ref",
                &recipient("http://127.0.0.1:1/hook"),
                &Value::Null,
                &QuotaCounters::new(),
            )
            .await;

        assert_eq!(response.status_code, ChannelMessageResponse::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_invalid_url_is_bad_request() {
        let response = channel(1_000)
            .send("ref", &recipient("ftp://files"), &Value::Null, &QuotaCounters::new())
            .await;
        assert_eq!(response.status_code, ChannelMessageResponse::BAD_REQUEST);
    }
}
