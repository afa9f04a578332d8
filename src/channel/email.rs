//! SMTP email delivery

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;

use crate::quota::{QuotaCounters, QuotaDimension};

use super::config::EmailConfig;
use super::types::{payload_text, ChannelError, ChannelMessageResponse, Recipient};
use super::Channel;

/// Submits a plain-text email to the configured SMTP relay.
///
/// The subject comes from the payload's `subject` field when present,
/// otherwise it is derived from the ref tag.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self, ChannelError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| ChannelError::Configuration(format!("invalid email sender: {e}")))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
                .port(config.smtp_port)
                .timeout(Some(Duration::from_millis(config.timeout_ms)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn compose(&self, ref_tag: &str, to: Mailbox, payload: &Value) -> Result<Message, String> {
        let subject = payload
            .get("subject")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Notification {ref_tag}"));

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(payload_text(payload))
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn scheme(&self) -> &str {
        "email"
    }

    fn kind(&self) -> QuotaDimension {
        QuotaDimension::Email
    }

    async fn send(
        &self,
        ref_tag: &str,
        recipient: &Recipient,
        payload: &Value,
        _counters: &QuotaCounters,
    ) -> ChannelMessageResponse {
        let to: Mailbox = match recipient.address().parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                return ChannelMessageResponse::bad_request(format!(
                    "invalid email address {}: {e}",
                    recipient.address()
                ))
            }
        };

        let message = match self.compose(ref_tag, to, payload) {
            Ok(message) => message,
            Err(e) => return ChannelMessageResponse::bad_request(format!("cannot build email: {e}")),
        };

        match self.transport.send(message).await {
            Ok(_) => ChannelMessageResponse::ok(),
            Err(e) if e.is_transient() => {
                ChannelMessageResponse::unavailable(format!("smtp relay deferred: {e}"))
            }
            Err(e) if e.is_timeout() => {
                ChannelMessageResponse::gateway_timeout(format!("smtp relay timed out: {e}"))
            }
            Err(e) => ChannelMessageResponse::bad_gateway(format!("smtp relay rejected: {e}")),
        }
    }
}
