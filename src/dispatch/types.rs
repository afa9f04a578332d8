use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::channel::ChannelMessageResponse;

/// Reasons an inbound message is refused before dispatch starts
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed notification message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("refTag must not be empty")]
    EmptyRefTag,

    #[error("recipients must not be empty")]
    NoRecipients,
}

/// One logical notification addressed to many recipients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    /// Opaque correlation identifier
    pub ref_tag: String,
    /// Scheme-qualified recipient identifiers, in declaration order.
    /// Duplicates are delivered independently.
    pub recipients: Vec<String>,
    /// Payload handed unmodified to every channel
    pub channel_message: Value,
}

impl NotificationMessage {
    pub fn new(
        ref_tag: impl Into<String>,
        recipients: impl IntoIterator<Item = impl Into<String>>,
        channel_message: Value,
    ) -> Self {
        Self {
            ref_tag: ref_tag.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
            channel_message,
        }
    }

    /// Parse and validate a JSON request body
    pub fn from_slice(body: &[u8]) -> Result<Self, MessageError> {
        let message: Self = serde_json::from_slice(body)?;
        message.validate()?;
        Ok(message)
    }

    pub fn validate(&self) -> Result<(), MessageError> {
        if self.ref_tag.trim().is_empty() {
            return Err(MessageError::EmptyRefTag);
        }
        if self.recipients.is_empty() {
            return Err(MessageError::NoRecipients);
        }
        Ok(())
    }
}

/// Overall outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Every recipient succeeded
    Ok,
    /// At least one recipient failed
    MultiStatus,
    /// Admission failed; nobody was contacted
    QuotaExceeded,
}

impl DispatchStatus {
    /// Transport status code for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchStatus::Ok => 200,
            DispatchStatus::MultiStatus => 207,
            DispatchStatus::QuotaExceeded => 429,
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            DispatchStatus::Ok => "OK",
            DispatchStatus::MultiStatus => "multi-status",
            DispatchStatus::QuotaExceeded => "quota exceeded",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Ok => "ok",
            DispatchStatus::MultiStatus => "multi_status",
            DispatchStatus::QuotaExceeded => "rejected",
        }
    }
}

/// One recipient's entry in the aggregated result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    #[serde(flatten)]
    pub response: ChannelMessageResponse,
}

/// Aggregated result of a dispatch
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub ref_tag: String,
    pub status: DispatchStatus,
    /// First non-2xx recipient status in declaration order
    pub representative_status: Option<u16>,
    /// One entry per declared recipient, in declaration order.
    /// Empty when the dispatch was rejected.
    pub recipients: Vec<RecipientOutcome>,
}

impl DispatchResult {
    /// Aggregate per-recipient outcomes already in declaration order
    pub(crate) fn aggregate(ref_tag: String, recipients: Vec<RecipientOutcome>) -> Self {
        let representative_status = recipients
            .iter()
            .find(|outcome| !outcome.response.is_ok())
            .map(|outcome| outcome.response.status_code);

        let status = match representative_status {
            None => DispatchStatus::Ok,
            Some(_) => DispatchStatus::MultiStatus,
        };

        Self {
            ref_tag,
            status,
            representative_status,
            recipients,
        }
    }

    pub(crate) fn rejected(ref_tag: String) -> Self {
        Self {
            ref_tag,
            status: DispatchStatus::QuotaExceeded,
            representative_status: Some(DispatchStatus::QuotaExceeded.status_code()),
            recipients: Vec::new(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status == DispatchStatus::QuotaExceeded
    }

    pub fn delivered(&self) -> usize {
        self.recipients.iter().filter(|o| o.response.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.recipients.len() - self.delivered()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn outcome(recipient: &str, response: ChannelMessageResponse) -> RecipientOutcome {
        RecipientOutcome {
            recipient: recipient.to_string(),
            response,
        }
    }

    #[test]
    fn test_parse_valid_message() {
        let body = br#"{"refTag": "r1", "recipients": ["email:a@example.com", "chat:#ops"], "channelMessage": {"text": "hi"}}"#;
        let message = NotificationMessage::from_slice(body).unwrap();
        assert_eq!(message.ref_tag, "r1");
        assert_eq!(message.recipients.len(), 2);
        assert_eq!(message.channel_message, json!({"text": "hi"}));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let missing_payload = br#"{"refTag": "r1", "recipients": ["chat:#ops"]}"#;
        assert!(matches!(
            NotificationMessage::from_slice(missing_payload),
            Err(MessageError::Malformed(_))
        ));

        let wrong_type = br#"{"refTag": "r1", "recipients": "chat:#ops", "channelMessage": 1}"#;
        assert!(matches!(
            NotificationMessage::from_slice(wrong_type),
            Err(MessageError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_values() {
        let no_recipients = br#"{"refTag": "r1", "recipients": [], "channelMessage": "x"}"#;
        assert!(matches!(
            NotificationMessage::from_slice(no_recipients),
            Err(MessageError::NoRecipients)
        ));

        let blank_tag = br#"{"refTag": " ", "recipients": ["chat:#a"], "channelMessage": "x"}"#;
        assert!(matches!(
            NotificationMessage::from_slice(blank_tag),
            Err(MessageError::EmptyRefTag)
        ));
    }

    #[test]
    fn test_aggregate_all_ok() {
        let result = DispatchResult::aggregate(
            "r".into(),
            vec![
                outcome("a", ChannelMessageResponse::ok()),
                outcome("b", ChannelMessageResponse::ok()),
            ],
        );
        assert_eq!(result.status, DispatchStatus::Ok);
        assert_eq!(result.representative_status, None);
        assert_eq!(result.delivered(), 2);
    }

    #[test]
    fn test_aggregate_first_failure_is_representative() {
        let result = DispatchResult::aggregate(
            "r".into(),
            vec![
                outcome("a", ChannelMessageResponse::ok()),
                outcome("b", ChannelMessageResponse::gateway_timeout("slow")),
                outcome("c", ChannelMessageResponse::bad_request("bad")),
            ],
        );
        assert_eq!(result.status, DispatchStatus::MultiStatus);
        assert_eq!(result.representative_status, Some(504));
        assert_eq!(result.recipients[2].response.status_code, 400);
        assert_eq!(result.failed(), 2);
    }

    #[test]
    fn test_aggregate_any_2xx_counts_as_delivered() {
        let result = DispatchResult::aggregate(
            "r".into(),
            vec![
                outcome("a", ChannelMessageResponse::new(202, "Accepted")),
                outcome("b", ChannelMessageResponse::new(204, "No Content")),
            ],
        );
        assert_eq!(result.status, DispatchStatus::Ok);
        assert_eq!(result.representative_status, None);
        assert_eq!(result.delivered(), 2);
    }

    #[test]
    fn test_aggregate_all_failed_is_multi_status() {
        let result = DispatchResult::aggregate(
            "r".into(),
            vec![outcome("a", ChannelMessageResponse::bad_gateway("down"))],
        );
        assert_eq!(result.status, DispatchStatus::MultiStatus);
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(outcome("chat:#ops", ChannelMessageResponse::ok())).unwrap();
        assert_eq!(
            value,
            json!({"recipient": "chat:#ops", "statusCode": 200, "statusText": "OK"})
        );
    }
}
