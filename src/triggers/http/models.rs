//! Request/response models for the HTTP trigger

use serde::Serialize;

use crate::dispatch::{DispatchResult, RecipientOutcome};

/// Response body for a dispatch request.
///
/// Admitted dispatches carry one entry per recipient. A rejected dispatch
/// carries no `recipients`, only the batch-level status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub ref_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<RecipientOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
}

impl From<DispatchResult> for DispatchResponse {
    fn from(result: DispatchResult) -> Self {
        if result.is_rejected() {
            Self {
                ref_tag: result.ref_tag,
                recipients: None,
                status_code: Some(result.status.status_code()),
                status_text: Some(result.status.status_text().to_string()),
            }
        } else {
            Self {
                ref_tag: result.ref_tag,
                recipients: Some(result.recipients),
                status_code: None,
                status_text: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channel::ChannelMessageResponse;

    #[test]
    fn test_rejected_response_has_no_recipients() {
        let response = DispatchResponse::from(DispatchResult::rejected("r-429".into()));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"refTag": "r-429", "statusCode": 429, "statusText": "quota exceeded"})
        );
    }

    #[test]
    fn test_admitted_response_lists_recipients() {
        let result = DispatchResult::aggregate(
            "r-1".into(),
            vec![RecipientOutcome {
                recipient: "chat:#ops".into(),
                response: ChannelMessageResponse::bad_gateway("down"),
            }],
        );
        assert_eq!(
            serde_json::to_value(DispatchResponse::from(result)).unwrap(),
            json!({
                "refTag": "r-1",
                "recipients": [{"recipient": "chat:#ops", "statusCode": 502, "statusText": "down"}]
            })
        );
    }
}
