use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while mapping a recipient identifier to a channel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("unknown channel kind: {0}")]
    UnknownChannelKind(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("channel configuration error: {0}")]
    Configuration(String),
}

impl ChannelError {
    /// Outcome reported for a recipient that could not be resolved
    pub fn to_response(&self) -> ChannelMessageResponse {
        ChannelMessageResponse::bad_request(self.to_string())
    }
}

/// A scheme-qualified recipient, e.g. `email:ops@example.com`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    identifier: String,
    scheme: String,
    address: String,
}

impl Recipient {
    /// Split an identifier at its first `:` into scheme and address.
    ///
    /// The scheme is matched case-insensitively; the address is kept as-is
    /// apart from surrounding whitespace.
    pub fn parse(identifier: &str) -> Result<Self, ChannelError> {
        let (scheme, address) = identifier
            .split_once(':')
            .ok_or_else(|| ChannelError::InvalidRecipient(format!("{identifier} has no scheme")))?;

        let scheme = scheme.trim().to_ascii_lowercase();
        let address = address.trim();
        if scheme.is_empty() {
            return Err(ChannelError::InvalidRecipient(format!(
                "{identifier} has an empty scheme"
            )));
        }
        if address.is_empty() {
            return Err(ChannelError::InvalidRecipient(format!(
                "{identifier} has an empty address"
            )));
        }

        Ok(Self {
            identifier: identifier.to_string(),
            scheme,
            address: address.to_string(),
        })
    }

    /// The identifier exactly as declared in the message
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Outcome of delivering to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessageResponse {
    pub status_code: u16,
    pub status_text: String,
}

impl ChannelMessageResponse {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const INTERNAL_ERROR: u16 = 500;
    pub const BAD_GATEWAY: u16 = 502;
    pub const UNAVAILABLE: u16 = 503;
    pub const GATEWAY_TIMEOUT: u16 = 504;

    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Self::OK, "OK")
    }

    pub fn bad_request(text: impl Into<String>) -> Self {
        Self::new(Self::BAD_REQUEST, text)
    }

    pub fn internal_error(text: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, text)
    }

    pub fn bad_gateway(text: impl Into<String>) -> Self {
        Self::new(Self::BAD_GATEWAY, text)
    }

    pub fn unavailable(text: impl Into<String>) -> Self {
        Self::new(Self::UNAVAILABLE, text)
    }

    pub fn gateway_timeout(text: impl Into<String>) -> Self {
        Self::new(Self::GATEWAY_TIMEOUT, text)
    }

    /// Any 2xx code is a successful delivery
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Best-effort plain text rendering of an opaque payload.
///
/// Strings are used verbatim; objects contribute their `text` or `body`
/// field; anything else is rendered as compact JSON.
pub(crate) fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(fields) => ["text", "body"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}
