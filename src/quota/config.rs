//! Quota configuration

use serde::{Deserialize, Serialize};

use super::counters::QuotaDimension;

/// How admission and accounting interact across concurrent requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPolicy {
    /// Check against a point-in-time snapshot, commit after dispatch.
    /// Concurrent requests may jointly overrun the budget.
    #[default]
    Soft,
    /// Check and reserve atomically before dispatch, finalize after.
    /// Projected usage never overruns the budget; charges a channel adds
    /// during `send` are committed on top of the reservation.
    Strict,
}

/// Limit per dimension. `None` means the dimension is uncapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaBudget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<u64>,
}

impl QuotaBudget {
    pub fn limit(&self, dimension: QuotaDimension) -> Option<u64> {
        match dimension {
            QuotaDimension::Messages => self.messages,
            QuotaDimension::Email => self.email,
            QuotaDimension::Webhook => self.webhook,
            QuotaDimension::Chat => self.chat,
        }
    }

    /// Set the limit for one dimension
    pub fn with_limit(mut self, dimension: QuotaDimension, limit: u64) -> Self {
        let slot = match dimension {
            QuotaDimension::Messages => &mut self.messages,
            QuotaDimension::Email => &mut self.email,
            QuotaDimension::Webhook => &mut self.webhook,
            QuotaDimension::Chat => &mut self.chat,
        };
        *slot = Some(limit);
        self
    }
}

/// Configuration for quota admission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaConfig {
    /// Admission policy: "soft" (default) or "strict"
    #[serde(default)]
    pub policy: QuotaPolicy,
    /// Budget per dimension
    #[serde(default)]
    pub budget: QuotaBudget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_soft_and_uncapped() {
        let config = QuotaConfig::default();
        assert_eq!(config.policy, QuotaPolicy::Soft);
        for dimension in QuotaDimension::ALL {
            assert_eq!(config.budget.limit(dimension), None);
        }
    }

    #[test]
    fn test_deserialize_partial_budget() {
        let config: QuotaConfig =
            serde_json::from_str(r#"{"policy": "strict", "budget": {"messages": 10, "chat": 2}}"#)
                .unwrap();
        assert_eq!(config.policy, QuotaPolicy::Strict);
        assert_eq!(config.budget.limit(QuotaDimension::Messages), Some(10));
        assert_eq!(config.budget.limit(QuotaDimension::Chat), Some(2));
        assert_eq!(config.budget.limit(QuotaDimension::Email), None);
    }
}
