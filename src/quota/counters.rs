//! Quota dimensions and lock-free per-dimension counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A named counter tracked for admission control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaDimension {
    /// One per recipient delivery attempt, whatever the channel
    Messages,
    /// Sends through the email channel
    Email,
    /// Sends through the webhook channel
    Webhook,
    /// Sends through the chat channel
    Chat,
}

impl QuotaDimension {
    /// Number of tracked dimensions
    pub const COUNT: usize = 4;

    /// Every dimension, in index order
    pub const ALL: [QuotaDimension; Self::COUNT] = [
        QuotaDimension::Messages,
        QuotaDimension::Email,
        QuotaDimension::Webhook,
        QuotaDimension::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaDimension::Messages => "messages",
            QuotaDimension::Email => "email",
            QuotaDimension::Webhook => "webhook",
            QuotaDimension::Chat => "chat",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain per-dimension amounts, used for snapshots, seeding and reservations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub email: u64,
    #[serde(default)]
    pub webhook: u64,
    #[serde(default)]
    pub chat: u64,
}

impl QuotaUsage {
    pub fn get(&self, dimension: QuotaDimension) -> u64 {
        match dimension {
            QuotaDimension::Messages => self.messages,
            QuotaDimension::Email => self.email,
            QuotaDimension::Webhook => self.webhook,
            QuotaDimension::Chat => self.chat,
        }
    }

    pub fn set(&mut self, dimension: QuotaDimension, value: u64) {
        match dimension {
            QuotaDimension::Messages => self.messages = value,
            QuotaDimension::Email => self.email = value,
            QuotaDimension::Webhook => self.webhook = value,
            QuotaDimension::Chat => self.chat = value,
        }
    }

    /// Builder-style setter, handy for seeding budgets and usage
    pub fn with(mut self, dimension: QuotaDimension, value: u64) -> Self {
        self.set(dimension, value);
        self
    }
}

/// Mutable bag of quota counters.
///
/// Every dimension is an independent atomic, so concurrent increments from
/// parallel send tasks never lose updates. Reads are consistent per dimension
/// only; there is no cross-dimension snapshot isolation.
#[derive(Debug, Default)]
pub struct QuotaCounters {
    counts: [AtomicU64; QuotaDimension::COUNT],
}

impl QuotaCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counters pre-loaded with the given amounts
    pub fn from_usage(usage: &QuotaUsage) -> Self {
        let counters = Self::new();
        for dimension in QuotaDimension::ALL {
            counters.add(dimension, usage.get(dimension));
        }
        counters
    }

    /// Atomically add `amount` to one dimension
    pub fn add(&self, dimension: QuotaDimension, amount: u64) {
        if amount > 0 {
            self.counts[dimension.index()].fetch_add(amount, Ordering::AcqRel);
        }
    }

    pub fn increment(&self, dimension: QuotaDimension) {
        self.add(dimension, 1);
    }

    /// Atomically subtract `amount`, saturating at zero
    pub(crate) fn sub(&self, dimension: QuotaDimension, amount: u64) {
        if amount == 0 {
            return;
        }
        let _ = self.counts[dimension.index()].fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |current| Some(current.saturating_sub(amount)),
        );
    }

    pub fn get(&self, dimension: QuotaDimension) -> u64 {
        self.counts[dimension.index()].load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        QuotaDimension::ALL.iter().all(|&d| self.get(d) == 0)
    }

    /// Copy the current values out, dimension by dimension
    pub fn usage(&self) -> QuotaUsage {
        let mut usage = QuotaUsage::default();
        for dimension in QuotaDimension::ALL {
            usage.set(dimension, self.get(dimension));
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_dimension_names() {
        let names: Vec<_> = QuotaDimension::ALL.iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["messages", "email", "webhook", "chat"]);
    }

    #[test]
    fn test_add_and_usage() {
        let counters = QuotaCounters::new();
        assert!(counters.is_empty());

        counters.increment(QuotaDimension::Messages);
        counters.add(QuotaDimension::Webhook, 3);

        let usage = counters.usage();
        assert_eq!(usage.messages, 1);
        assert_eq!(usage.webhook, 3);
        assert_eq!(usage.email, 0);
        assert!(!counters.is_empty());
    }

    #[test]
    fn test_sub_saturates() {
        let counters = QuotaCounters::from_usage(&QuotaUsage::default().with(QuotaDimension::Chat, 2));
        counters.sub(QuotaDimension::Chat, 5);
        assert_eq!(counters.get(QuotaDimension::Chat), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counters = Arc::new(QuotaCounters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.increment(QuotaDimension::Messages);
                        counters.increment(QuotaDimension::Email);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.get(QuotaDimension::Messages), 8000);
        assert_eq!(counters.get(QuotaDimension::Email), 8000);
    }

    #[test]
    fn test_usage_deserializes_with_missing_fields() {
        let usage: QuotaUsage = serde_json::from_str(r#"{"messages": 9}"#).unwrap();
        assert_eq!(usage, QuotaUsage::default().with(QuotaDimension::Messages, 9));
    }
}
