//! Fan-out configuration

use std::time::Duration;

use serde::Deserialize;

/// Limits applied to the per-recipient fan-out.
///
/// Both are unset by default: every recipient is sent concurrently and a slow
/// channel delays the whole batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchConfig {
    /// Maximum in-flight sends per dispatch
    #[serde(default)]
    pub max_concurrent_sends: Option<usize>,
    /// Per-send timeout in milliseconds; an expired send reports 504
    #[serde(default)]
    pub send_timeout_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_ms.map(Duration::from_millis)
    }

    /// Effective in-flight bound, never zero
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent_sends.unwrap_or(usize::MAX).max(1)
    }
}
