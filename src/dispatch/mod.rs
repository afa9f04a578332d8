//! Multi-recipient dispatch with quota admission.
//!
//! # State Machine
//!
//! ```text
//! Parsed -> QuotaChecking -> Rejected                      (429, nothing sent or committed)
//!                         -> Dispatching -> Aggregating -> Committed -> Responded
//! ```
//!
//! Per-recipient failures (unknown channel, delivery error, panic inside a
//! channel) stay local to that recipient. Only malformed input and quota
//! exhaustion fail the whole batch. Nothing is retried.

mod config;
mod orchestrator;
mod types;

pub use config::DispatchConfig;
pub use orchestrator::{DispatchOrchestrator, DispatcherStats, DispatcherStatsSnapshot};
pub use types::{
    DispatchResult, DispatchStatus, MessageError, NotificationMessage, RecipientOutcome,
};
