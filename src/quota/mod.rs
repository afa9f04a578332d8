//! Quota admission control.
//!
//! A dispatch builds one projected [`QuotaCounters`] per message, asks the
//! shared [`QuotaAccountant`] whether it fits the budget, and commits it once
//! every recipient has been attempted.
//!
//! # Policies
//!
//! - `Soft`: `is_admissible` then `commit`. The two calls are separate, so two
//!   concurrent requests can both pass admission and jointly overrun the
//!   budget. Accepted as a soft quota.
//! - `Strict`: `try_reserve` then `finalize`. Admission is one atomic
//!   check-and-reserve, so projected usage never overruns the budget.
//!   Anything a channel charges while sending is not reserved and may push
//!   a dimension past its cap; that dimension then refuses further messages.

mod accountant;
mod config;
mod counters;

pub use accountant::{QuotaAccountant, QuotaReservation, QuotaSnapshot};
pub use config::{QuotaBudget, QuotaConfig, QuotaPolicy};
pub use counters::{QuotaCounters, QuotaDimension, QuotaUsage};
