//! Process-wide quota accounting.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::metrics::QuotaMetrics;

use super::config::{QuotaBudget, QuotaConfig, QuotaPolicy};
use super::counters::{QuotaCounters, QuotaDimension, QuotaUsage};

/// Amounts held back by a successful strict-mode admission.
///
/// Must be handed back to [`QuotaAccountant::finalize`] once dispatch completes.
#[derive(Debug)]
#[must_use = "a reservation must be finalized or the reserved quota leaks"]
pub struct QuotaReservation {
    amounts: QuotaUsage,
}

impl QuotaReservation {
    pub fn amounts(&self) -> &QuotaUsage {
        &self.amounts
    }
}

/// Point-in-time view of the accountant for stats endpoints
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    pub policy: QuotaPolicy,
    pub usage: QuotaUsage,
    pub reserved: QuotaUsage,
    pub budget: QuotaBudget,
}

/// Cumulative quota usage shared by every in-flight and completed request.
///
/// `current` only ever grows; expiry or windowing belongs to whoever owns the
/// accountant. All operations are safe under arbitrary concurrent callers.
#[derive(Debug)]
pub struct QuotaAccountant {
    current: QuotaCounters,
    /// Strict-mode amounts admitted but not yet finalized
    reserved: QuotaCounters,
    budget: QuotaBudget,
    policy: QuotaPolicy,
    /// Serializes strict-mode reserve and finalize
    reserve_gate: Mutex<()>,
}

impl QuotaAccountant {
    pub fn new(config: QuotaConfig) -> Self {
        Self::with_usage(config, QuotaUsage::default())
    }

    /// Create an accountant whose current usage starts at `usage`
    pub fn with_usage(config: QuotaConfig, usage: QuotaUsage) -> Self {
        Self {
            current: QuotaCounters::from_usage(&usage),
            reserved: QuotaCounters::new(),
            budget: config.budget,
            policy: config.policy,
            reserve_gate: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    pub fn budget(&self) -> &QuotaBudget {
        &self.budget
    }

    /// True iff `current + reserved + projected <= budget` for every capped
    /// dimension. Each dimension is read atomically on its own.
    pub fn is_admissible(&self, projected: &QuotaCounters) -> bool {
        QuotaDimension::ALL
            .iter()
            .all(|&dimension| self.fits(dimension, projected.get(dimension)))
    }

    fn fits(&self, dimension: QuotaDimension, amount: u64) -> bool {
        match self.budget.limit(dimension) {
            None => true,
            Some(limit) => self
                .current
                .get(dimension)
                .saturating_add(self.reserved.get(dimension))
                .saturating_add(amount)
                <= limit,
        }
    }

    /// Add `counters` into the running total, dimension by dimension
    pub fn commit(&self, counters: &QuotaCounters) {
        for dimension in QuotaDimension::ALL {
            let amount = counters.get(dimension);
            if amount > 0 {
                self.current.add(dimension, amount);
                QuotaMetrics::record_committed(dimension, amount);
            }
        }
    }

    /// Atomically check admissibility and hold `projected` against the budget.
    ///
    /// Returns `None` without reserving anything when the request would not
    /// fit.
    pub fn try_reserve(&self, projected: &QuotaCounters) -> Option<QuotaReservation> {
        let _gate = self
            .reserve_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.is_admissible(projected) {
            return None;
        }

        let amounts = projected.usage();
        for dimension in QuotaDimension::ALL {
            self.reserved.add(dimension, amounts.get(dimension));
        }
        Some(QuotaReservation { amounts })
    }

    /// Release a reservation and commit the realized `counters`.
    pub fn finalize(&self, reservation: QuotaReservation, counters: &QuotaCounters) {
        let _gate = self
            .reserve_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Commit before releasing so lock-free readers never under-count
        self.commit(counters);
        for dimension in QuotaDimension::ALL {
            self.reserved.sub(dimension, reservation.amounts.get(dimension));
        }
    }

    pub fn usage(&self) -> QuotaUsage {
        self.current.usage()
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        QuotaSnapshot {
            policy: self.policy,
            usage: self.current.usage(),
            reserved: self.reserved.usage(),
            budget: self.budget,
        }
    }
}
