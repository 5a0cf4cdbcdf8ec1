// stats.rs — Running audit counters.
//
// Stats are an explicit object owned by the auditor instance, never a
// process-wide global. Callers reset them between tasks.

use serde::{Deserialize, Serialize};

use gk_model::AuditResult;

/// Counters for one auditor instance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditStats {
    /// Calls audited.
    pub total: u64,
    /// Calls that passed.
    pub allowed: u64,
    /// Calls that were blocked.
    pub blocked: u64,
    /// Calls whose result demanded explicit confirmation.
    pub confirmed: u64,
}

impl AuditStats {
    /// Fold one final audit outcome into the counters.
    pub fn record(&mut self, result: &AuditResult) {
        self.total += 1;
        if result.allowed {
            self.allowed += 1;
        } else {
            self.blocked += 1;
        }
        if result.require_confirmation {
            self.confirmed += 1;
        }
    }

    /// Zero every counter, for reuse between tasks.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tallies_outcomes() {
        let mut stats = AuditStats::default();
        stats.record(&AuditResult::pass());
        stats.record(&AuditResult::block("no"));
        let mut held = AuditResult::block("confirm first");
        held.require_confirmation = true;
        stats.record(&held);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.blocked, 2);
        assert_eq!(stats.confirmed, 1);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut stats = AuditStats::default();
        stats.record(&AuditResult::pass());
        stats.reset();
        assert_eq!(stats, AuditStats::default());
    }
}
