//! Cooldown policy for timed actions.
//!
//! Two mechanisms share the same decision rule:
//! - Daily claims store their timestamp on the account (durable)
//! - Mining keeps its timestamps in [`MineCooldowns`] (process lifetime only)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Entries are pruned once the table grows past this size
const PRUNE_THRESHOLD: usize = 1024;

/// Whether a timed action may run now
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    Denied { remaining: Duration },
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed)
    }
}

/// Decide whether an action last taken at `last` may be taken at `now`
///
/// If the clock went backwards (`now < last`) the remaining time exceeds
/// `window`, so the answer errs towards denial. A window reaching past the
/// last representable instant is denied for its full length.
pub fn can_act_now(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> CooldownDecision {
    let Some(last) = last else {
        return CooldownDecision::Allowed;
    };

    let Some(ready_at) = last.checked_add_signed(window) else {
        return CooldownDecision::Denied { remaining: window };
    };
    if now >= ready_at {
        CooldownDecision::Allowed
    } else {
        CooldownDecision::Denied {
            remaining: ready_at - now,
        }
    }
}

/// Per-user time of the last successful mine
#[derive(Debug, Default)]
pub struct MineCooldowns {
    last_mined: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MineCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, user_id: &str, now: DateTime<Utc>, window: Duration) -> CooldownDecision {
        let table = self.last_mined.lock().unwrap_or_else(|e| e.into_inner());
        can_act_now(table.get(user_id).copied(), now, window)
    }

    /// Start the user's cooldown at `at`
    pub fn record(&self, user_id: &str, at: DateTime<Utc>, window: Duration) {
        let mut table = self.last_mined.lock().unwrap_or_else(|e| e.into_inner());
        table.insert(user_id.to_string(), at);

        if table.len() > PRUNE_THRESHOLD {
            let before = table.len();
            table.retain(|_, last| !can_act_now(Some(*last), at, window).is_allowed());
            tracing::debug!("Pruned {} expired mine cooldowns", before - table.len());
        }
    }

    pub fn len(&self) -> usize {
        self.last_mined.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_never_acted_is_allowed() {
        assert_eq!(
            can_act_now(None, t0(), Duration::hours(24)),
            CooldownDecision::Allowed
        );
    }

    #[test]
    fn test_inside_window_is_denied_with_remaining() {
        let decision = can_act_now(Some(t0()), t0() + Duration::seconds(29), Duration::seconds(30));
        assert_eq!(
            decision,
            CooldownDecision::Denied {
                remaining: Duration::seconds(1)
            }
        );
    }

    #[test]
    fn test_window_boundary_is_allowed() {
        let window = Duration::hours(24);
        assert!(can_act_now(Some(t0()), t0() + window, window).is_allowed());
        assert!(!can_act_now(Some(t0()), t0() + window - Duration::seconds(1), window).is_allowed());
    }

    #[test]
    fn test_clock_regression_is_denied() {
        let window = Duration::seconds(30);
        let decision = can_act_now(Some(t0()), t0() - Duration::seconds(10), window);
        assert_eq!(
            decision,
            CooldownDecision::Denied {
                remaining: Duration::seconds(40)
            }
        );
    }

    #[test]
    fn test_window_past_max_date_is_denied() {
        let window = Duration::hours(i64::from(u32::MAX));
        let decision = can_act_now(Some(t0()), t0() + Duration::days(400), window);
        assert_eq!(decision, CooldownDecision::Denied { remaining: window });
    }

    #[test]
    fn test_zero_window_allows_same_instant() {
        assert!(can_act_now(Some(t0()), t0(), Duration::zero()).is_allowed());
    }

    #[test]
    fn test_mine_cooldowns_are_per_user() {
        let cooldowns = MineCooldowns::new();
        let window = Duration::seconds(30);
        cooldowns.record("a", t0(), window);

        assert!(!cooldowns.check("a", t0() + Duration::seconds(5), window).is_allowed());
        assert!(cooldowns.check("b", t0() + Duration::seconds(5), window).is_allowed());
        assert!(cooldowns.check("a", t0() + Duration::seconds(31), window).is_allowed());
    }

    #[test]
    fn test_mine_cooldowns_prune_expired_entries() {
        let cooldowns = MineCooldowns::new();
        let window = Duration::seconds(30);
        for i in 0..PRUNE_THRESHOLD {
            cooldowns.record(&format!("user-{}", i), t0(), window);
        }
        assert_eq!(cooldowns.len(), PRUNE_THRESHOLD);

        // All earlier entries have expired by now; only the fresh one survives
        cooldowns.record("late", t0() + Duration::minutes(5), window);
        assert_eq!(cooldowns.len(), 1);
        assert!(!cooldowns
            .check("late", t0() + Duration::minutes(5), window)
            .is_allowed());
    }
}
