//! Quota governor: per-kind rolling-window caps, minimum spacing and a
//! global cooldown that engages after a run of consecutive actions.
//!
//! All state lives behind one `RwLock`. Evaluation and recording take the
//! write side (evaluation prunes), snapshots take the read side. The clock is
//! read *inside* the lock so committed timestamps follow lock order.
//!
//! [`QuotaGovernor::can_perform_action`] and [`QuotaGovernor::record_action`]
//! are separate calls: two callers may both observe `Allowed` before either
//! records, overshooting the caps by the number of racing callers. Use
//! [`QuotaGovernor::try_record_action`] when the check and the commit must be
//! a single step, or serialise check → act → record per session.

use crate::decision::{Decision, Denial};
use crate::history::{ActionHistory, DAY, HOUR};
use crate::stats::ActionStats;
use cadence_common::clock::{add_duration, elapsed_between};
use cadence_common::{default_limits, ActionKind, ActionLimit, CadenceError, Clock, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct GovernorState {
    history: HashMap<ActionKind, ActionHistory>,
    cooldown_until: Option<DateTime<Utc>>,
    consecutive_actions: u32,
}

impl GovernorState {
    fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.cooldown_until {
            Some(until) if now < until => Some(elapsed_between(now, until)),
            _ => None,
        }
    }

    fn evaluate(
        &mut self,
        kind: ActionKind,
        limit: Option<&ActionLimit>,
        now: DateTime<Utc>,
    ) -> Decision {
        if let Some(remaining) = self.cooldown_remaining(now) {
            return Decision::Denied(Denial::Cooldown { remaining });
        }

        // Unconfigured kinds are open.
        let Some(limit) = limit else {
            return Decision::Allowed;
        };

        let (hourly, daily, last) = match self.history.get_mut(&kind) {
            Some(history) => {
                history.prune(now, DAY);
                (
                    history.count_within(now, HOUR),
                    history.count_within(now, DAY),
                    history.last(),
                )
            }
            None => (0, 0, None),
        };

        if hourly >= limit.hourly_max {
            return Decision::Denied(Denial::HourlyLimit {
                count: hourly,
                max: limit.hourly_max,
            });
        }
        if daily >= limit.daily_max {
            return Decision::Denied(Denial::DailyLimit {
                count: daily,
                max: limit.daily_max,
            });
        }
        if let Some(last) = last {
            let since = elapsed_between(last, now);
            if since < limit.min_interval {
                return Decision::Denied(Denial::TooSoon {
                    remaining: limit.min_interval - since,
                });
            }
        }

        Decision::Allowed
    }

    /// Returns `true` when this commit engaged the global cooldown.
    fn commit(&mut self, kind: ActionKind, limit: &ActionLimit, now: DateTime<Utc>) -> bool {
        let history = self.history.entry(kind).or_default();
        history.prune(now, DAY);
        history.push(now);

        self.consecutive_actions += 1;
        if self.consecutive_actions >= limit.cooldown_after {
            self.cooldown_until = Some(add_duration(now, limit.cooldown_duration));
            self.consecutive_actions = 0;
            return true;
        }
        false
    }

    fn stats(
        &self,
        kind: ActionKind,
        limit: &ActionLimit,
        now: DateTime<Utc>,
    ) -> ActionStats {
        let (hourly_count, daily_count) = self
            .history
            .get(&kind)
            .map(|h| (h.count_within(now, HOUR), h.count_within(now, DAY)))
            .unwrap_or((0, 0));
        let cooldown = self.cooldown_remaining(now);

        ActionStats {
            action_type: kind,
            hourly_count,
            hourly_limit: limit.hourly_max,
            hourly_remaining: limit.hourly_max.saturating_sub(hourly_count),
            daily_count,
            daily_limit: limit.daily_max,
            daily_remaining: limit.daily_max.saturating_sub(daily_count),
            in_cooldown: cooldown.is_some(),
            cooldown_remaining: cooldown.unwrap_or(Duration::ZERO),
        }
    }
}

/// Decides whether an automated action may proceed now and records the ones
/// that did.
///
/// ```
/// use cadence_common::{ActionKind, ManualClock};
/// use cadence_governor::QuotaGovernor;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = ManualClock::at_epoch();
/// let governor = QuotaGovernor::with_default_limits(Arc::new(clock.clone()));
///
/// assert!(governor.can_perform_action(ActionKind::Message).is_allowed());
/// governor.record_action(ActionKind::Message).unwrap();
///
/// let decision = governor.can_perform_action(ActionKind::Message);
/// assert_eq!(decision.reason(), "Too soon. Wait 1m0s");
///
/// clock.advance(Duration::from_secs(60));
/// assert!(governor.can_perform_action(ActionKind::Message).is_allowed());
/// ```
#[derive(Debug)]
pub struct QuotaGovernor {
    limits: BTreeMap<ActionKind, ActionLimit>,
    state: RwLock<GovernorState>,
    clock: Arc<dyn Clock>,
}

impl QuotaGovernor {
    pub fn new(limits: BTreeMap<ActionKind, ActionLimit>, clock: Arc<dyn Clock>) -> Self {
        Self {
            limits,
            state: RwLock::new(GovernorState::default()),
            clock,
        }
    }

    pub fn with_default_limits(clock: Arc<dyn Clock>) -> Self {
        Self::new(default_limits(), clock)
    }

    pub fn limit(&self, kind: ActionKind) -> Option<&ActionLimit> {
        self.limits.get(&kind)
    }

    pub fn limits(&self) -> &BTreeMap<ActionKind, ActionLimit> {
        &self.limits
    }

    fn read(&self) -> RwLockReadGuard<'_, GovernorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GovernorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether `kind` may act now. First failing check wins: cooldown,
    /// hourly cap, daily cap, minimum interval.
    ///
    /// Only prunes history older than a day, so repeated calls without an
    /// intervening record leave the observable state unchanged.
    pub fn can_perform_action(&self, kind: ActionKind) -> Decision {
        let mut state = self.write();
        let now = self.clock.now();
        let decision = state.evaluate(kind, self.limits.get(&kind), now);
        if let Decision::Denied(denial) = &decision {
            debug!(kind = %kind, reason = %denial, "governor.denied");
        }
        decision
    }

    /// Record that an action of `kind` completed now.
    pub fn record_action(&self, kind: ActionKind) -> Result<()> {
        let limit = self
            .limits
            .get(&kind)
            .ok_or(CadenceError::UnknownActionKind(kind))?;

        let mut state = self.write();
        let now = self.clock.now();
        let engaged = state.commit(kind, limit, now);
        drop(state);

        debug!(kind = %kind, "governor.recorded");
        if engaged {
            warn!(
                kind = %kind,
                cooldown_secs = limit.cooldown_duration.as_secs(),
                "governor.cooldown.engaged"
            );
        }
        Ok(())
    }

    /// Check and, if allowed, record under a single lock acquisition.
    pub fn try_record_action(&self, kind: ActionKind) -> Result<Decision> {
        let limit = self
            .limits
            .get(&kind)
            .ok_or(CadenceError::UnknownActionKind(kind))?;

        let mut state = self.write();
        let now = self.clock.now();
        let decision = state.evaluate(kind, Some(limit), now);
        let engaged = decision.is_allowed() && state.commit(kind, limit, now);
        drop(state);

        match &decision {
            Decision::Allowed => debug!(kind = %kind, "governor.recorded"),
            Decision::Denied(denial) => debug!(kind = %kind, reason = %denial, "governor.denied"),
        }
        if engaged {
            warn!(
                kind = %kind,
                cooldown_secs = limit.cooldown_duration.as_secs(),
                "governor.cooldown.engaged"
            );
        }
        Ok(decision)
    }

    /// Time until the cooldown and the minimum interval have both cleared.
    ///
    /// Quota caps are not reflected here; a kind at its hourly or daily cap
    /// can report zero wait and still be denied.
    pub fn wait_time(&self, kind: ActionKind) -> Duration {
        let state = self.read();
        let now = self.clock.now();

        let cooldown = state.cooldown_remaining(now).unwrap_or(Duration::ZERO);
        let interval = match (self.limits.get(&kind), state.history.get(&kind)) {
            (Some(limit), Some(history)) => history
                .last()
                .map(|last| limit.min_interval.saturating_sub(elapsed_between(last, now)))
                .unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        };
        cooldown.max(interval)
    }

    /// Snapshot for one kind; `None` when the kind has no configured limit.
    pub fn action_stats(&self, kind: ActionKind) -> Option<ActionStats> {
        let limit = self.limits.get(&kind)?;
        let state = self.read();
        Some(state.stats(kind, limit, self.clock.now()))
    }

    /// Snapshot for every configured kind, taken at one instant.
    pub fn all_stats(&self) -> BTreeMap<ActionKind, ActionStats> {
        let state = self.read();
        let now = self.clock.now();
        self.limits
            .iter()
            .map(|(kind, limit)| (*kind, state.stats(*kind, limit, now)))
            .collect()
    }

    pub fn is_in_cooldown(&self) -> bool {
        self.read().cooldown_remaining(self.clock.now()).is_some()
    }

    pub fn cooldown_remaining(&self) -> Duration {
        self.read()
            .cooldown_remaining(self.clock.now())
            .unwrap_or(Duration::ZERO)
    }

    pub fn consecutive_actions(&self) -> u32 {
        self.read().consecutive_actions
    }

    /// Clear any active cooldown and the consecutive-action counter.
    pub fn reset_cooldown(&self) {
        let mut state = self.write();
        state.cooldown_until = None;
        state.consecutive_actions = 0;
        info!("governor.cooldown.reset");
    }

    /// Re-prune every history to the trailing day.
    ///
    /// Windows are rolling, so entries still inside the last 24 hours are
    /// kept; this is not a calendar-day reset.
    pub fn reset_daily(&self) {
        let mut state = self.write();
        let now = self.clock.now();
        let removed: usize = state
            .history
            .values_mut()
            .map(|h| h.prune(now, DAY))
            .sum();
        info!(removed, "governor.daily.reset");
    }

    #[cfg(test)]
    fn history_len(&self, kind: ActionKind) -> usize {
        self.read().history.get(&kind).map_or(0, ActionHistory::len)
    }
}
