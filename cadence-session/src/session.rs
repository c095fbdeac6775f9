use crate::ledger::Ledger;
use cadence_common::{ActionKind, Clock, Result};
use cadence_config::LedgerCaps;
use cadence_governor::{Decision, Denial, QuotaGovernor};
use cadence_schedule::ActivityScheduler;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why [`PacedSession::perform`] declined to run an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The caller's own per-day ceiling for this kind is used up.
    DailyCap {
        kind: ActionKind,
        sent: u32,
        max: u32,
    },
    Governor(Denial),
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::DailyCap { kind, sent, max } => {
                write!(f, "Daily {kind} cap reached ({sent}/{max})")
            }
            Refusal::Governor(denial) => fmt::Display::fmt(denial, f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Refused(Refusal),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Outcome::Refused(r) => Some(r),
            Outcome::Completed(_) => None,
        }
    }
}

/// One automation session: every action goes through
/// check, think, act, record while holding the session gate, so two tasks
/// sharing a session can never both pass the same check.
pub struct PacedSession {
    governor: Arc<QuotaGovernor>,
    scheduler: Arc<ActivityScheduler>,
    ledger: Arc<dyn Ledger>,
    caps: LedgerCaps,
    clock: Arc<dyn Clock>,
    gate: Mutex<()>,
}

impl PacedSession {
    pub fn new(
        governor: Arc<QuotaGovernor>,
        scheduler: Arc<ActivityScheduler>,
        ledger: Arc<dyn Ledger>,
        caps: LedgerCaps,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            governor,
            scheduler,
            ledger,
            caps,
            clock,
            gate: Mutex::new(()),
        }
    }

    pub fn governor(&self) -> &QuotaGovernor {
        &self.governor
    }

    pub fn scheduler(&self) -> &ActivityScheduler {
        &self.scheduler
    }

    async fn ledger_refusal(&self, kind: ActionKind) -> Result<Option<Refusal>> {
        let (sent, max) = match kind {
            ActionKind::ConnectionRequest => (
                self.ledger.connections_sent_today().await?,
                self.caps.max_connections_per_day,
            ),
            ActionKind::Message => (
                self.ledger.messages_sent_today().await?,
                self.caps.max_messages_per_day,
            ),
            _ => return Ok(None),
        };
        Ok((sent >= max).then_some(Refusal::DailyCap { kind, sent, max }))
    }

    /// Run `action` if the ledger and the governor allow it, after a human
    /// think pause. Successful actions are recorded on the governor, the
    /// scheduler and the ledger; a failed action records nothing.
    pub async fn perform<F, Fut, T>(&self, kind: ActionKind, action: F) -> Result<Outcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let _gate = self.gate.lock().await;

        if let Some(refusal) = self.ledger_refusal(kind).await? {
            info!(%kind, reason = %refusal, "session.action.refused");
            return Ok(Outcome::Refused(refusal));
        }
        if let Decision::Denied(denial) = self.governor.can_perform_action(kind) {
            info!(%kind, reason = %denial, "session.action.denied");
            return Ok(Outcome::Refused(Refusal::Governor(denial)));
        }

        let think = self.scheduler.think_time();
        let think_ms = u64::try_from(think.as_millis()).unwrap_or(u64::MAX);
        debug!(%kind, think_ms, "session.action.thinking");
        tokio::time::sleep(think).await;

        let value = action().await?;

        if self.governor.limit(kind).is_some() {
            self.governor.record_action(kind)?;
        } else {
            debug!(%kind, "session.action.untracked");
        }
        self.scheduler.record_activity();
        self.ledger.record(kind, self.clock.now()).await?;
        info!(%kind, "session.action.completed");

        Ok(Outcome::Completed(value))
    }

    /// Sleep until the governor allows `kind`.
    ///
    /// Returns `false` without sleeping when the denial has no time bound
    /// (an hourly or daily cap), and `false` when `cancel` fires.
    pub async fn wait_until_ready(&self, kind: ActionKind, cancel: &CancellationToken) -> bool {
        loop {
            let Decision::Denied(denial) = self.governor.can_perform_action(kind) else {
                return true;
            };
            let wait = self.governor.wait_time(kind);
            if wait.is_zero() {
                info!(%kind, reason = %denial, "session.wait.unbounded");
                return false;
            }
            debug!(%kind, wait_secs = wait.as_secs(), "session.wait.sleeping");
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Take a break when fatigue or the time of day calls for one.
    ///
    /// Returns how long was actually spent on the break, shorter than planned
    /// if `cancel` fired.
    pub async fn maybe_take_break(&self, cancel: &CancellationToken) -> Option<Duration> {
        if !(self.scheduler.should_take_break() || self.scheduler.is_break_time()) {
            return None;
        }
        let planned = self.scheduler.break_duration();
        info!(minutes = planned.as_secs() / 60, "session.break.started");
        let started = Instant::now();
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("session.break.interrupted");
            }
            _ = tokio::time::sleep(planned) => {}
        }
        Some(started.elapsed())
    }
}
