use async_trait::async_trait;
use cadence_common::{ActionKind, Clock, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The caller's own record of what was sent, independent of the governor's
/// in-memory windows.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn connections_sent_today(&self) -> Result<u32>;
    async fn messages_sent_today(&self) -> Result<u32>;
    async fn record(&self, kind: ActionKind, at: DateTime<Utc>) -> Result<()>;
}

/// Counts connection requests and messages per UTC calendar day. Other
/// kinds are ignored, and recording on a new day drops the older ones.
#[derive(Debug)]
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    counts: Mutex<HashMap<(NaiveDate, ActionKind), u32>>,
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            counts: Mutex::new(HashMap::new()),
        }
    }

    fn count_today(&self, kind: ActionKind) -> u32 {
        let today = self.clock.now().date_naive();
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.get(&(today, kind)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn connections_sent_today(&self) -> Result<u32> {
        Ok(self.count_today(ActionKind::ConnectionRequest))
    }

    async fn messages_sent_today(&self) -> Result<u32> {
        Ok(self.count_today(ActionKind::Message))
    }

    async fn record(&self, kind: ActionKind, at: DateTime<Utc>) -> Result<()> {
        if !matches!(kind, ActionKind::ConnectionRequest | ActionKind::Message) {
            return Ok(());
        }
        let day = at.date_naive();
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        if counts.keys().all(|(d, _)| *d < day) {
            counts.retain(|(d, _), _| *d >= day);
        }
        *counts.entry((day, kind)).or_insert(0) += 1;
        Ok(())
    }
}
