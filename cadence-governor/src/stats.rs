use cadence_common::ActionKind;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Point-in-time snapshot of one kind's quota usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionStats {
    pub action_type: ActionKind,
    pub hourly_count: u32,
    pub hourly_limit: u32,
    pub hourly_remaining: u32,
    pub daily_count: u32,
    pub daily_limit: u32,
    pub daily_remaining: u32,
    pub in_cooldown: bool,
    #[serde(rename = "cooldown_remaining_secs", serialize_with = "as_secs")]
    pub cooldown_remaining: Duration,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
