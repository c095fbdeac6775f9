//! Quota governor for automated actions.
//!
//! Answers "may this kind of action proceed right now?" from rolling one-hour
//! and 24-hour windows, a per-kind minimum interval, and a global cooldown
//! that engages after a run of consecutive actions of any kind. The governor
//! never sleeps and never denies for plausibility reasons; pacing advice is
//! the job of `cadence-schedule`.
//!
//! - [`QuotaGovernor`]: the shared, lock-guarded governor
//! - [`Decision`] / [`Denial`]: soft allow/deny answers with readable reasons
//! - [`ActionStats`]: serialisable usage snapshot
//! - [`history::ActionHistory`]: time-ordered per-kind log
pub mod decision;
pub mod governor;
pub mod history;
pub mod stats;

pub use decision::{Decision, Denial};
pub use governor::QuotaGovernor;
pub use stats::ActionStats;
