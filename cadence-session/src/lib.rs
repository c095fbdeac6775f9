//! Concrete caller of the governor and scheduler.
//!
//! # Overview
//! - [`Ledger`]: per-day record of sent connection requests and messages
//! - [`InMemoryLedger`]: clock-driven ledger bucketed by UTC day
//! - [`PacedSession`]: serialises check, think pause, action and record
mod ledger;
mod session;

pub use ledger::{InMemoryLedger, Ledger};
pub use session::{Outcome, PacedSession, Refusal};
