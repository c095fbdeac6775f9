//! Common types and utilities shared across Cadence crates.
//!
//! This crate defines the action vocabulary, the static limit table, the
//! injectable clock, observability helpers, and the shared error type used
//! throughout the Cadence workspace. It is intentionally lightweight so that
//! every crate can depend on it without introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`ActionKind`]: closed set of automated interactions subject to quotas
//! - [`ActionLimit`] and [`default_limits`]: per-kind quota configuration
//! - [`clock`]: [`Clock`] trait with system and manual implementations
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`CadenceError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use cadence_common::{default_limits, ActionKind};
//!
//! let limits = default_limits();
//! let connect = &limits[&ActionKind::ConnectionRequest];
//! assert_eq!(connect.hourly_max, 10);
//! assert!(connect.validate(ActionKind::ConnectionRequest).is_ok());
//! ```
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod clock;
pub mod observability;

pub use clock::{Clock, ManualClock, SystemClock};

/// A category of automated interaction subject to its own quota.
///
/// Adding a kind means adding a variant here and an entry in
/// [`default_limits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ProfileView,
    ConnectionRequest,
    Message,
    Search,
    Scroll,
    Like,
    Comment,
    PageView,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::ProfileView,
        ActionKind::ConnectionRequest,
        ActionKind::Message,
        ActionKind::Search,
        ActionKind::Scroll,
        ActionKind::Like,
        ActionKind::Comment,
        ActionKind::PageView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ProfileView => "profile_view",
            ActionKind::ConnectionRequest => "connection_request",
            ActionKind::Message => "message",
            ActionKind::Search => "search",
            ActionKind::Scroll => "scroll",
            ActionKind::Like => "like",
            ActionKind::Comment => "comment",
            ActionKind::PageView => "page_view",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}

/// Static quota configuration for one [`ActionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionLimit {
    /// Cap on actions of this kind within the trailing hour.
    pub hourly_max: u32,
    /// Cap on actions of this kind within the trailing 24 hours.
    pub daily_max: u32,
    /// Minimum spacing between two consecutive actions of this kind.
    pub min_interval: Duration,
    /// Consecutive recorded actions (of any kind) that engage the global cooldown.
    pub cooldown_after: u32,
    /// Length of the global cooldown once engaged.
    pub cooldown_duration: Duration,
}

impl ActionLimit {
    pub const fn new(
        hourly_max: u32,
        daily_max: u32,
        min_interval: Duration,
        cooldown_after: u32,
        cooldown_duration: Duration,
    ) -> Self {
        Self {
            hourly_max,
            daily_max,
            min_interval,
            cooldown_after,
            cooldown_duration,
        }
    }

    /// Check `hourly_max <= daily_max`, a non-zero minimum interval and a
    /// non-zero cooldown trigger.
    pub fn validate(&self, kind: ActionKind) -> Result<()> {
        if self.hourly_max > self.daily_max {
            return Err(CadenceError::ConfigurationInvalid(format!(
                "{kind}: hourly_max ({}) exceeds daily_max ({})",
                self.hourly_max, self.daily_max
            )));
        }
        if self.min_interval.is_zero() {
            return Err(CadenceError::ConfigurationInvalid(format!(
                "{kind}: min_interval must be greater than zero"
            )));
        }
        if self.cooldown_after == 0 {
            return Err(CadenceError::ConfigurationInvalid(format!(
                "{kind}: cooldown_after must be at least 1"
            )));
        }
        Ok(())
    }
}

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Conservative built-in limit table, one entry per [`ActionKind`].
pub fn default_limits() -> BTreeMap<ActionKind, ActionLimit> {
    BTreeMap::from([
        (
            ActionKind::ProfileView,
            ActionLimit::new(40, 200, secs(15), 10, secs(5 * 60)),
        ),
        (
            ActionKind::ConnectionRequest,
            ActionLimit::new(10, 50, secs(90), 5, secs(10 * 60)),
        ),
        (
            ActionKind::Message,
            ActionLimit::new(15, 80, secs(60), 7, secs(8 * 60)),
        ),
        (
            ActionKind::Search,
            ActionLimit::new(30, 150, secs(20), 8, secs(3 * 60)),
        ),
        (
            ActionKind::Scroll,
            ActionLimit::new(200, 1000, secs(2), 20, secs(2 * 60)),
        ),
        (
            ActionKind::Like,
            ActionLimit::new(25, 120, secs(30), 8, secs(5 * 60)),
        ),
        (
            ActionKind::Comment,
            ActionLimit::new(8, 30, secs(120), 3, secs(15 * 60)),
        ),
        (
            ActionKind::PageView,
            ActionLimit::new(100, 500, secs(5), 15, secs(3 * 60)),
        ),
    ])
}

/// Error types used across the Cadence system.
///
/// A denied action is not an error; see `cadence_governor::Decision`.
#[derive(thiserror::Error, Debug)]
pub enum CadenceError {
    /// An action was recorded for a kind with no configured limit.
    #[error("no limit defined for action type: {0}")]
    UnknownActionKind(ActionKind),

    /// Configuration was malformed or violated an invariant.
    #[error("Configuration error: {0}")]
    ConfigurationInvalid(String),

    /// The persistence collaborator failed.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// A page driver (or any caller-supplied action) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`CadenceError`].
pub type Result<T> = std::result::Result<T, CadenceError>;
