use std::fmt;
use std::time::Duration;

/// Why the governor refused an action. Denials are soft: wait or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// A global cooldown is active.
    Cooldown { remaining: Duration },
    /// The trailing-hour cap for the kind is exhausted.
    HourlyLimit { count: u32, max: u32 },
    /// The trailing-day cap for the kind is exhausted.
    DailyLimit { count: u32, max: u32 },
    /// The minimum interval since the previous action has not elapsed.
    TooSoon { remaining: Duration },
}

impl Denial {
    /// How long until this particular condition clears, when it is purely
    /// time-bounded. Quota caps return `None`: they clear only as old entries
    /// age out of the window.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Denial::Cooldown { remaining } | Denial::TooSoon { remaining } => Some(*remaining),
            Denial::HourlyLimit { .. } | Denial::DailyLimit { .. } => None,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Cooldown { remaining } => {
                write!(f, "In cooldown period. Wait {}", round_secs(*remaining))
            }
            Denial::HourlyLimit { count, max } => {
                write!(f, "Hourly limit reached ({count}/{max})")
            }
            Denial::DailyLimit { count, max } => write!(f, "Daily limit reached ({count}/{max})"),
            Denial::TooSoon { remaining } => write!(f, "Too soon. Wait {}", round_secs(*remaining)),
        }
    }
}

/// Answer to "may I act now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(d) => Some(d),
        }
    }

    /// Human-readable reason; empty when allowed.
    pub fn reason(&self) -> String {
        self.denial().map(ToString::to_string).unwrap_or_default()
    }
}

/// Format a duration rounded to the nearest second, e.g. `9m59s`, `1h0m5s`, `42s`.
pub fn round_secs(d: Duration) -> String {
    let total = (d.as_millis() + 500) / 1000;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}
