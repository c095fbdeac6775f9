//! Human-plausible timing.
//!
//! # Overview
//! - [`ActivityScheduler`]: working hours, break bands, fatigue and the
//!   randomised delays an operator would show between actions
//! - [`timing`]: stateless delay generators, backoff and throttling
//! - [`hours`]: business-hours window math and an async waiter
//! - [`cadence`]: keystroke, scroll and pointer pacing plans
//!
//! Nothing here sleeps except [`hours::wait_for_business_hours`]; everything
//! else returns durations for the caller to honour.
pub mod cadence;
pub mod hours;
pub mod scheduler;
pub mod timing;

pub use cadence::{
    mouse_path, scroll_plan, typing_plan, KeyAction, KeyStroke, MousePath, MouseStep, ScrollPlan,
    ScrollStep, TypingPlan,
};
pub use hours::{is_business_hours, until_business_hours, wait_for_business_hours};
pub use scheduler::{parse_timezone, ActivityScheduler, SchedulerConfig};
