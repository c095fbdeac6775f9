//! Virtual-time dry run of a governor and scheduler pair.
//!
//! Drives a [`ManualClock`], so a day of pacing finishes instantly.

use anyhow::{Result, bail};
use cadence_common::{ActionKind, ActionLimit, Clock, ManualClock};
use cadence_config::BusinessHoursSection;
use cadence_governor::{ActionStats, Decision, QuotaGovernor};
use cadence_schedule::{ActivityScheduler, SchedulerConfig, until_business_hours};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Re-check interval while a quota cap (which has no wait time) is exhausted.
const CAP_POLL: Duration = Duration::from_secs(60);
const MAX_BLOCKED: Duration = Duration::from_secs(3 * 24 * 3600);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub index: u32,
    pub at: DateTime<Utc>,
    pub waited_secs: u64,
    /// First denial seen while waiting for this step.
    pub blocked_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub kind: ActionKind,
    pub steps: Vec<Step>,
    pub stats: Option<ActionStats>,
}

pub struct Simulation {
    pub limits: BTreeMap<ActionKind, ActionLimit>,
    pub scheduler: SchedulerConfig,
    pub business_hours: BusinessHoursSection,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Simulation {
    pub fn run(&self, kind: ActionKind, count: u32) -> Result<Report> {
        let clock = ManualClock::new(self.start);
        let governor = QuotaGovernor::new(self.limits.clone(), Arc::new(clock.clone()));
        let scheduler = ActivityScheduler::with_rng(
            &self.scheduler,
            Arc::new(clock.clone()),
            StdRng::seed_from_u64(self.seed),
        );
        let hours = self.business_hours;

        let mut steps = Vec::with_capacity(count as usize);
        for index in 0..count {
            let mut waited = Duration::ZERO;
            let mut blocked_by = None;
            loop {
                if hours.enabled {
                    let gap =
                        until_business_hours(&scheduler.local_now(), hours.start_hour, hours.end_hour);
                    if !gap.is_zero() {
                        clock.advance(gap);
                        waited += gap;
                        continue;
                    }
                }
                match governor.can_perform_action(kind) {
                    Decision::Allowed => break,
                    Decision::Denied(denial) => {
                        blocked_by.get_or_insert_with(|| denial.to_string());
                        let wait = governor.wait_time(kind);
                        let wait = if wait.is_zero() { CAP_POLL } else { wait };
                        clock.advance(wait);
                        waited += wait;
                    }
                }
                if waited > MAX_BLOCKED {
                    bail!(
                        "{kind} stayed blocked for over {} hours at step {index}",
                        MAX_BLOCKED.as_secs() / 3600
                    );
                }
            }

            governor.record_action(kind)?;
            scheduler.record_activity();
            let at = clock.now();
            debug!(%kind, index, %at, waited_secs = waited.as_secs(), "simulate.step");
            steps.push(Step {
                index,
                at,
                waited_secs: waited.as_secs(),
                blocked_by,
            });

            clock.advance(scheduler.action_interval());
        }

        Ok(Report {
            kind,
            steps,
            stats: governor.action_stats(kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_common::default_limits;
    use cadence_schedule::is_business_hours;
    use chrono::TimeZone;

    fn simulation(start: DateTime<Utc>, enabled: bool) -> Simulation {
        Simulation {
            limits: default_limits(),
            scheduler: SchedulerConfig::default(),
            business_hours: BusinessHoursSection {
                enabled,
                ..BusinessHoursSection::default()
            },
            start,
            seed: 3,
        }
    }

    fn wednesday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn timeline_respects_interval_cap_and_cooldown() {
        let report = simulation(wednesday_morning(), false)
            .run(ActionKind::ConnectionRequest, 25)
            .unwrap();
        let at: Vec<_> = report.steps.iter().map(|s| s.at).collect();
        assert_eq!(at.len(), 25);

        for i in 1..at.len() {
            let gap = (at[i] - at[i - 1]).num_seconds();
            assert!(gap >= 90, "gap {gap}s before step {i}");
            if i % 5 == 0 {
                assert!(gap >= 600, "cooldown skipped before step {i}");
            }
        }
        for (i, t) in at.iter().enumerate() {
            let in_hour = at[..=i]
                .iter()
                .filter(|s| (*t - **s).num_seconds() < 3600)
                .count();
            assert!(in_hour <= 10, "{in_hour} actions in the hour ending at step {i}");
        }
        assert_eq!(report.stats.unwrap().daily_count, 25);
    }

    #[test]
    fn business_hours_gate_skips_the_weekend() {
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 10, 0, 0).unwrap();
        let report = simulation(saturday, true)
            .run(ActionKind::ProfileView, 15)
            .unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
        assert!(report.steps[0].at >= monday);
        assert!(report.steps.iter().all(|s| is_business_hours(&s.at, 9, 18)));
    }

    #[test]
    fn same_seed_same_timeline() {
        let sim = simulation(wednesday_morning(), false);
        let a = sim.run(ActionKind::Message, 10).unwrap();
        let b = sim.run(ActionKind::Message, 10).unwrap();
        assert_eq!(a.steps, b.steps);
    }
}
