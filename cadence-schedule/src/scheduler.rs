//! Activity scheduler: time-of-day plausibility and human-paced delays.
//!
//! The scheduler never denies anything. It answers advisory questions
//! (is this a working hour, is this a break, should we pause) and hands out
//! durations for the caller to sleep. Permission is the governor's job.

use crate::hours::is_weekend;
use crate::timing::{random_delay, uniform_ms, with_distraction};
use cadence_common::clock::elapsed_between;
use cadence_common::{CadenceError, Clock, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::warn;

pub const WEEKEND_ACTIVITY_PROBABILITY: f64 = 0.10;
pub const MICRO_BREAK_PROBABILITY: f64 = 0.05;
/// Minutes of activity before fatigue starts raising the break chance.
pub const FATIGUE_ONSET_MINUTES: f64 = 45.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// IANA timezone name, e.g. `Europe/Berlin`.
    pub timezone: String,
    pub work_hours_start: u32,
    pub work_hours_end: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            work_hours_start: 9,
            work_hours_end: 18,
        }
    }
}

/// Resolve an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| CadenceError::ConfigurationInvalid(format!("timezone {name:?}: {e}")))
}

/// Break probability for a local wall-clock time, `None` outside the three
/// break bands (mid-morning, lunch, mid-afternoon).
pub fn break_band_probability(hour: u32, minute: u32) -> Option<f64> {
    match (hour, minute) {
        (12, _) | (13, 0..=29) => Some(0.70),
        (10, 0..=14) => Some(0.40),
        (15, 0..=14) => Some(0.40),
        _ => None,
    }
}

/// Spacing between major actions for a given local hour: slower at the
/// edges of the day, a little quicker mid-day, never under 10 s.
pub fn action_interval_at<R: Rng + ?Sized>(rng: &mut R, hour: u32) -> Duration {
    let mut secs: u64 = 15 + rng.gen_range(0..76);
    if !(10..=17).contains(&hour) {
        secs += rng.gen_range(0..30);
    }
    if (10..=15).contains(&hour) {
        secs = secs.saturating_sub(rng.gen_range(0..10)).max(10);
    }
    Duration::from_secs(secs)
}

/// Rhythm pause for a given local hour.
pub fn human_rhythm_at<R: Rng + ?Sized>(rng: &mut R, hour: u32) -> Duration {
    match hour {
        9..=10 => uniform_ms(rng, 2000, 3000),
        11..=13 => uniform_ms(rng, 800, 1200),
        14..=15 => uniform_ms(rng, 1500, 2000),
        16..=17 => uniform_ms(rng, 2500, 3500),
        _ => uniform_ms(rng, 1500, 2000),
    }
}

struct SchedulerState {
    rng: Box<dyn RngCore + Send>,
    last_activity: Option<DateTime<Utc>>,
    daily_action_count: u64,
}

/// Models working hours, breaks and human reaction cadence.
///
/// ```
/// use cadence_common::ManualClock;
/// use cadence_schedule::{ActivityScheduler, SchedulerConfig};
/// use rand::{rngs::StdRng, SeedableRng};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let scheduler = ActivityScheduler::with_rng(
///     &SchedulerConfig::default(),
///     Arc::new(ManualClock::at_epoch()),
///     StdRng::seed_from_u64(42),
/// );
/// let think = scheduler.think_time();
/// assert!(think >= Duration::from_secs(1) && think < Duration::from_secs(15));
/// ```
pub struct ActivityScheduler {
    timezone: Tz,
    work_hours_start: u32,
    work_hours_end: u32,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
}

impl fmt::Debug for ActivityScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ActivityScheduler")
            .field("timezone", &self.timezone)
            .field("work_hours_start", &self.work_hours_start)
            .field("work_hours_end", &self.work_hours_end)
            .field("last_activity", &state.last_activity)
            .field("daily_action_count", &state.daily_action_count)
            .finish_non_exhaustive()
    }
}

impl ActivityScheduler {
    pub fn new(config: &SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(config, clock, StdRng::from_entropy())
    }

    /// Build with an explicit random source. An unknown timezone falls back
    /// to UTC with a warning.
    pub fn with_rng<R: RngCore + Send + 'static>(
        config: &SchedulerConfig,
        clock: Arc<dyn Clock>,
        rng: R,
    ) -> Self {
        let timezone = parse_timezone(&config.timezone).unwrap_or_else(|err| {
            warn!(error = %err, "scheduler.timezone.fallback_utc");
            Tz::UTC
        });
        Self {
            timezone,
            work_hours_start: config.work_hours_start,
            work_hours_end: config.work_hours_end,
            clock,
            state: Mutex::new(SchedulerState {
                rng: Box::new(rng),
                last_activity: None,
                daily_action_count: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw<T>(&self, f: impl FnOnce(&mut (dyn RngCore + Send)) -> T) -> T {
        let mut state = self.lock();
        f(state.rng.as_mut())
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local_now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.timezone)
    }

    /// Weekends are active only occasionally. On weekdays the configured
    /// bounds are jittered on every call: the start moves up to an hour
    /// earlier, the end up to an hour either way.
    pub fn is_working_hours(&self) -> bool {
        let local = self.local_now();
        let hour = i64::from(local.hour());
        let (start, end) = (
            i64::from(self.work_hours_start),
            i64::from(self.work_hours_end),
        );
        self.draw(|rng| {
            if is_weekend(local.weekday()) {
                return rng.gen::<f64>() < WEEKEND_ACTIVITY_PROBABILITY;
            }
            let start = start + rng.gen_range(-1..=0);
            let end = end + rng.gen_range(-1..=1);
            hour >= start && hour < end
        })
    }

    pub fn is_break_time(&self) -> bool {
        let local = self.local_now();
        match break_band_probability(local.hour(), local.minute()) {
            Some(p) => self.draw(|rng| rng.gen::<f64>() < p),
            None => false,
        }
    }

    /// Fatigue grows linearly once 45 minutes have passed since the last
    /// recorded activity; a small micro-break chance always applies.
    pub fn should_take_break(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        if let Some(last) = state.last_activity {
            let minutes = elapsed_between(last, now).as_secs_f64() / 60.0;
            if minutes >= FATIGUE_ONSET_MINUTES {
                let chance = 0.15 + (minutes - FATIGUE_ONSET_MINUTES) / 180.0;
                if state.rng.gen::<f64>() < chance {
                    return true;
                }
            }
        }
        state.rng.gen::<f64>() < MICRO_BREAK_PROBABILITY
    }

    /// Mostly short breaks, sometimes medium, rarely long.
    pub fn break_duration(&self) -> Duration {
        self.draw(|rng| {
            let tier = rng.gen::<f64>();
            let minutes: u64 = if tier < 0.60 {
                rng.gen_range(2..=5)
            } else if tier < 0.85 {
                rng.gen_range(5..=15)
            } else {
                rng.gen_range(15..=45)
            };
            Duration::from_secs(minutes * 60)
        })
    }

    /// Reaction time before acting: 1–5 s, occasionally 3–10 s longer.
    pub fn think_time(&self) -> Duration {
        self.draw(|rng| {
            let base = uniform_ms(rng, 1000, 4000);
            with_distraction(rng, base, 0.15, 3000, 7000)
        })
    }

    /// Per-keystroke interval: 50–200 ms, occasionally a 300–1000 ms hesitation.
    pub fn typing_delay(&self) -> Duration {
        self.draw(|rng| {
            let base = uniform_ms(rng, 50, 151);
            with_distraction(rng, base, 0.10, 300, 700)
        })
    }

    /// Quick flicks most of the time, slower reading scrolls otherwise.
    pub fn scroll_delay(&self) -> Duration {
        self.draw(|rng| {
            if rng.gen::<f64>() < 0.70 {
                uniform_ms(rng, 200, 600)
            } else {
                uniform_ms(rng, 1000, 2000)
            }
        })
    }

    pub fn page_load_wait(&self) -> Duration {
        self.draw(|rng| uniform_ms(rng, 2000, 3000))
    }

    pub fn action_interval(&self) -> Duration {
        let hour = self.local_now().hour();
        self.draw(|rng| action_interval_at(rng, hour))
    }

    pub fn simulate_human_rhythm(&self) -> Duration {
        let hour = self.local_now().hour();
        self.draw(|rng| human_rhythm_at(rng, hour))
    }

    pub fn random_delay(&self, min_ms: u64, max_ms: u64) -> Duration {
        self.draw(|rng| random_delay(rng, min_ms, max_ms))
    }

    pub fn record_activity(&self) {
        let now = self.clock.now();
        let mut state = self.lock();
        state.last_activity = Some(now);
        state.daily_action_count += 1;
    }

    /// Call at day rollover.
    pub fn reset_daily_count(&self) {
        self.lock().daily_action_count = 0;
    }

    pub fn daily_action_count(&self) -> u64 {
        self.lock().daily_action_count
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.lock().last_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_common::ManualClock;
    use chrono::TimeZone;

    fn at(clock_time: DateTime<Utc>, seed: u64) -> (ActivityScheduler, ManualClock) {
        at_in("UTC", clock_time, seed)
    }

    fn at_in(tz: &str, clock_time: DateTime<Utc>, seed: u64) -> (ActivityScheduler, ManualClock) {
        let clock = ManualClock::new(clock_time);
        let config = SchedulerConfig {
            timezone: tz.to_string(),
            ..SchedulerConfig::default()
        };
        let s = ActivityScheduler::with_rng(
            &config,
            Arc::new(clock.clone()),
            StdRng::seed_from_u64(seed),
        );
        (s, clock)
    }

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        // January 2024: the 3rd is a Wednesday, the 6th a Saturday.
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        let (s, _) = at_in("Mars/Olympus_Mons", utc(3, 12, 0), 1);
        assert_eq!(s.timezone(), Tz::UTC);
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(CadenceError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn break_time_is_false_outside_bands_for_any_seed() {
        let outside = [(9, 59), (10, 15), (11, 0), (13, 30), (14, 59), (15, 15), (22, 0)];
        for seed in 0..200 {
            for (h, m) in outside {
                let (s, _) = at(utc(3, h, m), seed);
                assert!(!s.is_break_time(), "seed {seed} at {h}:{m:02}");
            }
        }
    }

    #[test]
    fn lunch_band_is_mostly_a_break() {
        let hits = (0..200)
            .filter(|seed| at(utc(3, 12, 30), *seed).0.is_break_time())
            .count();
        assert!((100..=180).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn break_band_uses_the_configured_timezone() {
        // 17:30 UTC is 12:30 in New York in January.
        let hits = (0..200)
            .filter(|seed| at_in("America/New_York", utc(3, 17, 30), *seed).0.is_break_time())
            .count();
        assert!(hits > 0);
        let (utc_sched, _) = at(utc(3, 17, 30), 0);
        assert!(!utc_sched.is_break_time());
    }

    #[test]
    fn weekday_working_hours_respect_jitter_bounds() {
        for seed in 0..100 {
            assert!(at(utc(3, 12, 0), seed).0.is_working_hours());
            assert!(!at(utc(3, 3, 0), seed).0.is_working_hours());
            assert!(!at(utc(3, 20, 0), seed).0.is_working_hours());
        }
    }

    #[test]
    fn jitter_never_delays_the_start_or_extends_past_an_hour() {
        for seed in 0..500 {
            assert!(at(utc(3, 9, 30), seed).0.is_working_hours(), "seed {seed}");
            assert!(!at(utc(3, 19, 30), seed).0.is_working_hours(), "seed {seed}");
        }
    }

    #[test]
    fn jitter_reaches_both_edges() {
        let early = (0..500)
            .filter(|&seed| at(utc(3, 8, 30), seed).0.is_working_hours())
            .count();
        let late = (0..500)
            .filter(|&seed| at(utc(3, 18, 30), seed).0.is_working_hours())
            .count();
        assert!((150..=350).contains(&early), "early = {early}");
        assert!((80..=260).contains(&late), "late = {late}");
    }

    #[test]
    fn weekends_are_occasionally_active() {
        let (s, _) = at(utc(6, 12, 0), 9);
        let active = (0..1000).filter(|_| s.is_working_hours()).count();
        assert!((40..=170).contains(&active), "active = {active}");
    }

    #[test]
    fn fatigue_forces_a_break_after_long_inactivity_window() {
        let (s, clock) = at(utc(3, 9, 0), 5);
        s.record_activity();
        clock.advance(Duration::from_secs(4 * 3600));
        for _ in 0..50 {
            assert!(s.should_take_break());
        }
    }

    #[test]
    fn without_fatigue_only_micro_breaks_remain() {
        let (s, clock) = at(utc(3, 9, 0), 6);
        s.record_activity();
        clock.advance(Duration::from_secs(10 * 60));
        let breaks = (0..2000).filter(|_| s.should_take_break()).count();
        assert!(breaks > 0 && breaks < 200, "breaks = {breaks}");
    }

    #[test]
    fn break_durations_cover_all_tiers() {
        let (s, _) = at(utc(3, 9, 0), 7);
        let draws: Vec<_> = (0..1000).map(|_| s.break_duration().as_secs() / 60).collect();
        assert!(draws.iter().all(|m| (2..=45).contains(m)));
        assert!(draws.iter().any(|m| *m < 5));
        assert!(draws.iter().any(|m| (6..15).contains(m)));
        assert!(draws.iter().any(|m| *m > 15));
    }

    #[test]
    fn delay_generators_stay_in_documented_ranges() {
        let (s, _) = at(utc(3, 12, 0), 8);
        for _ in 0..500 {
            let think = s.think_time().as_millis();
            assert!((1000..15_000).contains(&think));
            let typing = s.typing_delay().as_millis();
            assert!((50..1201).contains(&typing));
            let scroll = s.scroll_delay().as_millis();
            assert!((200..800).contains(&scroll) || (1000..3000).contains(&scroll));
            let load = s.page_load_wait().as_millis();
            assert!((2000..5000).contains(&load));
            let rhythm = s.simulate_human_rhythm().as_millis();
            assert!((800..2000).contains(&rhythm));
        }
    }

    #[test]
    fn action_interval_depends_on_hour() {
        let mut rng = StdRng::seed_from_u64(10);
        for _ in 0..500 {
            let early = action_interval_at(&mut rng, 7).as_secs();
            assert!((15..=119).contains(&early));
            let midday = action_interval_at(&mut rng, 12).as_secs();
            assert!((10..=90).contains(&midday));
            let late_afternoon = action_interval_at(&mut rng, 17).as_secs();
            assert!((15..=90).contains(&late_afternoon));
        }
    }

    #[test]
    fn activity_bookkeeping() {
        let (s, clock) = at(utc(3, 9, 0), 11);
        assert_eq!(s.last_activity(), None);
        s.record_activity();
        clock.advance(Duration::from_secs(30));
        s.record_activity();
        assert_eq!(s.daily_action_count(), 2);
        assert_eq!(s.last_activity(), Some(utc(3, 9, 0) + chrono::TimeDelta::seconds(30)));
        s.reset_daily_count();
        assert_eq!(s.daily_action_count(), 0);
    }
}
