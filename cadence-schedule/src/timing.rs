//! Randomised delay generators and retry spacing.
//!
//! These return durations; sleeping is left to the caller.

use cadence_common::clock::{add_duration, elapsed_between};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Chance that [`human_delay`] adds a distraction pause.
pub const DISTRACTION_PROBABILITY: f64 = 0.10;
/// Chance that [`random_break`] yields a break.
pub const RANDOM_BREAK_PROBABILITY: f64 = 0.05;

/// `base_ms + [0, span_ms)` milliseconds.
pub fn uniform_ms<R: Rng + ?Sized>(rng: &mut R, base_ms: u64, span_ms: u64) -> Duration {
    let jitter = if span_ms == 0 {
        0
    } else {
        rng.gen_range(0..span_ms)
    };
    Duration::from_millis(base_ms + jitter)
}

/// With `probability`, extend `base` by `extra_base_ms + [0, extra_span_ms)`.
pub fn with_distraction<R: Rng + ?Sized>(
    rng: &mut R,
    base: Duration,
    probability: f64,
    extra_base_ms: u64,
    extra_span_ms: u64,
) -> Duration {
    if rng.gen::<f64>() < probability {
        base + uniform_ms(rng, extra_base_ms, extra_span_ms)
    } else {
        base
    }
}

/// Uniform delay in `[min_ms, max_ms)`. A non-increasing range is widened to
/// `[min_ms, min_ms + 1000)`.
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R, min_ms: u64, max_ms: u64) -> Duration {
    let max_ms = if max_ms <= min_ms { min_ms + 1000 } else { max_ms };
    uniform_ms(rng, min_ms, max_ms - min_ms)
}

/// [`random_delay`] plus an occasional 1–3 s distraction.
pub fn human_delay<R: Rng + ?Sized>(rng: &mut R, base_min_ms: u64, base_max_ms: u64) -> Duration {
    let base = random_delay(rng, base_min_ms, base_max_ms);
    with_distraction(rng, base, DISTRACTION_PROBABILITY, 1000, 2000)
}

/// Occasionally (5%) a 2–6 minute break, otherwise `None`.
pub fn random_break<R: Rng + ?Sized>(rng: &mut R) -> Option<Duration> {
    if rng.gen::<f64>() < RANDOM_BREAK_PROBABILITY {
        Some(Duration::from_secs(60 * rng.gen_range(2..=6)))
    } else {
        None
    }
}

/// `base * 2^attempt`, capped at `max`, plus jitter below a quarter of the delay.
///
/// ```
/// use cadence_schedule::timing::exponential_backoff;
/// use rand::{rngs::StdRng, SeedableRng};
/// use std::time::Duration;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let d = exponential_backoff(&mut rng, 3, Duration::from_secs(1), Duration::from_secs(60));
/// assert!(d >= Duration::from_secs(8) && d < Duration::from_secs(10));
/// ```
pub fn exponential_backoff<R: Rng + ?Sized>(
    rng: &mut R,
    attempt: u32,
    base: Duration,
    max: Duration,
) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    let delay = base.checked_mul(factor).unwrap_or(max).min(max);

    let quarter = u64::try_from((delay / 4).as_nanos()).unwrap_or(u64::MAX);
    if quarter == 0 {
        return delay;
    }
    delay + Duration::from_nanos(rng.gen_range(0..quarter))
}

/// A random instant within `window_minutes` after `base`, at second granularity.
pub fn randomize_schedule<R: Rng + ?Sized>(
    rng: &mut R,
    base: DateTime<Utc>,
    window_minutes: u32,
) -> DateTime<Utc> {
    let window_secs = u64::from(window_minutes) * 60;
    if window_secs == 0 {
        return base;
    }
    add_duration(base, Duration::from_secs(rng.gen_range(0..window_secs)))
}

/// How much longer to wait so that `min_interval` separates `last` from the next action.
pub fn throttle_remaining(last: DateTime<Utc>, min_interval: Duration, now: DateTime<Utc>) -> Duration {
    min_interval.saturating_sub(elapsed_between(last, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_delay_stays_in_range_and_widens_bad_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let d = random_delay(&mut rng, 200, 800);
            assert!(d >= Duration::from_millis(200) && d < Duration::from_millis(800));
            let w = random_delay(&mut rng, 500, 100);
            assert!(w >= Duration::from_millis(500) && w < Duration::from_millis(1500));
        }
    }

    #[test]
    fn human_delay_tail_is_bounded() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut saw_tail = false;
        for _ in 0..1000 {
            let d = human_delay(&mut rng, 100, 200);
            assert!(d >= Duration::from_millis(100) && d < Duration::from_millis(3200));
            saw_tail |= d >= Duration::from_millis(1100);
        }
        assert!(saw_tail);
    }

    #[test]
    fn backoff_is_capped_and_never_below_the_base_delay() {
        let mut rng = StdRng::seed_from_u64(3);
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(5);
        for attempt in 0..64 {
            let d = exponential_backoff(&mut rng, attempt, base, max);
            let floor = base
                .checked_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
                .unwrap_or(max)
                .min(max);
            assert!(d >= floor);
            assert!(d < floor + floor / 4 + Duration::from_nanos(1));
        }
        assert_eq!(
            exponential_backoff(&mut rng, 0, Duration::ZERO, max),
            Duration::ZERO
        );
    }

    #[test]
    fn randomized_schedule_falls_inside_the_window() {
        let mut rng = StdRng::seed_from_u64(4);
        let base = DateTime::<Utc>::UNIX_EPOCH;
        for _ in 0..200 {
            let t = randomize_schedule(&mut rng, base, 30);
            assert!(t >= base && elapsed_between(base, t) < Duration::from_secs(1800));
        }
        assert_eq!(randomize_schedule(&mut rng, base, 0), base);
    }

    #[test]
    fn throttle_counts_down() {
        let t0 = DateTime::<Utc>::UNIX_EPOCH;
        let interval = Duration::from_secs(90);
        assert_eq!(throttle_remaining(t0, interval, t0), interval);
        let later = add_duration(t0, Duration::from_secs(60));
        assert_eq!(throttle_remaining(t0, interval, later), Duration::from_secs(30));
        let past = add_duration(t0, Duration::from_secs(600));
        assert_eq!(throttle_remaining(t0, interval, past), Duration::ZERO);
    }

    #[test]
    fn random_break_is_rare_and_short() {
        let mut rng = StdRng::seed_from_u64(5);
        let breaks: Vec<_> = (0..2000).filter_map(|_| random_break(&mut rng)).collect();
        assert!(!breaks.is_empty() && breaks.len() < 250);
        assert!(breaks
            .iter()
            .all(|b| *b >= Duration::from_secs(120) && *b <= Duration::from_secs(360)));
    }
}
