use cadence_common::Clock;
use cadence_schedule::wait_for_business_hours;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Wall clock that follows tokio's (pausable) time.
#[derive(Debug)]
struct TokioClock {
    base: DateTime<Utc>,
    started: Instant,
}

impl TokioClock {
    fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::TimeDelta::from_std(self.started.elapsed()).unwrap();
        self.base + elapsed
    }
}

#[tokio::test(start_paused = true)]
async fn returns_immediately_inside_the_window() {
    // Wednesday 10:00 UTC.
    let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap());
    let cancel = CancellationToken::new();
    let before = Instant::now();
    assert!(wait_for_business_hours(&clock, Tz::UTC, 9, 18, &cancel).await);
    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn sleeps_over_the_weekend_until_monday_opening() {
    // Friday 20:00 UTC; Monday 09:00 is 61 hours away.
    let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap());
    let cancel = CancellationToken::new();
    assert!(wait_for_business_hours(&clock, Tz::UTC, 9, 18, &cancel).await);
    assert_eq!(
        clock.now(),
        Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        trigger.cancel();
    });
    assert!(!wait_for_business_hours(&clock, Tz::UTC, 9, 18, &cancel).await);
    assert!(clock.now() < Utc.with_ymd_and_hms(2024, 1, 6, 12, 2, 0).unwrap());
}
