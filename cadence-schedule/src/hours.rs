//! Business-hours window math and the optional waiter built on it.

use cadence_common::Clock;
use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Timelike, Weekday};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Weekday with `start_hour <= hour < end_hour` in the instant's own timezone.
pub fn is_business_hours<Tz: TimeZone>(local: &DateTime<Tz>, start_hour: u32, end_hour: u32) -> bool {
    if is_weekend(local.weekday()) {
        return false;
    }
    let hour = local.hour();
    hour >= start_hour && hour < end_hour
}

/// The first weekday opening (`start_hour:00`) strictly after `local`.
///
/// Falls forward an hour when the opening lands in a DST gap.
pub fn next_business_start<Tz: TimeZone>(local: &DateTime<Tz>, start_hour: u32) -> DateTime<Tz> {
    let tz = local.timezone();
    let today = local.date_naive();
    let start_hour = start_hour.min(23);

    for offset in 0..=8u64 {
        let Some(day) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if is_weekend(day.weekday()) {
            continue;
        }
        let candidates = [start_hour, (start_hour + 1).min(23)];
        let opening = candidates.iter().find_map(|h| {
            let time = NaiveTime::from_hms_opt(*h, 0, 0)?;
            tz.from_local_datetime(&day.and_time(time)).earliest()
        });
        if let Some(opening) = opening {
            if opening > *local {
                return opening;
            }
        }
    }
    local.clone()
}

/// Zero inside business hours, otherwise the time until the next opening.
pub fn until_business_hours<Tz: TimeZone>(
    local: &DateTime<Tz>,
    start_hour: u32,
    end_hour: u32,
) -> Duration {
    if is_business_hours(local, start_hour, end_hour) {
        return Duration::ZERO;
    }
    let next = next_business_start(local, start_hour);
    next.signed_duration_since(local.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Sleep until business hours in `tz`, recomputing after every wake-up.
///
/// Returns `true` once inside the window, `false` if `cancel` fired first.
pub async fn wait_for_business_hours(
    clock: &dyn Clock,
    tz: chrono_tz::Tz,
    start_hour: u32,
    end_hour: u32,
    cancel: &CancellationToken,
) -> bool {
    loop {
        let local = clock.now().with_timezone(&tz);
        let wait = until_business_hours(&local, start_hour, end_hour);
        if wait.is_zero() {
            return true;
        }
        info!(
            wait_secs = wait.as_secs(),
            local = %local.format("%a %H:%M"),
            "hours.waiting"
        );
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::Tz;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn weekdays_only_within_bounds() {
        // 2024-01-03 is a Wednesday, 2024-01-06 a Saturday.
        assert!(is_business_hours(&utc(2024, 1, 3, 9, 0), 9, 18));
        assert!(is_business_hours(&utc(2024, 1, 3, 17, 59), 9, 18));
        assert!(!is_business_hours(&utc(2024, 1, 3, 18, 0), 9, 18));
        assert!(!is_business_hours(&utc(2024, 1, 3, 8, 59), 9, 18));
        assert!(!is_business_hours(&utc(2024, 1, 6, 12, 0), 9, 18));
    }

    #[test]
    fn next_start_same_day_before_opening() {
        let next = next_business_start(&utc(2024, 1, 3, 6, 30), 9);
        assert_eq!(next, utc(2024, 1, 3, 9, 0));
    }

    #[test]
    fn next_start_after_close_is_tomorrow() {
        let next = next_business_start(&utc(2024, 1, 3, 19, 0), 9);
        assert_eq!(next, utc(2024, 1, 4, 9, 0));
    }

    #[test]
    fn friday_evening_and_weekend_roll_to_monday() {
        let monday = utc(2024, 1, 8, 9, 0);
        assert_eq!(next_business_start(&utc(2024, 1, 5, 20, 0), 9), monday);
        assert_eq!(next_business_start(&utc(2024, 1, 6, 3, 0), 9), monday);
        assert_eq!(next_business_start(&utc(2024, 1, 7, 23, 0), 9), monday);
    }

    #[test]
    fn opening_is_computed_in_local_time() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 12:00 UTC on a Wednesday in winter is 07:00 in New York.
        let local = utc(2024, 1, 3, 12, 0).with_timezone(&tz);
        assert_eq!(
            until_business_hours(&local, 9, 18),
            Duration::from_secs(2 * 3600)
        );
        let next = next_business_start(&local, 9);
        assert_eq!(next.with_timezone(&Utc), utc(2024, 1, 3, 14, 0));
    }

    #[test]
    fn inside_window_waits_nothing() {
        assert_eq!(until_business_hours(&utc(2024, 1, 3, 10, 0), 9, 18), Duration::ZERO);
    }
}
