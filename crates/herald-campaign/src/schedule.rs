use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};

use crate::types::PromotionConfig;

/// One concrete firing of a campaign schedule.
///
/// `at` is the canonical trigger instant and the identity of the trigger
/// instance: every tick that matches the same firing produces the same `at`,
/// so claims made against it collide instead of duplicating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub at: DateTime<Utc>,
    /// Close of the send window, for windowed (hourly) campaigns only.
    /// Reminders maturing after this instant are dropped.
    pub window_end: Option<DateTime<Utc>>,
}

/// Decide whether `config` is due at `now`.
///
/// Stateless and tick-driven: inside a matching interval this returns
/// `Some` on every call, and the metadata store is what keeps repeated
/// ticks from re-sending. `tick_secs` is the evaluator cadence and doubles
/// as the tolerance for weekly / 3-day exact-time matching, so a 60 s tick
/// accepts instants within ±59 s of the configured time.
pub fn evaluate(config: &PromotionConfig, now: DateTime<Utc>, tick_secs: u64) -> Option<Trigger> {
    match config {
        PromotionConfig::Hourly {
            start_time,
            end_time,
            ..
        } => {
            // Time-of-day comparison only; a zero-width window never matches.
            let time = now.time();
            if *start_time <= time && time < *end_time {
                Some(Trigger {
                    at: on_date(now, *start_time),
                    window_end: Some(on_date(now, *end_time)),
                })
            } else {
                None
            }
        }

        PromotionConfig::Weekly {
            day_of_week,
            time_of_day,
        } => {
            if weekday_number(now) != *day_of_week {
                return None;
            }
            within_tick(now.time(), *time_of_day, tick_secs).then(|| Trigger {
                at: on_date(now, *time_of_day),
                window_end: None,
            })
        }

        PromotionConfig::ThreeDay {
            days_of_week,
            time_of_day,
        } => {
            if !days_of_week.contains(&weekday_number(now)) {
                return None;
            }
            within_tick(now.time(), *time_of_day, tick_secs).then(|| Trigger {
                at: on_date(now, *time_of_day),
                window_end: None,
            })
        }
    }
}

/// Close of the send window for a trigger instance that fired at `trigger_at`.
///
/// Used when a trigger instance is revisited on a later tick and the original
/// `Trigger` value is no longer at hand. `None` for non-windowed types.
pub fn window_end(config: &PromotionConfig, trigger_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match config {
        PromotionConfig::Hourly { end_time, .. } => Some(on_date(trigger_at, *end_time)),
        PromotionConfig::Weekly { .. } | PromotionConfig::ThreeDay { .. } => None,
    }
}

/// Weekday of `now` numbered 0 = Sunday … 6 = Saturday, matching the config
/// encoding.
fn weekday_number(now: DateTime<Utc>) -> u8 {
    now.weekday().num_days_from_sunday() as u8
}

/// `time` matches `target` when the seconds-of-day difference is strictly
/// less than one tick in either direction.
fn within_tick(time: NaiveTime, target: NaiveTime, tick_secs: u64) -> bool {
    let delta = time.num_seconds_from_midnight() as i64 - target.num_seconds_from_midnight() as i64;
    delta.abs() < tick_secs as i64
}

/// Combine `now`'s calendar date with a wall-clock time.
fn on_date(now: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    now.date_naive().and_time(time).and_utc()
}
