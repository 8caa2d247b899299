//! Scheduler
//!
//! Owns the process's only long-lived loop: wake every sleep interval,
//! compare the wall clock against the configured time-of-day, and invoke the
//! run job in-line when due. The job is awaited on the same loop, so two
//! firings can never overlap; the interval timer is monotonic while the
//! firing decision itself is a wall-clock comparison, so long uptimes do not
//! accumulate drift.

use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::time::interval;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::job::RunJob;

// =============================================================================
// Daily Schedule
// =============================================================================

/// Fires once per calendar day at a fixed local time-of-day.
///
/// The fired-today latch is keyed on the local date, so it resets at local
/// midnight without any extra bookkeeping. If the configured time is already
/// past when the schedule is created, the first firing is tomorrow.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    fire_at: NaiveTime,
    last_fired: Option<NaiveDate>,
}

impl DailySchedule {
    /// Create a schedule firing at `fire_at`, seeded against `now` so a
    /// start-up after today's firing time waits for tomorrow.
    pub fn new(fire_at: NaiveTime, now: NaiveDateTime) -> Self {
        let last_fired = if now.time() >= fire_at {
            Some(now.date())
        } else {
            None
        };
        Self {
            fire_at,
            last_fired,
        }
    }

    /// Parse an `HH:MM` (24-hour) time-of-day.
    pub fn parse_time(value: &str) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|_| Error::ScheduleParse(value.to_string()))
    }

    /// The configured firing time
    pub fn fire_at(&self) -> NaiveTime {
        self.fire_at
    }

    /// Check whether the job is due at `now` and, if so, latch today as
    /// fired. Returns true at most once per calendar day.
    pub fn should_fire(&mut self, now: NaiveDateTime) -> bool {
        if now.time() >= self.fire_at && self.last_fired != Some(now.date()) {
            self.last_fired = Some(now.date());
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Polling loop driving the daily run job
pub struct Scheduler {
    schedule: DailySchedule,
    sleep_interval: Duration,
    job: RunJob,
}

impl Scheduler {
    /// Create a scheduler polling every `sleep_interval`.
    pub fn new(schedule: DailySchedule, sleep_interval: Duration, job: RunJob) -> Self {
        Self {
            schedule,
            sleep_interval,
            job,
        }
    }

    /// Run until interrupted. Each poll compares the local wall clock
    /// against the schedule and awaits the job in-line when due; a failing
    /// run is fully contained by the job and the loop continues on the next
    /// tick.
    pub async fn run(mut self) {
        info!(
            "Scheduler started: firing daily at {}, polling every {:?}",
            self.schedule.fire_at(),
            self.sleep_interval
        );

        let mut tick = interval(self.sleep_interval);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if self.schedule.should_fire(Local::now().naive_local()) {
                        info!("Schedule due, starting run");
                        self.job.run().await;
                    }
                }
                signal = &mut ctrl_c => {
                    match signal {
                        Ok(()) => info!("Interrupt received, scheduler shutting down"),
                        Err(e) => error!(
                            "Interrupt handler registration failed, scheduler shutting down: {}",
                            e
                        ),
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    fn at(date: (i32, u32, u32), time: (u32, u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, time.2)
            .unwrap()
    }

    #[test]
    fn test_parse_time_valid() {
        let t = DailySchedule::parse_time("17:00").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(17, 0, 0).unwrap());

        let t = DailySchedule::parse_time("00:05").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(0, 5, 0).unwrap());
    }

    #[test]
    fn test_parse_time_invalid() {
        assert_matches!(
            DailySchedule::parse_time("25:00"),
            Err(Error::ScheduleParse(_))
        );
        assert_matches!(
            DailySchedule::parse_time("17:60"),
            Err(Error::ScheduleParse(_))
        );
        assert_matches!(
            DailySchedule::parse_time("teatime"),
            Err(Error::ScheduleParse(_))
        );
        assert_matches!(DailySchedule::parse_time(""), Err(Error::ScheduleParse(_)));
    }

    #[test]
    fn test_not_due_before_time() {
        let fire_at = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let mut schedule = DailySchedule::new(fire_at, at((2026, 8, 24), (9, 0, 0)));

        assert!(!schedule.should_fire(at((2026, 8, 24), (16, 59, 59))));
    }

    #[test]
    fn test_fires_once_after_time() {
        let fire_at = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let mut schedule = DailySchedule::new(fire_at, at((2026, 8, 24), (9, 0, 0)));

        assert!(schedule.should_fire(at((2026, 8, 24), (17, 0, 0))));
        // Subsequent polls the same day stay quiet.
        assert!(!schedule.should_fire(at((2026, 8, 24), (17, 0, 10))));
        assert!(!schedule.should_fire(at((2026, 8, 24), (23, 59, 59))));
    }

    #[test]
    fn test_resets_at_midnight() {
        let fire_at = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let mut schedule = DailySchedule::new(fire_at, at((2026, 8, 24), (9, 0, 0)));

        assert!(schedule.should_fire(at((2026, 8, 24), (17, 0, 5))));
        assert!(!schedule.should_fire(at((2026, 8, 24), (18, 0, 0))));

        // Next morning is before the firing time again.
        assert!(!schedule.should_fire(at((2026, 8, 25), (0, 0, 10))));
        assert!(schedule.should_fire(at((2026, 8, 25), (17, 0, 1))));
    }

    #[test]
    fn test_startup_after_fire_time_waits_for_tomorrow() {
        let fire_at = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        // Process starts at 18:30, past today's firing time.
        let mut schedule = DailySchedule::new(fire_at, at((2026, 8, 24), (18, 30, 0)));

        assert!(!schedule.should_fire(at((2026, 8, 24), (18, 30, 10))));
        assert!(!schedule.should_fire(at((2026, 8, 24), (23, 59, 0))));
        assert!(schedule.should_fire(at((2026, 8, 25), (17, 0, 0))));
    }

    #[test]
    fn test_late_poll_still_fires_same_day() {
        let fire_at = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let mut schedule = DailySchedule::new(fire_at, at((2026, 8, 24), (9, 0, 0)));

        // A long-blocked loop polling hours late still fires that day.
        assert!(schedule.should_fire(at((2026, 8, 24), (22, 45, 0))));
    }
}
