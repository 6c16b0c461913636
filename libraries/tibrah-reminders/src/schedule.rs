//! Daily reminder schedule
//!
//! [`ReminderSchedule::check`] decides which reminders are due at a given
//! local time and remembers what already fired today. Instead of polling
//! every minute, the service asks [`ReminderSchedule::next_wake`] when the
//! next reminder (or the next midnight reset) is due and sleeps until then.

use crate::types::Reminder;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Fired-today bookkeeping
#[derive(Debug, Default)]
pub struct ReminderSchedule {
    /// Local date the `fired` set belongs to
    day: Option<NaiveDate>,
    fired: HashSet<String>,
}

impl ReminderSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reminders due at `now` that have not fired today
    ///
    /// Due means enabled, same `HH:MM` as `now`, and scheduled for today's
    /// weekday. Returned reminders are recorded as fired until the local
    /// date changes. A minute that is never checked is skipped for the day.
    pub fn check(&mut self, reminders: &[Reminder], now: NaiveDateTime) -> Vec<Reminder> {
        self.roll_over(now.date());

        let weekday = now.weekday();
        let mut due = Vec::new();
        for reminder in reminders {
            if !reminder.enabled
                || !reminder.time.matches(now.time())
                || !reminder.fires_on(weekday)
                || self.fired.contains(&reminder.id)
            {
                continue;
            }
            self.fired.insert(reminder.id.clone());
            due.push(reminder.clone());
        }
        due
    }

    /// Whether `id` already fired on the current day
    pub fn has_fired(&self, id: &str) -> bool {
        self.fired.contains(id)
    }

    pub fn fired_today(&self) -> usize {
        self.fired.len()
    }

    /// Clear the fired set when the local date changes
    fn roll_over(&mut self, today: NaiveDate) {
        if self.day != Some(today) {
            if !self.fired.is_empty() {
                tracing::debug!(%today, cleared = self.fired.len(), "New day, fired reminders reset");
            }
            self.fired.clear();
            self.day = Some(today);
        }
    }

    /// Earliest of the next reminder fire time and the next local midnight
    pub fn next_wake(&self, reminders: &[Reminder], now: NaiveDateTime) -> NaiveDateTime {
        let midnight = next_midnight(now);
        upcoming(reminders, now)
            .peek()
            .map_or(midnight, |Reverse((at, _))| (*at).min(midnight))
    }
}

/// Next time strictly after `now` at which `reminder` would fire
///
/// `None` if disabled. Looks at most one week ahead.
pub fn next_fire(reminder: &Reminder, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if !reminder.enabled {
        return None;
    }
    let time = reminder.time.to_naive_time();
    (0..=7)
        .map(|offset| (now.date() + Duration::days(offset)).and_time(time))
        .find(|at| *at > now && reminder.fires_on(at.weekday()))
}

/// Min-heap of upcoming fire times, earliest on top
pub fn upcoming(reminders: &[Reminder], now: NaiveDateTime) -> BinaryHeap<Reverse<(NaiveDateTime, String)>> {
    reminders
        .iter()
        .filter_map(|r| next_fire(r, now).map(|at| Reverse((at, r.id.clone()))))
        .collect()
}

fn next_midnight(now: NaiveDateTime) -> NaiveDateTime {
    (now.date() + Duration::days(1)).and_time(chrono::NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReminderKind, ReminderTime};

    // 2026-10-16 is a Friday
    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn reminder(time: &str) -> Reminder {
        let mut r = Reminder::new(ReminderKind::Medication, "Pills", time.parse().unwrap());
        r.id = format!("r-{time}");
        r
    }

    #[test]
    fn fires_once_per_day() {
        let reminders = vec![reminder("07:00")];
        let mut schedule = ReminderSchedule::new();

        assert!(schedule.check(&reminders, at(16, 6, 59, 59)).is_empty());
        assert_eq!(schedule.check(&reminders, at(16, 7, 0, 0)).len(), 1);
        // Repeated checks in the same minute and later that day
        assert!(schedule.check(&reminders, at(16, 7, 0, 30)).is_empty());
        assert!(schedule.check(&reminders, at(16, 23, 59, 0)).is_empty());
        assert!(schedule.has_fired("r-07:00"));

        // Next day fires again
        assert!(schedule.check(&reminders, at(17, 0, 0, 0)).is_empty());
        assert!(!schedule.has_fired("r-07:00"));
        assert_eq!(schedule.check(&reminders, at(17, 7, 0, 10)).len(), 1);
    }

    #[test]
    fn missed_minute_is_skipped() {
        let reminders = vec![reminder("07:00")];
        let mut schedule = ReminderSchedule::new();
        assert!(schedule.check(&reminders, at(16, 7, 1, 0)).is_empty());
        assert_eq!(schedule.fired_today(), 0);
    }

    #[test]
    fn respects_enabled_and_days() {
        let mut disabled = reminder("08:00");
        disabled.enabled = false;
        // Friday is 5
        let weekdays_only = reminder("08:00").with_days([1, 2, 3, 4]).unwrap();
        let mut friday = reminder("08:00").with_days([5]).unwrap();
        friday.id = "friday".into();

        let mut schedule = ReminderSchedule::new();
        let due = schedule.check(&[disabled, weekdays_only, friday], at(16, 8, 0, 0));
        let ids: Vec<&str> = due.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["friday"]);
    }

    #[test]
    fn next_fire_skips_passed_time_and_other_days() {
        let r = reminder("07:00");
        assert_eq!(next_fire(&r, at(16, 6, 0, 0)), Some(at(16, 7, 0, 0)));
        assert_eq!(next_fire(&r, at(16, 7, 0, 0)), Some(at(17, 7, 0, 0)));

        // Mondays only; next Monday after Friday 16th is the 19th
        let monday = reminder("07:00").with_days([1]).unwrap();
        assert_eq!(next_fire(&monday, at(16, 6, 0, 0)), Some(at(19, 7, 0, 0)));

        // Same weekday as today, already passed: one week ahead
        let friday = reminder("07:00").with_days([5]).unwrap();
        assert_eq!(next_fire(&friday, at(16, 8, 0, 0)), Some(at(23, 7, 0, 0)));

        let mut off = reminder("07:00");
        off.enabled = false;
        assert_eq!(next_fire(&off, at(16, 6, 0, 0)), None);
    }

    #[test]
    fn heap_orders_earliest_first() {
        let reminders = vec![reminder("21:00"), reminder("07:30"), reminder("12:00")];
        let mut heap = upcoming(&reminders, at(16, 10, 0, 0));

        let order: Vec<NaiveDateTime> = std::iter::from_fn(|| heap.pop().map(|Reverse((t, _))| t)).collect();
        assert_eq!(order, vec![at(16, 12, 0, 0), at(16, 21, 0, 0), at(17, 7, 30, 0)]);
    }

    #[test]
    fn wakes_at_midnight_when_nothing_sooner() {
        let schedule = ReminderSchedule::new();
        assert_eq!(schedule.next_wake(&[], at(16, 10, 0, 0)), at(17, 0, 0, 0));

        let reminders = vec![reminder("07:00")];
        assert_eq!(schedule.next_wake(&reminders, at(16, 22, 0, 0)), at(17, 0, 0, 0));
        assert_eq!(schedule.next_wake(&reminders, at(17, 0, 0, 0)), at(17, 7, 0, 0));
    }

    #[test]
    fn reminder_time_roundtrips_to_naive() {
        let time = ReminderTime::new(23, 59).unwrap();
        assert_eq!(time.to_naive_time(), chrono::NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }
}
