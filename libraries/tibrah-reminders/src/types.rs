//! Reminder records

use crate::error::{ReminderError, Result};
use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What a reminder is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Medication,
    Water,
    Exercise,
    Meal,
    Sleep,
    Appointment,
    Custom,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 7] = [
        ReminderKind::Medication,
        ReminderKind::Water,
        ReminderKind::Exercise,
        ReminderKind::Meal,
        ReminderKind::Sleep,
        ReminderKind::Appointment,
        ReminderKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::Medication => "medication",
            ReminderKind::Water => "water",
            ReminderKind::Exercise => "exercise",
            ReminderKind::Meal => "meal",
            ReminderKind::Sleep => "sleep",
            ReminderKind::Appointment => "appointment",
            ReminderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderKind {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        ReminderKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReminderError::InvalidKind(s.to_string()))
    }
}

/// Wall-clock time of day with minute precision, stored as `"HH:MM"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ReminderError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Same hour and minute as `time`, ignoring seconds
    pub fn matches(self, time: NaiveTime) -> bool {
        time.hour() == u32::from(self.hour) && time.minute() == u32::from(self.minute)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for ReminderTime {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ReminderError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = ReminderError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(time: ReminderTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Weekday number, 0 = Sunday ..= 6 = Saturday
pub fn weekday_number(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// A daily or weekday reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ReminderKind,

    pub title: String,

    #[serde(default)]
    pub body: String,

    pub time: ReminderTime,

    /// Weekdays it fires on (0 = Sunday); empty means every day
    #[serde(default)]
    pub days: BTreeSet<u8>,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Reminder {
    /// Enabled, every-day reminder with a fresh id
    pub fn new(kind: ReminderKind, title: impl Into<String>, time: ReminderTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            body: String::new(),
            time,
            days: BTreeSet::new(),
            enabled: true,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Restrict to `days` (0 = Sunday); an empty set means every day
    pub fn with_days(mut self, days: impl IntoIterator<Item = u8>) -> Result<Self> {
        self.days = days.into_iter().collect();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        match self.days.iter().find(|d| **d > 6) {
            Some(day) => Err(ReminderError::InvalidWeekday(*day)),
            None => Ok(()),
        }
    }

    pub fn fires_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&weekday_number(day))
    }
}
