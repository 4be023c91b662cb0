//! Medication schedule entries.
//!
//! A [`ScheduleEntry`] is one medication on the user's plan: name, dose
//! strength, time of day, and the weekdays it is taken on. The
//! `consumed_today` flag is the only field mutated outside of a wholesale
//! edit; the acknowledgment handler sets it and the daily reset clears it.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Weekday};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Dose strength, a fixed vocabulary stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Dose {
    Quarter,
    Half,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl Dose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dose::Quarter => "1/4",
            Dose::Half => "1/2",
            Dose::One => "1",
            Dose::Two => "2",
            Dose::Three => "3",
            Dose::Four => "4",
            Dose::Five => "5",
            Dose::Six => "6",
        }
    }
}

impl fmt::Display for Dose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dose {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1/4" => Ok(Dose::Quarter),
            "1/2" => Ok(Dose::Half),
            "1" => Ok(Dose::One),
            "2" => Ok(Dose::Two),
            "3" => Ok(Dose::Three),
            "4" => Ok(Dose::Four),
            "5" => Ok(Dose::Five),
            "6" => Ok(Dose::Six),
            other => Err(ValidationError::InvalidValue {
                field: "dose".into(),
                message: format!("unknown dose strength '{other}'"),
            }),
        }
    }
}

impl From<Dose> for String {
    fn from(d: Dose) -> Self {
        d.as_str().to_string()
    }
}

impl TryFrom<String> for Dose {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Full weekday name used for storage and display.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Set of active weekdays, stored as a comma-separated list of full names.
///
/// Iteration order is Sunday-first, matching the stored representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

const DAY_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

impl WeekdaySet {
    pub fn new() -> Self {
        Self(0)
    }

    /// All seven days (the original "daily" checkbox).
    pub fn every_day() -> Self {
        Self(0x7f)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        DAY_ORDER.into_iter().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::new();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for day in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(weekday_name(day))?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for WeekdaySet {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::new();
        for token in s.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let day: Weekday = token.parse().map_err(|_| ValidationError::InvalidValue {
                field: "days".into(),
                message: format!("unknown weekday '{token}'"),
            })?;
            set.insert(day);
        }
        Ok(set)
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A stored medication schedule entry.
///
/// The id is assigned by the entry store on creation and immutable
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub name: String,
    pub dose: Dose,
    /// Scheduled time of day, wall clock.
    pub time: NaiveTime,
    pub days: WeekdaySet,
    /// Whether the dose has been acknowledged today. Cleared at the daily
    /// reset boundary.
    pub consumed_today: bool,
}

/// Entry fields before the store has assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub name: String,
    pub dose: Dose,
    pub time: NaiveTime,
    pub days: WeekdaySet,
}

impl NewEntry {
    /// Reject a malformed entry at the creation/edit boundary so it never
    /// reaches the trigger planner.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.days.is_empty() {
            return Err(ValidationError::EmptyWeekdays);
        }
        Ok(())
    }
}
