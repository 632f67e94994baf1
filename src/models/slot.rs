use chrono::{NaiveDate, NaiveTime};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A candidate meeting window on a single date. Start is always strictly
/// before end; construction outside `new`/`parse` is not possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> anyhow::Result<Self> {
        anyhow::ensure!(
            start_time < end_time,
            "slot start {start_time} must be before end {end_time}"
        );
        Ok(Self {
            date,
            start_time,
            end_time,
        })
    }

    /// Parse from the wire shapes: `YYYY-MM-DD` and `HH:MM`.
    pub fn parse(date: &str, start_time: &str, end_time: &str) -> anyhow::Result<Self> {
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| anyhow::anyhow!("invalid date format: {date}"))?;
        let start = parse_time(start_time)?;
        let end = parse_time(end_time)?;
        Self::new(date, start, end)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn start_string(&self) -> String {
        self.start_time.format(TIME_FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end_time.format(TIME_FORMAT).to_string()
    }

    /// "Friday, November 14, 2025" style date used in reply bodies.
    pub fn long_date(&self) -> String {
        self.date.format("%A, %B %-d, %Y").to_string()
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TimeSlotWire {
            date: self.date_string(),
            start_time: self.start_string(),
            end_time: self.end_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = TimeSlotWire::deserialize(deserializer)?;
        TimeSlot::parse(&wire.date, &wire.start_time, &wire.end_time)
            .map_err(|e| D::Error::custom(e.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct TimeSlotWire {
    date: String,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: String,
}

/// A busy range on one date, derived from calendar documents. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BusyInterval {
    /// Half-open overlap: touching endpoints do not conflict.
    pub fn overlaps(&self, slot_start: NaiveTime, slot_end: NaiveTime) -> bool {
        slot_start < self.end && slot_end > self.start
    }
}

/// Daily availability window, per user, with a fixed default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    #[serde(with = "wire_time")]
    pub start: NaiveTime,
    #[serde(with = "wire_time")]
    pub end: NaiveTime,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        }
    }
}

mod wire_time {
    use super::*;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_time(&s).map_err(|e| D::Error::custom(e.to_string()))
    }
}

/// Inputs for one scheduling attempt. Read-only once built.
#[derive(Debug, Clone)]
pub struct SchedulingRequest {
    pub meeting_duration_minutes: u32,
    pub working_hours: WorkingHours,
    pub preferred_dates: Vec<NaiveDate>,
}

impl SchedulingRequest {
    pub fn new(meeting_duration_minutes: u32, working_hours: WorkingHours) -> Self {
        Self {
            meeting_duration_minutes,
            working_hours,
            preferred_dates: Vec::new(),
        }
    }
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|_| anyhow::anyhow!("invalid time format: {s}"))
}
