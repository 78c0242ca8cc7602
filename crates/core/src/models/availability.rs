//! Calendar dates and availability records

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{default_display_name, GroupId, UserId};
use crate::error::Error;

const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// A calendar day with no time zone, written canonically as `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl FromStr for CalendarDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono accepts unpadded fields; the canonical form does not
        if s.len() != 10 {
            return Err(Error::InvalidInput(format!("not a YYYY-MM-DD date: '{}'", s)));
        }
        NaiveDate::parse_from_str(s, CANONICAL_FORMAT)
            .map(Self)
            .map_err(|_| Error::InvalidInput(format!("not a YYYY-MM-DD date: '{}'", s)))
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

/// A member's declared free days within one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub group_id: GroupId,
    pub user_id: UserId,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub free_dates: BTreeSet<CalendarDate>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityRecord {
    pub fn new(
        group_id: GroupId,
        user_id: UserId,
        display_name: &str,
        free_dates: BTreeSet<CalendarDate>,
    ) -> Self {
        Self {
            group_id,
            user_id,
            display_name: super::display_name_or_default(display_name),
            free_dates,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let date = CalendarDate::from_ymd(2025, 3, 7).unwrap();
        assert_eq!(date.to_string(), "2025-03-07");
        assert_eq!("2025-03-07".parse::<CalendarDate>().unwrap(), date);
    }

    #[test]
    fn test_rejects_non_canonical_text() {
        assert!("2025-3-7".parse::<CalendarDate>().is_err());
        assert!("2025-02-30".parse::<CalendarDate>().is_err());
        assert!("2025-03-07T10:00:00Z".parse::<CalendarDate>().is_err());
    }

    #[test]
    fn test_record_defaults_at_boundary() {
        let json = r#"{"group_id":"g1","user_id":"u1","updated_at":"2025-01-01T00:00:00Z"}"#;
        let record: AvailabilityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.display_name, "Someone");
        assert!(record.free_dates.is_empty());
    }

    #[test]
    fn test_free_dates_deserialize_from_strings() {
        let json = r#"{
            "group_id": "g1",
            "user_id": "u1",
            "display_name": "Uma",
            "free_dates": ["2025-01-02", "2025-01-01"],
            "updated_at": "2025-01-01T00:00:00Z"
        }"#;
        let record: AvailabilityRecord = serde_json::from_str(json).unwrap();
        let dates: Vec<String> = record.free_dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2025-01-01", "2025-01-02"]);
    }
}
