//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;

use crate::models::{CalendarDate, InviteCode, MemberRole, VoteChoice};

fn conversion_error<E>(e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

/// Parse a stored invite code (already normalized on write)
pub fn parse_invite_code_opt(s: Option<String>) -> Option<InviteCode> {
    s.as_deref().and_then(InviteCode::normalize)
}

/// Convert a u8 to MemberRole; unknown values fall back to the least privileged role
pub fn role_from_u8(value: u8) -> MemberRole {
    match value {
        3 => MemberRole::Owner,
        2 => MemberRole::Admin,
        1 => MemberRole::Member,
        _ => MemberRole::Pending,
    }
}

/// Parse a stored vote choice
pub fn parse_vote_choice(s: &str) -> Result<VoteChoice, SqlError> {
    s.parse().map_err(conversion_error)
}

/// Parse a JSON array of canonical date strings
pub fn parse_free_dates(json: &str) -> Result<BTreeSet<CalendarDate>, SqlError> {
    serde_json::from_str(json).map_err(conversion_error)
}

/// Encode a free-date set as a JSON array of canonical date strings
pub fn encode_free_dates(dates: &BTreeSet<CalendarDate>) -> Result<String, serde_json::Error> {
    serde_json::to_string(dates)
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
