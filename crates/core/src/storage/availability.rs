//! Availability record storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{encode_free_dates, parse_datetime, parse_free_dates, OptionalExt};
use crate::error::Result;
use crate::models::{AvailabilityRecord, GroupId, UserId};

pub struct AvailabilityStore<'a> {
    conn: &'a Connection,
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<AvailabilityRecord> {
    Ok(AvailabilityRecord {
        group_id: GroupId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        display_name: row.get(2)?,
        free_dates: parse_free_dates(&row.get::<_, String>(3)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

impl<'a> AvailabilityStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store a record, replacing any previous one for the same (group, user)
    #[instrument(skip(self, record), fields(group_id = %record.group_id, user_id = %record.user_id, dates = record.free_dates.len()))]
    pub fn replace(&self, record: &AvailabilityRecord) -> Result<()> {
        let free_dates = encode_free_dates(&record.free_dates)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO availability (group_id, user_id, display_name, free_dates, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.group_id.as_str(),
                record.user_id.as_str(),
                record.display_name,
                free_dates,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get one member's record
    #[instrument(skip(self))]
    pub fn get(&self, group_id: &GroupId, user_id: &UserId) -> Result<Option<AvailabilityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id, user_id, display_name, free_dates, updated_at
             FROM availability WHERE group_id = ?1 AND user_id = ?2",
        )?;
        let record = stmt
            .query_row(params![group_id.as_str(), user_id.as_str()], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// List every record in a group
    #[instrument(skip(self))]
    pub fn list_for_group(&self, group_id: &GroupId) -> Result<Vec<AvailabilityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id, user_id, display_name, free_dates, updated_at
             FROM availability WHERE group_id = ?1 ORDER BY user_id",
        )?;

        let records = stmt
            .query_map(params![group_id.as_str()], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Delete one member's record
    #[instrument(skip(self))]
    pub fn delete(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM availability WHERE group_id = ?1 AND user_id = ?2",
            params![group_id.as_str(), user_id.as_str()],
        )?;
        Ok(())
    }
}
