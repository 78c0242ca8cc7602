//! Group and member record storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_invite_code_opt, role_from_u8, OptionalExt};
use crate::error::Result;
use crate::models::{Group, GroupId, InviteCode, MemberRecord, MemberRole, UserId};

const GROUP_COLUMNS: &str = "id, name, creator_id, created_at, invite_code, theme";
const MEMBER_COLUMNS: &str = "group_id, user_id, display_name, role, joined_at";

pub struct GroupStore<'a> {
    conn: &'a Connection,
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(row.get(0)?),
        name: row.get(1)?,
        creator_id: UserId(row.get(2)?),
        created_at: parse_datetime(&row.get::<_, String>(3)?)?,
        member_ids: Vec::new(),
        admin_ids: Vec::new(),
        pending_ids: Vec::new(),
        invite_code: parse_invite_code_opt(row.get(4)?),
        theme: row.get(5)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MemberRecord> {
    Ok(MemberRecord {
        group_id: GroupId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        display_name: row.get(2)?,
        role: role_from_u8(row.get::<_, u8>(3)?),
        joined_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

impl<'a> GroupStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a group together with its owner record and the owner's index entry
    #[instrument(skip(self, group, owner), fields(group_id = %group.id, creator_id = %group.creator_id))]
    pub fn create(&self, group: &Group, owner: &MemberRecord) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO huddle_groups (id, name, creator_id, created_at, invite_code, theme)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                group.id.as_str(),
                group.name,
                group.creator_id.as_str(),
                group.created_at.to_rfc3339(),
                group.invite_code.as_ref().map(|c| c.as_str()),
                group.theme,
            ],
        )?;
        tx.execute(
            "INSERT INTO group_members (group_id, user_id, display_name, role, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                owner.group_id.as_str(),
                owner.user_id.as_str(),
                owner.display_name,
                owner.role as u8,
                owner.joined_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO user_groups (user_id, group_id, linked_at) VALUES (?1, ?2, ?3)",
            params![owner.user_id.as_str(), group.id.as_str(), Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Find a group by id, with its member lists filled in
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: &GroupId) -> Result<Option<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM huddle_groups WHERE id = ?1"
        ))?;
        let group = stmt
            .query_row(params![id.as_str()], group_from_row)
            .optional()?;

        self.with_members(group)
    }

    /// Find the group whose current invite code matches
    #[instrument(skip(self))]
    pub fn find_by_invite_code(&self, code: &InviteCode) -> Result<Option<Group>> {
        // Codes are not unique in the schema; the oldest holder wins a collision
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM huddle_groups WHERE invite_code = ?1
             ORDER BY created_at LIMIT 1"
        ))?;
        let group = stmt
            .query_row(params![code.as_str()], group_from_row)
            .optional()?;

        self.with_members(group)
    }

    fn with_members(&self, group: Option<Group>) -> Result<Option<Group>> {
        match group {
            Some(group) => {
                let members = self.list_members(&group.id)?;
                Ok(Some(group.with_member_records(&members)))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the group's invite code; returns false when the group does not exist
    #[instrument(skip(self))]
    pub fn set_invite_code(&self, group_id: &GroupId, code: &InviteCode) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE huddle_groups SET invite_code = ?1 WHERE id = ?2",
            params![code.as_str(), group_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Set or clear the theme key; returns false when the group does not exist
    #[instrument(skip(self))]
    pub fn set_theme(&self, group_id: &GroupId, theme: Option<&str>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE huddle_groups SET theme = ?1 WHERE id = ?2",
            params![theme, group_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Get a single member record
    #[instrument(skip(self))]
    pub fn get_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<Option<MemberRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ?1 AND user_id = ?2"
        ))?;
        let member = stmt
            .query_row(params![group_id.as_str(), user_id.as_str()], member_from_row)
            .optional()?;
        Ok(member)
    }

    /// Insert a member record unless one already exists; returns whether it was inserted
    #[instrument(skip(self, record), fields(group_id = %record.group_id, user_id = %record.user_id, role = ?record.role))]
    pub fn add_member(&self, record: &MemberRecord) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, display_name, role, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.group_id.as_str(),
                record.user_id.as_str(),
                record.display_name,
                record.role as u8,
                record.joined_at.to_rfc3339(),
            ],
        )?;
        if inserted > 0 && record.role.is_member() {
            tx.execute(
                "INSERT OR IGNORE INTO user_groups (user_id, group_id, linked_at) VALUES (?1, ?2, ?3)",
                params![record.user_id.as_str(), record.group_id.as_str(), Utc::now().to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// Move a pending record to `Member` in one statement, refreshing the name snapshot.
    ///
    /// The pending list and the member list are both views over the same row, so a
    /// reader sees the request either still pending or fully approved.
    #[instrument(skip(self))]
    pub fn approve_pending(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE group_members SET role = ?1, display_name = ?2, joined_at = ?3
             WHERE group_id = ?4 AND user_id = ?5 AND role = ?6",
            params![
                MemberRole::Member as u8,
                display_name,
                Utc::now().to_rfc3339(),
                group_id.as_str(),
                user_id.as_str(),
                MemberRole::Pending as u8,
            ],
        )?;
        if changed > 0 {
            tx.execute(
                "INSERT OR IGNORE INTO user_groups (user_id, group_id, linked_at) VALUES (?1, ?2, ?3)",
                params![user_id.as_str(), group_id.as_str(), Utc::now().to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Update a member's role
    #[instrument(skip(self))]
    pub fn update_role(&self, group_id: &GroupId, user_id: &UserId, new_role: MemberRole) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE group_members SET role = ?1 WHERE group_id = ?2 AND user_id = ?3",
            params![new_role as u8, group_id.as_str(), user_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a member record of any role
    #[instrument(skip(self))]
    pub fn remove_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id.as_str(), user_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a member record only while it is still pending
    #[instrument(skip(self))]
    pub fn remove_pending(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2 AND role = ?3",
            params![group_id.as_str(), user_id.as_str(), MemberRole::Pending as u8],
        )?;
        Ok(changed > 0)
    }

    /// List a group's member records in join order, pending requests included
    #[instrument(skip(self))]
    pub fn list_members(&self, group_id: &GroupId) -> Result<Vec<MemberRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ?1
             ORDER BY joined_at, rowid"
        ))?;

        let members = stmt
            .query_map(params![group_id.as_str()], member_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(members)
    }

    /// Drop a group from a user's profile index
    #[instrument(skip(self))]
    pub fn unlink_user(&self, user_id: &UserId, group_id: &GroupId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM user_groups WHERE user_id = ?1 AND group_id = ?2",
            params![user_id.as_str(), group_id.as_str()],
        )?;
        Ok(())
    }

    /// Group ids from a user's profile index, oldest link first
    #[instrument(skip(self))]
    pub fn list_group_ids_for_user(&self, user_id: &UserId) -> Result<Vec<GroupId>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id FROM user_groups WHERE user_id = ?1 ORDER BY linked_at, rowid",
        )?;

        let ids = stmt
            .query_map(params![user_id.as_str()], |row| Ok(GroupId(row.get(0)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids)
    }
}
