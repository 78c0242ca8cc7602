//! Group model - the unit of membership, availability and planning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupId, InviteCode, MemberRecord, MemberRole, UserId};

/// A Group and its membership lists.
///
/// The three id lists are derived from the group's member records whenever the
/// group is loaded from storage; they are never written on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Members in join order (owner, admins and members)
    #[serde(default)]
    pub member_ids: Vec<UserId>,
    /// Owner and admins; always a subset of `member_ids`
    #[serde(default)]
    pub admin_ids: Vec<UserId>,
    /// Outstanding join requests
    #[serde(default)]
    pub pending_ids: Vec<UserId>,
    pub invite_code: Option<InviteCode>,
    pub theme: Option<String>,
}

impl Group {
    /// A new group whose creator is its only member and admin
    pub fn new(name: String, creator_id: UserId, invite_code: InviteCode) -> Self {
        Self {
            id: GroupId::generate(),
            name,
            member_ids: vec![creator_id.clone()],
            admin_ids: vec![creator_id.clone()],
            creator_id,
            created_at: Utc::now(),
            pending_ids: Vec::new(),
            invite_code: Some(invite_code),
            theme: None,
        }
    }

    /// Rebuild the id lists from member records (expected in join order)
    pub fn with_member_records(mut self, records: &[MemberRecord]) -> Self {
        self.member_ids.clear();
        self.admin_ids.clear();
        self.pending_ids.clear();

        for record in records {
            if record.role == MemberRole::Pending {
                self.pending_ids.push(record.user_id.clone());
                continue;
            }
            self.member_ids.push(record.user_id.clone());
            if record.role.is_admin() {
                self.admin_ids.push(record.user_id.clone());
            }
        }
        self
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.member_ids.contains(user_id)
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admin_ids.contains(user_id)
    }

    pub fn is_pending(&self, user_id: &UserId) -> bool {
        self.pending_ids.contains(user_id)
    }

    pub fn is_owner(&self, user_id: &UserId) -> bool {
        &self.creator_id == user_id
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}
