//! Member records and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{default_display_name, GroupId, UserId};

/// Group roles in privilege order (lowest to highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MemberRole {
    /// Asked to join, awaiting an admin decision
    Pending = 0,
    Member = 1,
    Admin = 2,
    /// Group creator; a permanent admin
    Owner = 3,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Pending => "pending",
            MemberRole::Member => "member",
            MemberRole::Admin => "admin",
            MemberRole::Owner => "owner",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MemberRole::Pending => "Pending",
            MemberRole::Member => "Member",
            MemberRole::Admin => "Admin",
            MemberRole::Owner => "Owner",
        }
    }

    /// Counts toward the group's member list (everything but pending)
    pub fn is_member(&self) -> bool {
        *self >= MemberRole::Member
    }

    /// Has admin privileges
    pub fn is_admin(&self) -> bool {
        *self >= MemberRole::Admin
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A user's record within one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub group_id: GroupId,
    pub user_id: UserId,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub role: MemberRole,
}

impl MemberRecord {
    pub fn new(group_id: GroupId, user_id: UserId, display_name: &str, role: MemberRole) -> Self {
        Self {
            group_id,
            user_id,
            display_name: super::display_name_or_default(display_name),
            joined_at: Utc::now(),
            role,
        }
    }
}
