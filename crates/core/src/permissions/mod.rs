//! Permission system for group operations
//!
//! The membership engine does not check who is calling. The layer that fronts it
//! (the store's access rules, or an API in front of the engine) uses this matrix
//! and turns a refusal into [`Error::Unauthorized`].

use crate::error::{Error, Result};
use crate::models::MemberRole;

/// Actions that can be performed in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    // Group management
    EditGroupSettings,
    RotateInviteCode,

    // Member management
    ApproveRequests,
    RemoveMembers,
    PromoteMembers,
    DemoteMembers,

    // Participation
    ShareAvailability,
    ProposePlans,
    Vote,
    Leave,
}

/// Permission matrix for group roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: MemberRole, action: GroupAction) -> bool {
        match action {
            // Admin tasks
            GroupAction::EditGroupSettings
            | GroupAction::RotateInviteCode
            | GroupAction::ApproveRequests
            | GroupAction::RemoveMembers
            | GroupAction::PromoteMembers
            | GroupAction::DemoteMembers => role.is_admin(),

            // Any full member
            GroupAction::ShareAvailability | GroupAction::ProposePlans | GroupAction::Vote => {
                role.is_member()
            }

            // The owner is the one member who cannot leave
            GroupAction::Leave => role.is_member() && role != MemberRole::Owner,
        }
    }

    /// `Ok` when `role` (None for non-members) may perform `action`, `Unauthorized` otherwise
    pub fn require(role: Option<MemberRole>, action: GroupAction) -> Result<()> {
        match role {
            Some(role) if Self::can_perform(role, action) => Ok(()),
            Some(role) => Err(Error::Unauthorized(format!(
                "{} may not perform {:?}",
                role.display_name(),
                action
            ))),
            None => Err(Error::Unauthorized(format!(
                "non-members may not perform {:?}",
                action
            ))),
        }
    }
}
