//! Membership and role engine
//!
//! Applies the role state machine for each (group, user) pair:
//!
//! ```text
//! NonMember ──request──▶ Pending ──approve──▶ Member ◀──promote/demote──▶ Admin
//!     │                     │
//!     └──── join with code ─┴────────────────▶ Member
//! ```
//!
//! `Owner` is assigned at creation only. Role changes aimed at the owner are
//! ignored and removing the owner is rejected. Every other transition is
//! idempotent: applying it twice leaves the same state as applying it once.
//!
//! Whether the *caller* may perform an operation is decided outside this engine
//! (see [`crate::permissions`]).

use tracing::{debug, info, warn};

use crate::config::HuddleConfig;
use crate::error::{Error, Result};
use crate::invariants::{assert_group_invariants, assert_member_list_invariants};
use crate::models::{
    Group, GroupId, InviteCode, MemberRecord, MemberRole, UserId, INVITE_CODE_LENGTH,
};
use crate::storage::{AvailabilityRepository, GroupRepository};

/// Group admission and role transitions over a store handle
pub struct MembershipEngine<'a, S: ?Sized> {
    store: &'a S,
    invite_code_length: usize,
    invite_code_attempts: u32,
}

impl<'a, S> MembershipEngine<'a, S>
where
    S: GroupRepository + AvailabilityRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            invite_code_length: INVITE_CODE_LENGTH,
            invite_code_attempts: HuddleConfig::default().invite_code_attempts,
        }
    }

    /// Engine using the config's invite code settings; rejects an invalid config
    pub fn with_config(store: &'a S, config: &HuddleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            invite_code_length: config.invite_code_length,
            invite_code_attempts: config.invite_code_attempts,
        })
    }

    /// Create a group with `creator_id` as its owner; returns the new group's id
    pub fn create_group(
        &self,
        name: &str,
        creator_id: &UserId,
        creator_display_name: &str,
    ) -> Result<GroupId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("group name must not be empty".to_string()));
        }
        require_user_id(creator_id)?;

        let code = self.fresh_invite_code()?;
        let group = Group::new(name.to_string(), creator_id.clone(), code);
        let owner = MemberRecord::new(
            group.id.clone(),
            creator_id.clone(),
            creator_display_name,
            MemberRole::Owner,
        );
        assert_group_invariants(&group);

        self.store.create_group(&group, &owner)?;
        info!(group_id = %group.id, creator_id = %creator_id, "Group created");
        Ok(group.id)
    }

    /// Ask to join a group. Existing requests and memberships are left alone.
    pub fn request_to_join(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<()> {
        require_user_id(user_id)?;
        self.require_group(group_id)?;

        if let Some(existing) = self.store.get_member(group_id, user_id)? {
            debug!(group_id = %group_id, user_id = %user_id, role = %existing.role, "Join request ignored, record exists");
            return Ok(());
        }

        let record = MemberRecord::new(
            group_id.clone(),
            user_id.clone(),
            display_name,
            MemberRole::Pending,
        );
        if self.store.add_member(&record)? {
            info!(group_id = %group_id, user_id = %user_id, "Join requested");
        }
        Ok(())
    }

    /// Accept a pending request. Approving someone who is already a member is a no-op.
    pub fn approve_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<()> {
        self.require_group(group_id)?;

        match self.store.get_member(group_id, user_id)? {
            None => Err(not_member(group_id, user_id)),
            Some(record) if record.role.is_member() => Ok(()),
            Some(_) => {
                let name = crate::models::display_name_or_default(display_name);
                if self.store.approve_pending(group_id, user_id, &name)? {
                    info!(group_id = %group_id, user_id = %user_id, "Join request approved");
                    return Ok(());
                }
                // Resolved concurrently: fine if it ended as a member, not if it was denied
                self.require_membership(group_id, user_id)
            }
        }
    }

    /// Reject a pending request. Does nothing unless the user is still pending.
    pub fn deny_request(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        self.require_group(group_id)?;

        if self.store.remove_pending(group_id, user_id)? {
            info!(group_id = %group_id, user_id = %user_id, "Join request denied");
        }
        Ok(())
    }

    /// Join directly through an invite code; returns the joined group's id
    pub fn join_with_code(
        &self,
        code: &str,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<GroupId> {
        require_user_id(user_id)?;
        let code = InviteCode::normalize(code)
            .ok_or_else(|| Error::InvalidCode(code.trim().to_string()))?;
        let group = self
            .store
            .find_group_by_invite_code(&code)?
            .ok_or_else(|| Error::InvalidCode(code.to_string()))?;

        match self.store.get_member(&group.id, user_id)? {
            Some(record) if record.role.is_member() => {
                debug!(group_id = %group.id, user_id = %user_id, "Already a member");
            }
            Some(_) => {
                let name = crate::models::display_name_or_default(display_name);
                if self.store.approve_pending(&group.id, user_id, &name)? {
                    info!(group_id = %group.id, user_id = %user_id, "Pending request upgraded by invite code");
                } else {
                    self.require_membership(&group.id, user_id)?;
                }
            }
            None => {
                let record = MemberRecord::new(
                    group.id.clone(),
                    user_id.clone(),
                    display_name,
                    MemberRole::Member,
                );
                if self.store.add_member(&record)? {
                    info!(group_id = %group.id, user_id = %user_id, "Joined with invite code");
                } else if self.store.approve_pending(&group.id, user_id, &record.display_name)? {
                    // A request landed between the read and the insert
                    info!(group_id = %group.id, user_id = %user_id, "Pending request upgraded by invite code");
                } else {
                    self.require_membership(&group.id, user_id)?;
                }
            }
        }
        Ok(group.id)
    }

    /// Member → Admin
    pub fn promote(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        self.change_role(group_id, user_id, MemberRole::Admin)
    }

    /// Admin → Member
    pub fn demote(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        self.change_role(group_id, user_id, MemberRole::Member)
    }

    fn change_role(&self, group_id: &GroupId, user_id: &UserId, target: MemberRole) -> Result<()> {
        self.require_group(group_id)?;

        let record = self
            .store
            .get_member(group_id, user_id)?
            .ok_or_else(|| not_member(group_id, user_id))?;

        match record.role {
            MemberRole::Owner => {
                debug!(group_id = %group_id, user_id = %user_id, "Role change on owner ignored");
                Ok(())
            }
            MemberRole::Pending => Err(Error::NotMember(format!(
                "{} has a pending request in group {}",
                user_id, group_id
            ))),
            role if role == target => Ok(()),
            _ => {
                if !self.store.update_role(group_id, user_id, target)? {
                    return Err(not_member(group_id, user_id));
                }
                info!(group_id = %group_id, user_id = %user_id, role = %target, "Role changed");
                Ok(())
            }
        }
    }

    /// Remove a user from the group, whatever their role (except owner)
    pub fn remove(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        if self.delete_membership(group_id, user_id)? {
            info!(group_id = %group_id, user_id = %user_id, "Member removed");
        }
        Ok(())
    }

    /// Leave a group; the owner cannot leave
    pub fn leave(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        if self.delete_membership(group_id, user_id)? {
            info!(group_id = %group_id, user_id = %user_id, "Member left");
        }
        Ok(())
    }

    fn delete_membership(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        let group = self.require_group(group_id)?;
        if group.is_owner(user_id) {
            return Err(Error::CannotRemoveOwner(group_id.to_string()));
        }
        if let Some(record) = self.store.get_member(group_id, user_id)? {
            if record.role == MemberRole::Owner {
                return Err(Error::CannotRemoveOwner(group_id.to_string()));
            }
        }

        let removed = self.store.remove_member(group_id, user_id)?;

        // Cleanup is best-effort; the membership itself is already gone
        if let Err(e) = self.store.unlink_user_group(user_id, group_id) {
            warn!(group_id = %group_id, user_id = %user_id, error = %e, "Failed to unlink group from profile index");
        }
        if let Err(e) = self.store.delete_availability(group_id, user_id) {
            warn!(group_id = %group_id, user_id = %user_id, error = %e, "Failed to delete availability of removed member");
        }

        Ok(removed)
    }

    /// Replace the group's invite code; the previous code stops working immediately
    pub fn regenerate_invite_code(&self, group_id: &GroupId) -> Result<InviteCode> {
        let code = self.fresh_invite_code()?;
        if !self.store.set_invite_code(group_id, &code)? {
            return Err(Error::NotFound(format!("group {}", group_id)));
        }
        info!(group_id = %group_id, "Invite code regenerated");
        Ok(code)
    }

    /// Set or clear the group's theme key
    pub fn set_theme(&self, group_id: &GroupId, theme: Option<&str>) -> Result<()> {
        let theme = theme.map(str::trim).filter(|t| !t.is_empty());
        if !self.store.set_theme(group_id, theme)? {
            return Err(Error::NotFound(format!("group {}", group_id)));
        }
        Ok(())
    }

    /// Load a group
    pub fn group(&self, group_id: &GroupId) -> Result<Group> {
        self.require_group(group_id)
    }

    /// A group's member records in join order, pending requests included
    pub fn members(&self, group_id: &GroupId) -> Result<Vec<MemberRecord>> {
        let group = self.require_group(group_id)?;
        let members = self.store.list_members(group_id)?;
        assert_member_list_invariants(&members, &group);
        Ok(members)
    }

    /// Groups listed in the user's profile index
    pub fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<Group>> {
        let mut groups = Vec::new();
        for group_id in self.store.list_group_ids_for_user(user_id)? {
            match self.store.find_group_by_id(&group_id)? {
                Some(group) if group.is_member(user_id) => groups.push(group),
                _ => debug!(group_id = %group_id, user_id = %user_id, "Skipping stale profile index entry"),
            }
        }
        Ok(groups)
    }

    /// `Ok` only if the user currently holds a full membership
    fn require_membership(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        match self.store.get_member(group_id, user_id)? {
            Some(record) if record.role.is_member() => Ok(()),
            _ => Err(not_member(group_id, user_id)),
        }
    }

    fn require_group(&self, group_id: &GroupId) -> Result<Group> {
        let group = self
            .store
            .find_group_by_id(group_id)?
            .ok_or_else(|| Error::NotFound(format!("group {}", group_id)))?;
        assert_group_invariants(&group);
        Ok(group)
    }

    /// Draw a code no other group holds right now.
    ///
    /// The check and the later write are separate store calls, so two devices can
    /// still race to the same code. With 36^6 possible six-character codes the
    /// chance is small but not zero.
    fn fresh_invite_code(&self) -> Result<InviteCode> {
        let mut rng = rand::thread_rng();
        for attempt in 1..=self.invite_code_attempts {
            let code = InviteCode::generate(&mut rng, self.invite_code_length);
            if self.store.find_group_by_invite_code(&code)?.is_none() {
                return Ok(code);
            }
            debug!(attempt, "Invite code already taken, drawing again");
        }

        warn!(
            attempts = self.invite_code_attempts,
            "No free invite code found, using an unchecked draw"
        );
        Ok(InviteCode::generate(&mut rng, self.invite_code_length))
    }
}

fn require_user_id(user_id: &UserId) -> Result<()> {
    if user_id.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("user id must not be empty".to_string()));
    }
    Ok(())
}

fn not_member(group_id: &GroupId, user_id: &UserId) -> Error {
    Error::NotMember(format!("{} in group {}", user_id, group_id))
}

#[cfg(test)]
mod tests;
