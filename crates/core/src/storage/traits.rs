//! Storage repository traits
//!
//! These traits are the contract the core consumes from its document store:
//! keyed records per group and plan, and full-snapshot live queries. `Database`
//! implements them on SQLite; other backends only need to honor the same contract.

use crate::error::Result;
use crate::models::{
    AvailabilityRecord, Group, GroupId, InviteCode, MemberRecord, MemberRole, Plan, PlanId,
    UserId, Vote,
};

use super::Subscription;

/// Group and membership operations
pub trait GroupRepository {
    /// Create a group with its owner record, atomically
    fn create_group(&self, group: &Group, owner: &MemberRecord) -> Result<()>;

    /// Find group by ID
    fn find_group_by_id(&self, id: &GroupId) -> Result<Option<Group>>;

    /// Find the group currently holding an invite code
    fn find_group_by_invite_code(&self, code: &InviteCode) -> Result<Option<Group>>;

    /// Overwrite a group's invite code; false when the group does not exist
    fn set_invite_code(&self, group_id: &GroupId, code: &InviteCode) -> Result<bool>;

    /// Set or clear a group's theme key; false when the group does not exist
    fn set_theme(&self, group_id: &GroupId, theme: Option<&str>) -> Result<bool>;

    /// Get a member record
    fn get_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<Option<MemberRecord>>;

    /// Insert a member record if absent; true when inserted
    fn add_member(&self, record: &MemberRecord) -> Result<bool>;

    /// Pending → Member as one atomic update; true when a pending record changed
    fn approve_pending(&self, group_id: &GroupId, user_id: &UserId, display_name: &str)
        -> Result<bool>;

    /// Update a member's role; false when there is no record
    fn update_role(&self, group_id: &GroupId, user_id: &UserId, role: MemberRole) -> Result<bool>;

    /// Delete a member record of any role; true when one was deleted
    fn remove_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool>;

    /// Delete a member record only if still pending; true when one was deleted
    fn remove_pending(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool>;

    /// A group's member records in join order, pending included
    fn list_members(&self, group_id: &GroupId) -> Result<Vec<MemberRecord>>;

    /// Drop a group from a user's profile index
    fn unlink_user_group(&self, user_id: &UserId, group_id: &GroupId) -> Result<()>;

    /// Group ids in a user's profile index
    fn list_group_ids_for_user(&self, user_id: &UserId) -> Result<Vec<GroupId>>;
}

/// Availability operations
pub trait AvailabilityRepository {
    /// Store a record, fully replacing the previous one
    fn replace_availability(&self, record: &AvailabilityRecord) -> Result<()>;

    /// Get one member's record
    fn get_availability(&self, group_id: &GroupId, user_id: &UserId)
        -> Result<Option<AvailabilityRecord>>;

    /// Every record in a group
    fn list_availability(&self, group_id: &GroupId) -> Result<Vec<AvailabilityRecord>>;

    /// Delete one member's record
    fn delete_availability(&self, group_id: &GroupId, user_id: &UserId) -> Result<()>;
}

/// Plan and vote operations
pub trait PlanRepository {
    /// Create a new plan
    fn create_plan(&self, plan: &Plan) -> Result<()>;

    /// Find plan by ID
    fn find_plan_by_id(&self, id: &PlanId) -> Result<Option<Plan>>;

    /// Update a plan's editable fields; false when the plan does not exist
    fn update_plan(&self, plan: &Plan) -> Result<bool>;

    /// A group's plans, soonest first
    fn list_plans_for_group(&self, group_id: &GroupId) -> Result<Vec<Plan>>;

    /// Store a vote, replacing the user's previous one
    fn set_vote(&self, vote: &Vote) -> Result<()>;

    /// All votes on a plan
    fn list_votes(&self, plan_id: &PlanId) -> Result<Vec<Vote>>;
}

/// Live queries: the listener gets the full snapshot once on registration and
/// again after every write to the same collection, until the returned
/// [`Subscription`] is cancelled or dropped.
pub trait LiveQueries {
    fn watch_members<F>(&self, group_id: &GroupId, listener: F) -> Result<Subscription>
    where
        F: Fn(&[MemberRecord]) + Send + Sync + 'static;

    fn watch_availability<F>(&self, group_id: &GroupId, listener: F) -> Result<Subscription>
    where
        F: Fn(&[AvailabilityRecord]) + Send + Sync + 'static;

    fn watch_votes<F>(&self, plan_id: &PlanId, listener: F) -> Result<Subscription>
    where
        F: Fn(&[Vote]) + Send + Sync + 'static;
}

/// Combined storage interface
pub trait Storage: GroupRepository + AvailabilityRepository + PlanRepository + LiveQueries {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: GroupRepository + AvailabilityRepository + PlanRepository + LiveQueries
{
}
