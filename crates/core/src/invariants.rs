//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{Group, MemberRecord, MemberRole};

/// Validate that a Group's membership lists are internally consistent
pub fn assert_group_invariants(group: &Group) {
    debug_assert!(
        !group.name.trim().is_empty(),
        "Group {} has empty name",
        group.id
    );

    debug_assert!(
        group.is_member(&group.creator_id) && group.is_admin(&group.creator_id),
        "Group {} creator {} is not an admin member",
        group.id,
        group.creator_id
    );

    for admin in &group.admin_ids {
        debug_assert!(
            group.is_member(admin),
            "Group {} admin {} is not in the member list",
            group.id,
            admin
        );
    }

    for pending in &group.pending_ids {
        debug_assert!(
            !group.is_member(pending),
            "Group {} user {} is both pending and a member",
            group.id,
            pending
        );
    }
}

/// Validate that exactly one owner exists and that it is the creator
pub fn assert_member_list_invariants(members: &[MemberRecord], group: &Group) {
    let owners: Vec<&MemberRecord> = members
        .iter()
        .filter(|m| m.role == MemberRole::Owner)
        .collect();

    debug_assert!(
        owners.len() == 1,
        "Group {} has {} owners, expected 1",
        group.id,
        owners.len()
    );

    debug_assert!(
        owners.iter().all(|m| m.user_id == group.creator_id),
        "Group {} owner record does not belong to creator {}",
        group.id,
        group.creator_id
    );
}
