use super::*;
use crate::error::ErrorKind;
use crate::models::AvailabilityRecord;
use crate::storage::Database;

fn alice() -> UserId {
    UserId::from("alice")
}

fn bob() -> UserId {
    UserId::from("bob")
}

fn setup() -> (Database, GroupId) {
    let db = Database::open_in_memory().unwrap();
    let group_id = MembershipEngine::new(&db)
        .create_group("  Weekend Crew ", &alice(), "Alice")
        .unwrap();
    (db, group_id)
}

#[test]
fn test_create_group_makes_creator_owner() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    let group = engine.group(&group_id).unwrap();
    assert_eq!(group.name, "Weekend Crew");
    assert_eq!(group.member_ids, vec![alice()]);
    assert_eq!(group.admin_ids, vec![alice()]);
    assert!(group.pending_ids.is_empty());
    assert_eq!(group.invite_code.unwrap().as_str().len(), 6);

    let record = db.get_member(&group_id, &alice()).unwrap().unwrap();
    assert_eq!(record.role, MemberRole::Owner);
    assert_eq!(record.display_name, "Alice");
}

#[test]
fn test_create_group_rejects_blank_name() {
    let db = Database::open_in_memory().unwrap();
    let err = MembershipEngine::new(&db)
        .create_group("   ", &alice(), "Alice")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_owner_stays_admin_through_role_changes() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.demote(&group_id, &alice()).unwrap();
    engine.promote(&group_id, &alice()).unwrap();
    engine.demote(&group_id, &alice()).unwrap();

    let group = engine.group(&group_id).unwrap();
    assert!(group.is_admin(&alice()));
    let record = db.get_member(&group_id, &alice()).unwrap().unwrap();
    assert_eq!(record.role, MemberRole::Owner);
}

#[test]
fn test_owner_cannot_be_removed_or_leave() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    let err = engine.remove(&group_id, &alice()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotRemoveOwner);
    let err = engine.leave(&group_id, &alice()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotRemoveOwner);

    assert!(engine.group(&group_id).unwrap().is_member(&alice()));
}

#[test]
fn test_request_to_join_is_idempotent() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();

    let group = engine.group(&group_id).unwrap();
    assert_eq!(group.pending_ids, vec![bob()]);
    assert!(!group.is_member(&bob()));
    assert_eq!(engine.members(&group_id).unwrap().len(), 2);
}

#[test]
fn test_request_to_join_unknown_group() {
    let db = Database::open_in_memory().unwrap();
    let err = MembershipEngine::new(&db)
        .request_to_join(&GroupId::from("missing"), &bob(), "Bob")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_request_by_member_is_noop() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.request_to_join(&group_id, &alice(), "Alice").unwrap();
    let group = engine.group(&group_id).unwrap();
    assert!(group.pending_ids.is_empty());
    assert!(group.is_admin(&alice()));
}

#[test]
fn test_approve_moves_pending_to_member() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    engine.approve_request(&group_id, &bob(), "Bobby").unwrap();

    let group = engine.group(&group_id).unwrap();
    assert_eq!(group.member_ids, vec![alice(), bob()]);
    assert!(group.pending_ids.is_empty());
    assert_eq!(
        db.get_member(&group_id, &bob()).unwrap().unwrap().display_name,
        "Bobby"
    );

    // Linked into bob's profile index on approval
    let groups = engine.groups_for_user(&bob()).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, group_id);
}

#[test]
fn test_deny_after_approve_leaves_member_alone() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    engine.approve_request(&group_id, &bob(), "Bob").unwrap();
    engine.deny_request(&group_id, &bob()).unwrap();

    let group = engine.group(&group_id).unwrap();
    assert!(group.is_member(&bob()));
    assert!(!group.is_pending(&bob()));
}

#[test]
fn test_deny_removes_request_and_record() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    engine.deny_request(&group_id, &bob()).unwrap();
    engine.deny_request(&group_id, &bob()).unwrap();

    let group = engine.group(&group_id).unwrap();
    assert!(!group.is_member(&bob()));
    assert!(!group.is_pending(&bob()));
    assert!(db.get_member(&group_id, &bob()).unwrap().is_none());

    // A denied request cannot be approved afterwards
    let err = engine.approve_request(&group_id, &bob(), "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotMember);
}

#[test]
fn test_approve_is_idempotent() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    engine.approve_request(&group_id, &bob(), "Bob").unwrap();
    engine.approve_request(&group_id, &bob(), "Bob").unwrap();

    let group = engine.group(&group_id).unwrap();
    assert_eq!(group.member_ids, vec![alice(), bob()]);
}

#[test]
fn test_join_with_code_is_case_insensitive() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);
    let code = engine.group(&group_id).unwrap().invite_code.unwrap();

    let typed = format!("  {}  ", code.as_str().to_lowercase());
    let joined = engine.join_with_code(&typed, &bob(), "Bob").unwrap();
    assert_eq!(joined, group_id);

    let record = db.get_member(&group_id, &bob()).unwrap().unwrap();
    assert_eq!(record.role, MemberRole::Member);

    // Joining again changes nothing
    engine.join_with_code(code.as_str(), &bob(), "Bob").unwrap();
    assert_eq!(engine.group(&group_id).unwrap().member_count(), 2);
}

#[test]
fn test_join_with_code_upgrades_pending() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);
    let code = engine.group(&group_id).unwrap().invite_code.unwrap();

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    engine.join_with_code(code.as_str(), &bob(), "Bob").unwrap();

    let group = engine.group(&group_id).unwrap();
    assert!(group.is_member(&bob()));
    assert!(!group.is_pending(&bob()));
}

#[test]
fn test_join_with_unknown_code() {
    let (db, _group_id) = setup();
    let engine = MembershipEngine::new(&db);

    // Seven characters never match a six-character code
    let err = engine.join_with_code("NOPE123", &bob(), "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCode);

    let err = engine.join_with_code("  ", &bob(), "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCode);
}

#[test]
fn test_regenerated_code_invalidates_old() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);
    let old = engine.group(&group_id).unwrap().invite_code.unwrap();

    let mut new = engine.regenerate_invite_code(&group_id).unwrap();
    while new == old {
        new = engine.regenerate_invite_code(&group_id).unwrap();
    }

    let err = engine.join_with_code(old.as_str(), &bob(), "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCode);

    engine.join_with_code(new.as_str(), &bob(), "Bob").unwrap();
    assert!(engine.group(&group_id).unwrap().is_member(&bob()));
}

#[test]
fn test_regenerate_unknown_group() {
    let db = Database::open_in_memory().unwrap();
    let err = MembershipEngine::new(&db)
        .regenerate_invite_code(&GroupId::from("missing"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_configured_code_length() {
    let db = Database::open_in_memory().unwrap();
    let config = HuddleConfig {
        invite_code_length: 8,
        ..HuddleConfig::default()
    };
    let engine = MembershipEngine::with_config(&db, &config).unwrap();
    let group_id = engine.create_group("Crew", &alice(), "Alice").unwrap();

    let code = engine.group(&group_id).unwrap().invite_code.unwrap();
    assert_eq!(code.as_str().len(), 8);
}

#[test]
fn test_with_config_rejects_invalid_code_length() {
    let db = Database::open_in_memory().unwrap();
    let config = HuddleConfig {
        invite_code_length: 0,
        ..HuddleConfig::default()
    };
    let err = MembershipEngine::with_config(&db, &config).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_promote_and_demote() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);
    let code = engine.group(&group_id).unwrap().invite_code.unwrap();
    engine.join_with_code(code.as_str(), &bob(), "Bob").unwrap();

    engine.promote(&group_id, &bob()).unwrap();
    engine.promote(&group_id, &bob()).unwrap();
    assert_eq!(engine.group(&group_id).unwrap().admin_ids, vec![alice(), bob()]);

    engine.demote(&group_id, &bob()).unwrap();
    engine.demote(&group_id, &bob()).unwrap();
    let group = engine.group(&group_id).unwrap();
    assert_eq!(group.admin_ids, vec![alice()]);
    assert!(group.is_member(&bob()));
}

#[test]
fn test_role_change_on_non_member() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    let err = engine.promote(&group_id, &bob()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotMember);

    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();
    let err = engine.promote(&group_id, &bob()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotMember);
}

#[test]
fn test_remove_admin_clears_everything() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);
    let code = engine.group(&group_id).unwrap().invite_code.unwrap();
    engine.join_with_code(code.as_str(), &bob(), "Bob").unwrap();
    engine.promote(&group_id, &bob()).unwrap();

    engine.remove(&group_id, &bob()).unwrap();
    engine.remove(&group_id, &bob()).unwrap();

    let group = engine.group(&group_id).unwrap();
    assert!(!group.is_member(&bob()));
    assert!(!group.is_admin(&bob()));
    assert!(db.get_member(&group_id, &bob()).unwrap().is_none());
    assert!(engine.groups_for_user(&bob()).unwrap().is_empty());
}

#[test]
fn test_leave_group() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);
    let code = engine.group(&group_id).unwrap().invite_code.unwrap();
    engine.join_with_code(code.as_str(), &bob(), "Bob").unwrap();

    engine.leave(&group_id, &bob()).unwrap();
    assert!(!engine.group(&group_id).unwrap().is_member(&bob()));
}

#[test]
fn test_set_theme() {
    let (db, group_id) = setup();
    let engine = MembershipEngine::new(&db);

    engine.set_theme(&group_id, Some(" sunset ")).unwrap();
    assert_eq!(engine.group(&group_id).unwrap().theme.as_deref(), Some("sunset"));

    engine.set_theme(&group_id, Some("")).unwrap();
    assert!(engine.group(&group_id).unwrap().theme.is_none());

    let err = engine.set_theme(&GroupId::from("missing"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_groups_for_user_lists_all_memberships() {
    let db = Database::open_in_memory().unwrap();
    let engine = MembershipEngine::new(&db);

    let first = engine.create_group("First", &alice(), "Alice").unwrap();
    let second = engine.create_group("Second", &bob(), "Bob").unwrap();
    let code = engine.group(&second).unwrap().invite_code.unwrap();
    engine.join_with_code(code.as_str(), &alice(), "Alice").unwrap();

    let ids: Vec<GroupId> = engine
        .groups_for_user(&alice())
        .unwrap()
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(ids, vec![first, second]);
}

/// Store whose approvals lose to a concurrent denial
struct DenyingStore {
    db: Database,
}

impl GroupRepository for DenyingStore {
    fn create_group(&self, group: &Group, owner: &MemberRecord) -> Result<()> {
        self.db.create_group(group, owner)
    }

    fn find_group_by_id(&self, id: &GroupId) -> Result<Option<Group>> {
        self.db.find_group_by_id(id)
    }

    fn find_group_by_invite_code(&self, code: &InviteCode) -> Result<Option<Group>> {
        self.db.find_group_by_invite_code(code)
    }

    fn set_invite_code(&self, group_id: &GroupId, code: &InviteCode) -> Result<bool> {
        self.db.set_invite_code(group_id, code)
    }

    fn set_theme(&self, group_id: &GroupId, theme: Option<&str>) -> Result<bool> {
        self.db.set_theme(group_id, theme)
    }

    fn get_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<Option<MemberRecord>> {
        self.db.get_member(group_id, user_id)
    }

    fn add_member(&self, record: &MemberRecord) -> Result<bool> {
        self.db.add_member(record)
    }

    fn approve_pending(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<bool> {
        self.db.remove_pending(group_id, user_id)?;
        self.db.approve_pending(group_id, user_id, display_name)
    }

    fn update_role(&self, group_id: &GroupId, user_id: &UserId, role: MemberRole) -> Result<bool> {
        self.db.update_role(group_id, user_id, role)
    }

    fn remove_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        self.db.remove_member(group_id, user_id)
    }

    fn remove_pending(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        self.db.remove_pending(group_id, user_id)
    }

    fn list_members(&self, group_id: &GroupId) -> Result<Vec<MemberRecord>> {
        self.db.list_members(group_id)
    }

    fn unlink_user_group(&self, user_id: &UserId, group_id: &GroupId) -> Result<()> {
        self.db.unlink_user_group(user_id, group_id)
    }

    fn list_group_ids_for_user(&self, user_id: &UserId) -> Result<Vec<GroupId>> {
        self.db.list_group_ids_for_user(user_id)
    }
}

impl AvailabilityRepository for DenyingStore {
    fn replace_availability(&self, record: &AvailabilityRecord) -> Result<()> {
        self.db.replace_availability(record)
    }

    fn get_availability(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<AvailabilityRecord>> {
        self.db.get_availability(group_id, user_id)
    }

    fn list_availability(&self, group_id: &GroupId) -> Result<Vec<AvailabilityRecord>> {
        self.db.list_availability(group_id)
    }

    fn delete_availability(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        self.db.delete_availability(group_id, user_id)
    }
}

#[test]
fn test_code_join_after_concurrent_denial_is_not_member() {
    let store = DenyingStore {
        db: Database::open_in_memory().unwrap(),
    };
    let engine = MembershipEngine::new(&store);
    let group_id = engine.create_group("Crew", &alice(), "Alice").unwrap();
    let code = engine.group(&group_id).unwrap().invite_code.unwrap();
    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();

    let err = engine.join_with_code(code.as_str(), &bob(), "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotMember);

    let group = engine.group(&group_id).unwrap();
    assert!(!group.is_member(&bob()));
    assert!(!group.is_pending(&bob()));
}

#[test]
fn test_approve_after_concurrent_denial_is_not_member() {
    let store = DenyingStore {
        db: Database::open_in_memory().unwrap(),
    };
    let engine = MembershipEngine::new(&store);
    let group_id = engine.create_group("Crew", &alice(), "Alice").unwrap();
    engine.request_to_join(&group_id, &bob(), "Bob").unwrap();

    let err = engine.approve_request(&group_id, &bob(), "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotMember);
}
