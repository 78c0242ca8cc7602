//! SQLite storage layer for Huddle

mod availability;
mod groups;
mod listeners;
mod migrations;
mod parse;
mod plans;
mod traits;

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{instrument, warn};

use crate::config::HuddleConfig;
use crate::error::Result;
use crate::models::{
    AvailabilityRecord, Group, GroupId, InviteCode, MemberRecord, MemberRole, Plan, PlanId,
    UserId, Vote,
};

pub use availability::AvailabilityStore;
pub use groups::GroupStore;
pub use listeners::Subscription;
pub use plans::PlanStore;
pub use traits::{AvailabilityRepository, GroupRepository, LiveQueries, PlanRepository, Storage};

use listeners::{Listener, ListenerRegistry};

/// Main database handle
pub struct Database {
    conn: Connection,
    member_listeners: ListenerRegistry<GroupId, MemberRecord>,
    availability_listeners: ListenerRegistry<GroupId, AvailabilityRecord>,
    vote_listeners: ListenerRegistry<PlanId, Vote>,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open the database named by the config, creating its directory if needed
    pub fn open_with_config(config: &HuddleConfig) -> Result<Self> {
        let path = config.resolve_database_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn,
            member_listeners: ListenerRegistry::new(),
            availability_listeners: ListenerRegistry::new(),
            vote_listeners: ListenerRegistry::new(),
        })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get group store
    pub fn groups(&self) -> GroupStore<'_> {
        GroupStore::new(&self.conn)
    }

    /// Get availability store
    pub fn availability(&self) -> AvailabilityStore<'_> {
        AvailabilityStore::new(&self.conn)
    }

    /// Get plan store
    pub fn plans(&self) -> PlanStore<'_> {
        PlanStore::new(&self.conn)
    }

    // Snapshot publication. A write has already committed by the time these run,
    // so a failed snapshot read is logged rather than reported to the writer.

    fn publish_members(&self, group_id: &GroupId) {
        if !self.member_listeners.has_listeners(group_id) {
            return;
        }
        match self.groups().list_members(group_id) {
            Ok(snapshot) => self.member_listeners.notify(group_id, &snapshot),
            Err(e) => warn!(group_id = %group_id, error = %e, "Failed to load member snapshot"),
        }
    }

    fn publish_availability(&self, group_id: &GroupId) {
        if !self.availability_listeners.has_listeners(group_id) {
            return;
        }
        match self.availability().list_for_group(group_id) {
            Ok(snapshot) => self.availability_listeners.notify(group_id, &snapshot),
            Err(e) => {
                warn!(group_id = %group_id, error = %e, "Failed to load availability snapshot")
            }
        }
    }

    fn publish_votes(&self, plan_id: &PlanId) {
        if !self.vote_listeners.has_listeners(plan_id) {
            return;
        }
        match self.plans().list_votes(plan_id) {
            Ok(snapshot) => self.vote_listeners.notify(plan_id, &snapshot),
            Err(e) => warn!(plan_id = %plan_id, error = %e, "Failed to load vote snapshot"),
        }
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl GroupRepository for Database {
    fn create_group(&self, group: &Group, owner: &MemberRecord) -> Result<()> {
        self.groups().create(group, owner)?;
        self.publish_members(&group.id);
        Ok(())
    }

    fn find_group_by_id(&self, id: &GroupId) -> Result<Option<Group>> {
        self.groups().find_by_id(id)
    }

    fn find_group_by_invite_code(&self, code: &InviteCode) -> Result<Option<Group>> {
        self.groups().find_by_invite_code(code)
    }

    fn set_invite_code(&self, group_id: &GroupId, code: &InviteCode) -> Result<bool> {
        self.groups().set_invite_code(group_id, code)
    }

    fn set_theme(&self, group_id: &GroupId, theme: Option<&str>) -> Result<bool> {
        self.groups().set_theme(group_id, theme)
    }

    fn get_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<Option<MemberRecord>> {
        self.groups().get_member(group_id, user_id)
    }

    fn add_member(&self, record: &MemberRecord) -> Result<bool> {
        let inserted = self.groups().add_member(record)?;
        if inserted {
            self.publish_members(&record.group_id);
        }
        Ok(inserted)
    }

    fn approve_pending(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<bool> {
        let changed = self.groups().approve_pending(group_id, user_id, display_name)?;
        if changed {
            self.publish_members(group_id);
        }
        Ok(changed)
    }

    fn update_role(&self, group_id: &GroupId, user_id: &UserId, role: MemberRole) -> Result<bool> {
        let changed = self.groups().update_role(group_id, user_id, role)?;
        if changed {
            self.publish_members(group_id);
        }
        Ok(changed)
    }

    fn remove_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        let removed = self.groups().remove_member(group_id, user_id)?;
        if removed {
            self.publish_members(group_id);
        }
        Ok(removed)
    }

    fn remove_pending(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool> {
        let removed = self.groups().remove_pending(group_id, user_id)?;
        if removed {
            self.publish_members(group_id);
        }
        Ok(removed)
    }

    fn list_members(&self, group_id: &GroupId) -> Result<Vec<MemberRecord>> {
        self.groups().list_members(group_id)
    }

    fn unlink_user_group(&self, user_id: &UserId, group_id: &GroupId) -> Result<()> {
        self.groups().unlink_user(user_id, group_id)
    }

    fn list_group_ids_for_user(&self, user_id: &UserId) -> Result<Vec<GroupId>> {
        self.groups().list_group_ids_for_user(user_id)
    }
}

impl AvailabilityRepository for Database {
    fn replace_availability(&self, record: &AvailabilityRecord) -> Result<()> {
        self.availability().replace(record)?;
        self.publish_availability(&record.group_id);
        Ok(())
    }

    fn get_availability(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<AvailabilityRecord>> {
        self.availability().get(group_id, user_id)
    }

    fn list_availability(&self, group_id: &GroupId) -> Result<Vec<AvailabilityRecord>> {
        self.availability().list_for_group(group_id)
    }

    fn delete_availability(&self, group_id: &GroupId, user_id: &UserId) -> Result<()> {
        self.availability().delete(group_id, user_id)?;
        self.publish_availability(group_id);
        Ok(())
    }
}

impl PlanRepository for Database {
    fn create_plan(&self, plan: &Plan) -> Result<()> {
        self.plans().create(plan)
    }

    fn find_plan_by_id(&self, id: &PlanId) -> Result<Option<Plan>> {
        self.plans().find_by_id(id)
    }

    fn update_plan(&self, plan: &Plan) -> Result<bool> {
        self.plans().update(plan)
    }

    fn list_plans_for_group(&self, group_id: &GroupId) -> Result<Vec<Plan>> {
        self.plans().list_for_group(group_id)
    }

    fn set_vote(&self, vote: &Vote) -> Result<()> {
        self.plans().upsert_vote(vote)?;
        self.publish_votes(&vote.plan_id);
        Ok(())
    }

    fn list_votes(&self, plan_id: &PlanId) -> Result<Vec<Vote>> {
        self.plans().list_votes(plan_id)
    }
}

impl LiveQueries for Database {
    fn watch_members<F>(&self, group_id: &GroupId, listener: F) -> Result<Subscription>
    where
        F: Fn(&[MemberRecord]) + Send + Sync + 'static,
    {
        let snapshot = self.groups().list_members(group_id)?;
        let listener: Listener<MemberRecord> = Arc::new(listener);
        listener(&snapshot);
        Ok(self.member_listeners.register(group_id.clone(), listener))
    }

    fn watch_availability<F>(&self, group_id: &GroupId, listener: F) -> Result<Subscription>
    where
        F: Fn(&[AvailabilityRecord]) + Send + Sync + 'static,
    {
        let snapshot = self.availability().list_for_group(group_id)?;
        let listener: Listener<AvailabilityRecord> = Arc::new(listener);
        listener(&snapshot);
        Ok(self.availability_listeners.register(group_id.clone(), listener))
    }

    fn watch_votes<F>(&self, plan_id: &PlanId, listener: F) -> Result<Subscription>
    where
        F: Fn(&[Vote]) + Send + Sync + 'static,
    {
        let snapshot = self.plans().list_votes(plan_id)?;
        let listener: Listener<Vote> = Arc::new(listener);
        listener(&snapshot);
        Ok(self.vote_listeners.register(plan_id.clone(), listener))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::models::VoteChoice;

    fn seed_group(db: &Database) -> Group {
        let code = InviteCode::normalize("HIKE42").unwrap();
        let group = Group::new("Hikers".into(), UserId::from("alice"), code);
        let owner = MemberRecord::new(
            group.id.clone(),
            group.creator_id.clone(),
            "Alice",
            MemberRole::Owner,
        );
        db.create_group(&group, &owner).unwrap();
        group
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huddle.db");

        let db = Database::open(&path).unwrap();
        let group = seed_group(&db);
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert!(reopened.find_group_by_id(&group.id).unwrap().is_some());
        assert_eq!(reopened.schema_version(), 2);
    }

    #[test]
    fn test_watch_members_delivers_snapshots() {
        let db = Database::open_in_memory().unwrap();
        let group = seed_group(&db);

        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_in = Arc::clone(&seen);
        let sub = db
            .watch_members(&group.id, move |members| {
                seen_in.lock().unwrap().push(members.len());
            })
            .unwrap();

        let bob = MemberRecord::new(group.id.clone(), UserId::from("bob"), "Bob", MemberRole::Pending);
        db.add_member(&bob).unwrap();
        db.approve_pending(&group.id, &UserId::from("bob"), "Bob").unwrap();

        sub.cancel();
        db.remove_member(&group.id, &UserId::from("bob")).unwrap();

        // initial snapshot, insert, approval; nothing after cancel
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2]);
    }

    #[test]
    fn test_noop_writes_do_not_notify() {
        let db = Database::open_in_memory().unwrap();
        let group = seed_group(&db);

        let calls = Arc::new(Mutex::new(0));
        let calls_in = Arc::clone(&calls);
        let _sub = db
            .watch_members(&group.id, move |_| *calls_in.lock().unwrap() += 1)
            .unwrap();

        db.remove_pending(&group.id, &UserId::from("nobody")).unwrap();
        db.update_role(&group.id, &UserId::from("nobody"), MemberRole::Admin)
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_watch_votes_sees_replacement() {
        let db = Database::open_in_memory().unwrap();
        let plan_id = PlanId::from("p1");
        let plan = Plan {
            id: plan_id.clone(),
            title: "Dinner".into(),
            scheduled_at: chrono::Utc::now(),
            location: String::new(),
            notes: String::new(),
            creator_id: UserId::from("alice"),
            created_at: chrono::Utc::now(),
            group_id: None,
        };
        db.create_plan(&plan).unwrap();

        let latest: Arc<Mutex<Vec<Vote>>> = Arc::new(Mutex::new(Vec::new()));
        let latest_in = Arc::clone(&latest);
        let _sub = db
            .watch_votes(&plan_id, move |votes| {
                *latest_in.lock().unwrap() = votes.to_vec();
            })
            .unwrap();

        db.set_vote(&Vote::new(plan_id.clone(), UserId::from("a"), "A", VoteChoice::Yes))
            .unwrap();
        db.set_vote(&Vote::new(plan_id.clone(), UserId::from("a"), "A", VoteChoice::No))
            .unwrap();

        let latest = latest.lock().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].choice, VoteChoice::No);
    }
}
