//! Plan and vote storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_vote_choice, OptionalExt};
use crate::error::Result;
use crate::models::{GroupId, Plan, PlanId, UserId, Vote};

const PLAN_COLUMNS: &str =
    "id, title, scheduled_at, location, notes, creator_id, created_at, group_id";

pub struct PlanStore<'a> {
    conn: &'a Connection,
}

fn plan_from_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: PlanId(row.get(0)?),
        title: row.get(1)?,
        scheduled_at: parse_datetime(&row.get::<_, String>(2)?)?,
        location: row.get(3)?,
        notes: row.get(4)?,
        creator_id: UserId(row.get(5)?),
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
        group_id: row.get::<_, Option<String>>(7)?.map(GroupId),
    })
}

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    Ok(Vote {
        plan_id: PlanId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        display_name: row.get(2)?,
        choice: parse_vote_choice(&row.get::<_, String>(3)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

impl<'a> PlanStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new plan
    #[instrument(skip(self, plan), fields(plan_id = %plan.id, title = %plan.title))]
    pub fn create(&self, plan: &Plan) -> Result<()> {
        self.conn.execute(
            "INSERT INTO plans (id, title, scheduled_at, location, notes, creator_id, created_at, group_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                plan.id.as_str(),
                plan.title,
                plan.scheduled_at.to_rfc3339(),
                plan.location,
                plan.notes,
                plan.creator_id.as_str(),
                plan.created_at.to_rfc3339(),
                plan.group_id.as_ref().map(|g| g.as_str()),
            ],
        )?;
        Ok(())
    }

    /// Find plan by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1"))?;
        let plan = stmt
            .query_row(params![id.as_str()], plan_from_row)
            .optional()?;
        Ok(plan)
    }

    /// Update the editable fields; returns false when the plan does not exist
    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    pub fn update(&self, plan: &Plan) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE plans SET title = ?1, scheduled_at = ?2, location = ?3, notes = ?4
             WHERE id = ?5",
            params![
                plan.title,
                plan.scheduled_at.to_rfc3339(),
                plan.location,
                plan.notes,
                plan.id.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// List a group's plans, soonest first
    #[instrument(skip(self))]
    pub fn list_for_group(&self, group_id: &GroupId) -> Result<Vec<Plan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE group_id = ?1 ORDER BY scheduled_at, id"
        ))?;

        let plans = stmt
            .query_map(params![group_id.as_str()], plan_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(plans)
    }

    /// Store a vote, replacing the user's previous vote on the plan
    #[instrument(skip(self, vote), fields(plan_id = %vote.plan_id, user_id = %vote.user_id, choice = %vote.choice))]
    pub fn upsert_vote(&self, vote: &Vote) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO votes (plan_id, user_id, display_name, choice, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                vote.plan_id.as_str(),
                vote.user_id.as_str(),
                vote.display_name,
                vote.choice.as_str(),
                vote.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List all votes on a plan
    #[instrument(skip(self))]
    pub fn list_votes(&self, plan_id: &PlanId) -> Result<Vec<Vote>> {
        let mut stmt = self.conn.prepare(
            "SELECT plan_id, user_id, display_name, choice, updated_at
             FROM votes WHERE plan_id = ?1 ORDER BY updated_at, user_id",
        )?;

        let votes = stmt
            .query_map(params![plan_id.as_str()], vote_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(votes)
    }
}
