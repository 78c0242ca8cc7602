//! Plans and yes/maybe/no voting

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{GroupId, NewPlan, Plan, PlanId, UserId, Vote, VoteChoice};
use crate::storage::PlanRepository;

/// Vote counts for one plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: usize,
    pub maybe: usize,
    pub no: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.yes + self.maybe + self.no
    }
}

/// Partition a vote snapshot by choice
pub fn tally(votes: &[Vote]) -> Tally {
    votes.iter().fold(Tally::default(), |mut tally, vote| {
        match vote.choice {
            VoteChoice::Yes => tally.yes += 1,
            VoteChoice::Maybe => tally.maybe += 1,
            VoteChoice::No => tally.no += 1,
        }
        tally
    })
}

/// The user's current vote in a snapshot, if any
pub fn my_vote(votes: &[Vote], user_id: &UserId) -> Option<VoteChoice> {
    votes
        .iter()
        .find(|vote| &vote.user_id == user_id)
        .map(|vote| vote.choice)
}

/// Plan proposals and votes over a store handle
pub struct PlanService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: PlanRepository + ?Sized> PlanService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Propose a plan; returns its id
    pub fn create_plan(&self, new_plan: NewPlan) -> Result<PlanId> {
        let mut new_plan = new_plan;
        new_plan.title = new_plan.title.trim().to_string();
        if new_plan.title.is_empty() {
            return Err(Error::InvalidInput("plan title must not be empty".to_string()));
        }

        let plan = Plan::new(new_plan);
        self.store.create_plan(&plan)?;
        info!(plan_id = %plan.id, creator_id = %plan.creator_id, "Plan created");
        Ok(plan.id)
    }

    pub fn plan(&self, plan_id: &PlanId) -> Result<Plan> {
        self.store
            .find_plan_by_id(plan_id)?
            .ok_or_else(|| Error::NotFound(format!("plan {}", plan_id)))
    }

    /// Save edits to title, time, location and notes
    pub fn update_plan(&self, plan: &Plan) -> Result<()> {
        let mut plan = plan.clone();
        plan.title = plan.title.trim().to_string();
        if plan.title.is_empty() {
            return Err(Error::InvalidInput("plan title must not be empty".to_string()));
        }
        if !self.store.update_plan(&plan)? {
            return Err(Error::NotFound(format!("plan {}", plan.id)));
        }
        info!(plan_id = %plan.id, "Plan updated");
        Ok(())
    }

    /// A group's plans by scheduled time
    pub fn plans_for_group(&self, group_id: &GroupId) -> Result<Vec<Plan>> {
        self.store.list_plans_for_group(group_id)
    }

    /// Record the user's vote, replacing any earlier one
    pub fn set_vote(
        &self,
        plan_id: &PlanId,
        user_id: &UserId,
        display_name: &str,
        choice: VoteChoice,
    ) -> Result<()> {
        if user_id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        self.plan(plan_id)?;

        let vote = Vote::new(plan_id.clone(), user_id.clone(), display_name, choice);
        self.store.set_vote(&vote)?;
        info!(plan_id = %plan_id, user_id = %user_id, choice = %choice, "Vote recorded");
        Ok(())
    }

    pub fn votes(&self, plan_id: &PlanId) -> Result<Vec<Vote>> {
        self.store.list_votes(plan_id)
    }

    pub fn plan_tally(&self, plan_id: &PlanId) -> Result<Tally> {
        Ok(tally(&self.votes(plan_id)?))
    }
}
