//! Plan and vote models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{default_display_name, GroupId, PlanId, UserId};
use crate::error::Error;

/// A proposed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Group the plan was proposed in, if any
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// Fields supplied when proposing a plan
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub location: String,
    pub notes: String,
    pub creator_id: UserId,
    pub group_id: Option<GroupId>,
}

impl Plan {
    pub fn new(new_plan: NewPlan) -> Self {
        Self {
            id: PlanId::generate(),
            title: new_plan.title,
            scheduled_at: new_plan.scheduled_at,
            location: new_plan.location,
            notes: new_plan.notes,
            creator_id: new_plan.creator_id,
            created_at: Utc::now(),
            group_id: new_plan.group_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Yes,
    Maybe,
    No,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Yes => "yes",
            VoteChoice::Maybe => "maybe",
            VoteChoice::No => "no",
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(VoteChoice::Yes),
            "maybe" => Ok(VoteChoice::Maybe),
            "no" => Ok(VoteChoice::No),
            other => Err(Error::InvalidInput(format!("unknown vote '{}'", other))),
        }
    }
}

/// One user's vote on one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub plan_id: PlanId,
    pub user_id: UserId,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    pub choice: VoteChoice,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(plan_id: PlanId, user_id: UserId, display_name: &str, choice: VoteChoice) -> Self {
        Self {
            plan_id,
            user_id,
            display_name: super::display_name_or_default(display_name),
            choice,
            updated_at: Utc::now(),
        }
    }
}
