//! Huddle Core Library
//!
//! Group membership, availability aggregation, plan voting, and storage for Huddle.

pub mod availability;
pub mod config;
pub mod error;
pub mod identity;
pub mod invariants;
pub mod membership;
pub mod models;
pub mod permissions;
pub mod storage;
pub mod voting;

pub use availability::{
    classify, histogram, top_dates, union_histogram, AvailabilityService, Consensus, Histogram,
    UnifiedAvailability,
};
pub use config::HuddleConfig;
pub use error::{Error, ErrorKind, Result};
pub use identity::{IdentitySession, StaticIdentity};
pub use membership::MembershipEngine;
pub use models::*;
pub use permissions::*;
pub use storage::{
    AvailabilityRepository, Database, GroupRepository, LiveQueries, PlanRepository, Storage,
    Subscription,
};
pub use voting::{my_vote, tally, PlanService, Tally};
