//! Availability aggregation
//!
//! Turns per-member free-date sets into group consensus. The free functions work
//! on in-memory snapshots; [`AvailabilityService`] reads them from a store, and
//! [`UnifiedAvailability`] keeps a cross-group view current from live queries.
//!
//! Dates are canonical calendar days; callers convert local wall-clock dates
//! before they get here.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{AvailabilityRecord, CalendarDate, Group, GroupId, UserId};
use crate::storage::{AvailabilityRepository, GroupRepository, LiveQueries, Subscription};

/// Calendar date → number of members free that day
pub type Histogram = BTreeMap<CalendarDate, usize>;

/// How much of a group is free on a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consensus {
    /// Every member is free
    Unanimous,
    /// More than half of the members are free
    Majority,
    Minority,
}

/// Count, per date, the distinct (group, member) pairs free that day
pub fn union_histogram<'r, I>(records: I) -> Histogram
where
    I: IntoIterator<Item = &'r AvailabilityRecord>,
{
    let mut seen: HashSet<(&GroupId, &UserId, CalendarDate)> = HashSet::new();
    let mut histogram = Histogram::new();

    for record in records {
        for date in &record.free_dates {
            if seen.insert((&record.group_id, &record.user_id, *date)) {
                *histogram.entry(*date).or_insert(0) += 1;
            }
        }
    }
    histogram
}

/// Histogram of a single group's records
pub fn histogram(records: &[AvailabilityRecord]) -> Histogram {
    union_histogram(records)
}

/// Classify a date against the group size
pub fn classify(date: &CalendarDate, histogram: &Histogram, member_count: usize) -> Consensus {
    if member_count == 0 {
        return Consensus::Minority;
    }

    let count = histogram.get(date).copied().unwrap_or(0);
    if count == member_count {
        Consensus::Unanimous
    } else if count * 2 > member_count {
        Consensus::Majority
    } else {
        Consensus::Minority
    }
}

/// Best dates first: highest count, then earliest date
pub fn top_dates(histogram: &Histogram, limit: usize) -> Vec<(CalendarDate, usize)> {
    let mut entries: Vec<(CalendarDate, usize)> =
        histogram.iter().map(|(date, count)| (*date, *count)).collect();
    // BTreeMap iteration is already date-ascending; a stable sort keeps that for ties
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);
    entries
}

/// Availability reads and writes over a store handle
pub struct AvailabilityService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> AvailabilityService<'a, S>
where
    S: GroupRepository + AvailabilityRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Replace a member's free dates in a group. An empty set clears them.
    pub fn set_availability(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        display_name: &str,
        free_dates: BTreeSet<CalendarDate>,
    ) -> Result<()> {
        if user_id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        self.require_group(group_id)?;

        let record =
            AvailabilityRecord::new(group_id.clone(), user_id.clone(), display_name, free_dates);
        self.store.replace_availability(&record)?;
        info!(group_id = %group_id, user_id = %user_id, dates = record.free_dates.len(), "Availability saved");
        Ok(())
    }

    /// One member's record, if they have saved any
    pub fn availability(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<AvailabilityRecord>> {
        self.store.get_availability(group_id, user_id)
    }

    /// Per-date counts over the group's current members
    pub fn group_histogram(&self, group_id: &GroupId) -> Result<Histogram> {
        let group = self.require_group(group_id)?;
        let records = self.member_records(&group)?;
        Ok(histogram(&records))
    }

    /// Dates on which every current member is free, earliest first
    pub fn common_dates(&self, group_id: &GroupId) -> Result<Vec<CalendarDate>> {
        let group = self.require_group(group_id)?;
        let records = self.member_records(&group)?;
        let histogram = histogram(&records);
        let member_count = group.member_count();

        Ok(histogram
            .keys()
            .filter(|date| classify(date, &histogram, member_count) == Consensus::Unanimous)
            .copied()
            .collect())
    }

    /// Union of every member's availability across all of the user's groups.
    ///
    /// Each (group, member, date) contributes once, so a person free on the same
    /// day in two shared groups counts twice.
    pub fn union_across_groups(&self, user_id: &UserId) -> Result<Histogram> {
        let mut records = Vec::new();
        for group_id in self.store.list_group_ids_for_user(user_id)? {
            match self.store.find_group_by_id(&group_id)? {
                Some(group) if group.is_member(user_id) => {
                    records.extend(self.member_records(&group)?);
                }
                _ => debug!(group_id = %group_id, user_id = %user_id, "Skipping stale profile index entry"),
            }
        }
        Ok(union_histogram(&records))
    }

    fn require_group(&self, group_id: &GroupId) -> Result<Group> {
        self.store
            .find_group_by_id(group_id)?
            .ok_or_else(|| Error::NotFound(format!("group {}", group_id)))
    }

    /// Records of current members only; pending or departed users do not count
    fn member_records(&self, group: &Group) -> Result<Vec<AvailabilityRecord>> {
        let mut records = self.store.list_availability(&group.id)?;
        records.retain(|r| group.is_member(&r.user_id));
        Ok(records)
    }
}

/// A cross-group availability view fed by live queries.
///
/// Holds the latest member and availability snapshots per group and recomputes
/// the union whenever any of them changes. Only current members count, as in
/// [`AvailabilityService::union_across_groups`]. Dropping the view cancels every
/// underlying subscription.
pub struct UnifiedAvailability {
    snapshots: Arc<Mutex<GroupSnapshots>>,
    subscriptions: Vec<Subscription>,
}

#[derive(Default)]
struct GroupSnapshots {
    members: HashMap<GroupId, HashSet<UserId>>,
    availability: HashMap<GroupId, Vec<AvailabilityRecord>>,
}

impl GroupSnapshots {
    fn merged(&self) -> Histogram {
        union_histogram(self.availability.iter().flat_map(|(group_id, records)| {
            let members = self.members.get(group_id);
            records
                .iter()
                .filter(move |r| members.is_some_and(|m| m.contains(&r.user_id)))
        }))
    }
}

fn lock_snapshots(snapshots: &Mutex<GroupSnapshots>) -> MutexGuard<'_, GroupSnapshots> {
    snapshots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl UnifiedAvailability {
    /// Watch `group_ids`; `on_change` receives the merged histogram after every
    /// snapshot, including the initial member and availability snapshots of each
    /// group.
    pub fn watch<S, F>(store: &S, group_ids: &[GroupId], on_change: F) -> Result<Self>
    where
        S: LiveQueries + ?Sized,
        F: Fn(&Histogram) + Send + Sync + 'static,
    {
        let snapshots = Arc::new(Mutex::new(GroupSnapshots::default()));
        let on_change = Arc::new(on_change);
        let mut subscriptions = Vec::with_capacity(group_ids.len() * 2);

        for group_id in group_ids {
            let members_sub = {
                let snapshots = Arc::clone(&snapshots);
                let on_change = Arc::clone(&on_change);
                let key = group_id.clone();
                store.watch_members(group_id, move |records| {
                    let merged = {
                        let mut snapshots = lock_snapshots(&snapshots);
                        let current = records
                            .iter()
                            .filter(|r| r.role.is_member())
                            .map(|r| r.user_id.clone())
                            .collect();
                        snapshots.members.insert(key.clone(), current);
                        snapshots.merged()
                    };
                    on_change(&merged);
                })?
            };
            subscriptions.push(members_sub);

            let availability_sub = {
                let snapshots = Arc::clone(&snapshots);
                let on_change = Arc::clone(&on_change);
                let key = group_id.clone();
                store.watch_availability(group_id, move |records| {
                    let merged = {
                        let mut snapshots = lock_snapshots(&snapshots);
                        snapshots.availability.insert(key.clone(), records.to_vec());
                        snapshots.merged()
                    };
                    on_change(&merged);
                })?
            };
            subscriptions.push(availability_sub);
        }

        Ok(Self {
            snapshots,
            subscriptions,
        })
    }

    /// The merged histogram as of the latest snapshots
    pub fn histogram(&self) -> Histogram {
        lock_snapshots(&self.snapshots).merged()
    }

    /// Number of groups being watched
    pub fn group_count(&self) -> usize {
        lock_snapshots(&self.snapshots).availability.len()
    }

    /// Stop watching every group
    pub fn cancel(self) {
        for subscription in self.subscriptions {
            subscription.cancel();
        }
    }
}
