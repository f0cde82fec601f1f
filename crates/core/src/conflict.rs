use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::draft::Draft;
use crate::ids::{DraftId, GroupId, ParticipantId};

/// Group membership used to expand group assignments into individuals.
pub type GroupRoster = BTreeMap<GroupId, BTreeSet<ParticipantId>>;

/// Two drafts booked into the same slot with overlapping assignees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConflict {
    pub first: DraftId,
    pub second: DraftId,
    pub date: String,
    pub start_time: String,
    pub shared_participants: BTreeSet<ParticipantId>,
    pub shared_groups: BTreeSet<GroupId>,
}

impl DraftConflict {
    pub fn involves(&self, id: &DraftId) -> bool {
        self.first == *id || self.second == *id
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    roster: GroupRoster,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: GroupRoster) -> Self {
        Self { roster }
    }

    pub fn set_roster(&mut self, roster: GroupRoster) {
        self.roster = roster;
    }

    /// Every conflicting pair among `drafts`, each pair reported once.
    pub fn detect<'a>(&self, drafts: impl IntoIterator<Item = &'a Draft>) -> Vec<DraftConflict> {
        let drafts: Vec<&Draft> = drafts.into_iter().collect();
        let mut conflicts = Vec::new();
        for (i, a) in drafts.iter().enumerate() {
            for b in &drafts[i + 1..] {
                if let Some(conflict) = self.check_pair(a, b) {
                    conflicts.push(conflict);
                }
            }
        }
        conflicts
    }

    /// Conflicts between `target` and any other draft.
    pub fn detect_for<'a>(
        &self,
        target: &Draft,
        others: impl IntoIterator<Item = &'a Draft>,
    ) -> Vec<DraftConflict> {
        others
            .into_iter()
            .filter_map(|other| self.check_pair(target, other))
            .collect()
    }

    pub fn check_pair(&self, a: &Draft, b: &Draft) -> Option<DraftConflict> {
        if a.id == b.id {
            return None;
        }
        let (date, start_time) = match (a.scheduled_date(), a.start_time()) {
            (Some(date), Some(time)) => (date, time),
            _ => return None,
        };
        if b.scheduled_date() != Some(date) || b.start_time() != Some(start_time) {
            return None;
        }

        let shared_groups: BTreeSet<GroupId> = a.groups.intersection(&b.groups).cloned().collect();
        let members_a = self.members(a);
        let members_b = self.members(b);
        let shared_participants: BTreeSet<ParticipantId> =
            members_a.intersection(&members_b).cloned().collect();

        if shared_groups.is_empty() && shared_participants.is_empty() {
            return None;
        }

        Some(DraftConflict {
            first: a.id.clone(),
            second: b.id.clone(),
            date: date.to_string(),
            start_time: start_time.to_string(),
            shared_participants,
            shared_groups,
        })
    }

    /// Direct participants plus members of any rostered group.
    fn members(&self, draft: &Draft) -> BTreeSet<ParticipantId> {
        let mut members = draft.participants.clone();
        for group in &draft.groups {
            if let Some(roster) = self.roster.get(group) {
                members.extend(roster.iter().cloned());
            }
        }
        members
    }
}
