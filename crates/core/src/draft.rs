use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::ids::{DraftId, GroupId, ParticipantId};
use crate::validation::ValidationResult;

pub const FIELD_NAME: &str = "name";
pub const FIELD_DATE: &str = "date";
pub const FIELD_START_TIME: &str = "start_time";
pub const FIELD_DURATION: &str = "duration_minutes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Strength,
    Conditioning,
    Hybrid,
    Agility,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Strength,
        EntityType::Conditioning,
        EntityType::Hybrid,
        EntityType::Agility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Conditioning => "conditioning",
            Self::Hybrid => "hybrid",
            Self::Agility => "agility",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "strength" => Ok(Self::Strength),
            "conditioning" => Ok(Self::Conditioning),
            "hybrid" => Ok(Self::Hybrid),
            "agility" => Ok(Self::Agility),
            _ => Err(CoreError::UnknownEntityType(s.to_string())),
        }
    }

    /// Payload key holding the structural items this kind of workout needs.
    pub fn structure_field(&self) -> &'static str {
        match self {
            Self::Strength => "exercises",
            Self::Conditioning => "intervals",
            Self::Hybrid => "blocks",
            Self::Agility => "drills",
        }
    }
}

/// Partial representation of the workout being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload(BTreeMap<String, FieldValue>);

impl Payload {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Shallow merge: top-level keys of `partial` replace ours wholesale.
    pub fn merge(&mut self, partial: Payload) {
        self.0.extend(partial.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub entity_type: EntityType,
    pub payload: Payload,
    pub participants: BTreeSet<ParticipantId>,
    pub groups: BTreeSet<GroupId>,
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
    pub dirty: bool,
    pub validation: Option<ValidationResult>,
    /// Identifier assigned by the remote service once a create is acknowledged.
    pub server_id: Option<String>,
    pub last_saved_at: Option<Timestamp>,
}

impl Draft {
    pub fn new(id: DraftId, entity_type: EntityType, payload: Payload, now: Timestamp) -> Self {
        Self {
            id,
            entity_type,
            payload,
            participants: BTreeSet::new(),
            groups: BTreeSet::new(),
            created_at: now,
            last_modified: now,
            dirty: false,
            validation: None,
            server_id: None,
            last_saved_at: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.payload.get(FIELD_NAME).and_then(FieldValue::non_blank_text)
    }

    pub fn scheduled_date(&self) -> Option<&str> {
        self.payload.get(FIELD_DATE).and_then(FieldValue::non_blank_text)
    }

    pub fn start_time(&self) -> Option<&str> {
        self.payload.get(FIELD_START_TIME).and_then(FieldValue::non_blank_text)
    }

    /// Number of structural items (exercises, intervals, ...) for this type.
    pub fn structure_len(&self) -> usize {
        self.payload
            .get(self.entity_type.structure_field())
            .and_then(FieldValue::as_list)
            .map_or(0, <[FieldValue]>::len)
    }

    pub fn is_assigned(&self) -> bool {
        !self.participants.is_empty() || !self.groups.is_empty()
    }

    /// Content equality, ignoring bookkeeping fields.
    pub fn same_content(&self, other: &Draft) -> bool {
        self.entity_type == other.entity_type
            && self.payload == other.payload
            && self.participants == other.participants
            && self.groups == other.groups
    }
}
