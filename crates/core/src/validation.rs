//! Draft validation.
//!
//! `validate` is a pure function of the draft value. Every rule is evaluated
//! on every call so a single pass reports all problems at once.

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, EntityType, FIELD_DATE, FIELD_DURATION, FIELD_NAME, FIELD_START_TIME};

const REQUIRED_RULES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    NameRequired,
    DateRequired,
    ExercisesRequired,
    IntervalsRequired,
    BlocksRequired,
    DrillsRequired,
    AssignmentRequired,
    StartTimeMissing,
    DurationMissing,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameRequired => "name-required",
            Self::DateRequired => "date-required",
            Self::ExercisesRequired => "exercises-required",
            Self::IntervalsRequired => "intervals-required",
            Self::BlocksRequired => "blocks-required",
            Self::DrillsRequired => "drills-required",
            Self::AssignmentRequired => "assignment-required",
            Self::StartTimeMissing => "start-time-missing",
            Self::DurationMissing => "duration-missing",
        }
    }

    fn structure_for(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Strength => Self::ExercisesRequired,
            EntityType::Conditioning => Self::IntervalsRequired,
            EntityType::Hybrid => Self::BlocksRequired,
            EntityType::Agility => Self::DrillsRequired,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub code: IssueCode,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn error_codes(&self) -> Vec<IssueCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

pub fn validate(draft: &Draft) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if draft.name().is_none() {
        errors.push(ValidationIssue::new(
            FIELD_NAME,
            IssueCode::NameRequired,
            "Workout name is required",
        ));
    }

    if draft.scheduled_date().is_none() {
        errors.push(ValidationIssue::new(
            FIELD_DATE,
            IssueCode::DateRequired,
            "Scheduled date is required",
        ));
    }

    if draft.structure_len() == 0 {
        let field = draft.entity_type.structure_field();
        errors.push(ValidationIssue::new(
            field,
            IssueCode::structure_for(draft.entity_type),
            format!("A {} workout needs at least one entry in {field}", draft.entity_type.as_str()),
        ));
    }

    if !draft.is_assigned() {
        errors.push(ValidationIssue::new(
            "assignment",
            IssueCode::AssignmentRequired,
            "Assign at least one player or team",
        ));
    }

    if draft.start_time().is_none() {
        warnings.push(ValidationIssue::new(
            FIELD_START_TIME,
            IssueCode::StartTimeMissing,
            "Without a start time, scheduling conflicts cannot be checked",
        ));
    }

    if draft.payload.get(FIELD_DURATION).is_none() {
        warnings.push(ValidationIssue::new(
            FIELD_DURATION,
            IssueCode::DurationMissing,
            "Estimated duration is not set",
        ));
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Share of the required rules the draft satisfies, as a 0-100 percentage.
pub fn completeness(draft: &Draft) -> u8 {
    let satisfied = [
        draft.name().is_some(),
        draft.scheduled_date().is_some(),
        draft.structure_len() > 0,
        draft.is_assigned(),
    ]
    .into_iter()
    .filter(|ok| *ok)
    .count() as u32;
    (satisfied * 100 / REQUIRED_RULES) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timestamp;
    use crate::draft::Payload;
    use crate::field_value::FieldValue;
    use crate::ids::{DraftId, GroupId, ParticipantId};

    fn draft(entity_type: EntityType, payload: Payload) -> Draft {
        Draft::new(
            DraftId::generate(entity_type, Timestamp::from_millis(1)),
            entity_type,
            payload,
            Timestamp::from_millis(1),
        )
    }

    fn one(item: &str) -> FieldValue {
        FieldValue::List(vec![FieldValue::text(item)])
    }

    #[test]
    fn empty_draft_reports_every_error() {
        let result = validate(&draft(EntityType::Hybrid, Payload::new()));
        assert!(!result.is_valid);
        assert_eq!(
            result.error_codes(),
            vec![
                IssueCode::NameRequired,
                IssueCode::DateRequired,
                IssueCode::BlocksRequired,
                IssueCode::AssignmentRequired,
            ]
        );
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn blank_name_is_missing() {
        let result = validate(&draft(EntityType::Strength, Payload::new().with("name", "  ")));
        assert!(result.has_error(IssueCode::NameRequired));
    }

    #[test]
    fn structure_codes_follow_entity_type() {
        let cases = [
            (EntityType::Strength, IssueCode::ExercisesRequired),
            (EntityType::Conditioning, IssueCode::IntervalsRequired),
            (EntityType::Hybrid, IssueCode::BlocksRequired),
            (EntityType::Agility, IssueCode::DrillsRequired),
        ];
        for (kind, code) in cases {
            let result = validate(&draft(kind, Payload::new()));
            assert!(result.has_error(code), "{kind:?} should report {code:?}");
        }
    }

    #[test]
    fn unassigned_draft_never_valid() {
        for kind in EntityType::ALL {
            let payload = Payload::new()
                .with("name", "Session")
                .with("date", "2026-03-01")
                .with("start_time", "09:00")
                .with("duration_minutes", 60_i64)
                .with(kind.structure_field(), one("item"));
            let result = validate(&draft(kind, payload));
            assert!(!result.is_valid);
            assert_eq!(result.error_codes(), vec![IssueCode::AssignmentRequired]);
        }
    }

    #[test]
    fn group_alone_satisfies_assignment() {
        let mut d = draft(
            EntityType::Agility,
            Payload::new()
                .with("name", "Ladders")
                .with("date", "2026-03-01")
                .with("drills", one("ladder")),
        );
        d.groups.insert(GroupId::from("u18"));
        let result = validate(&d);
        assert!(result.is_valid);
        assert_eq!(
            result.warnings.iter().map(|w| w.code).collect::<Vec<_>>(),
            vec![IssueCode::StartTimeMissing, IssueCode::DurationMissing]
        );
    }

    #[test]
    fn validate_is_pure() {
        let mut d = draft(EntityType::Strength, Payload::new().with("name", "Push"));
        d.participants.insert(ParticipantId::from("p-7"));
        let snapshot = d.clone();
        let first = validate(&d);
        let second = validate(&d);
        assert_eq!(first, second);
        assert_eq!(d, snapshot);
    }

    #[test]
    fn completeness_counts_required_rules() {
        let mut d = draft(EntityType::Strength, Payload::new());
        assert_eq!(completeness(&d), 0);
        d.payload.set("name", "Push");
        assert_eq!(completeness(&d), 25);
        d.payload.set("date", "2026-03-01");
        d.payload.set("exercises", one("bench"));
        assert_eq!(completeness(&d), 75);
        d.participants.insert(ParticipantId::from("p-1"));
        assert_eq!(completeness(&d), 100);
    }
}
