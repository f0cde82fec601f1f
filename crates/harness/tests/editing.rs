use playbook_core::{EntityType, FieldValue, GroupId, IssueCode, ParticipantId, Payload};
use playbook_engine::{EngineError, SyncOutcome};
use playbook_harness::{TestSession, complete_payload, init_tracing};

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn undo_n_times_restores_initial_and_redo_replays() -> Result<(), EngineError> {
    init_tracing();
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = engine.create(EntityType::Conditioning, Payload::new().with("name", "v0"));
    let initial = engine.draft(&id).unwrap();

    for i in 1..=4 {
        assert!(engine.update(&id, Payload::new().with("name", format!("v{i}"))));
    }
    let latest = engine.draft(&id).unwrap();
    assert_eq!(latest.name(), Some("v4"));

    for _ in 0..4 {
        assert_eq!(engine.undo(), Some(id.clone()));
    }
    assert!(!engine.can_undo());
    assert!(engine.draft(&id).unwrap().same_content(&initial));
    assert_eq!(engine.undo(), None);

    for _ in 0..4 {
        assert_eq!(engine.redo(), Some(id.clone()));
    }
    assert!(!engine.can_redo());
    assert!(engine.draft(&id).unwrap().same_content(&latest));
    Ok(())
}

#[tokio::test]
async fn update_after_undo_clears_redo() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = engine.create(EntityType::Agility, Payload::new());
    engine.update(&id, Payload::new().with("name", "Cones"));
    engine.update(&id, Payload::new().with("name", "Ladders"));

    engine.undo();
    assert!(engine.can_redo());

    engine.update(&id, Payload::new().with("date", "2026-03-20"));
    assert!(!engine.can_redo());
    assert_eq!(engine.redo(), None);
    Ok(())
}

#[tokio::test]
async fn participant_change_after_undo_also_clears_redo() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = engine.create(EntityType::Hybrid, Payload::new());
    engine.add_group(&id, GroupId::from("forwards"));
    engine.undo();
    assert!(engine.can_redo());

    engine.add_participant(&id, ParticipantId::from("p-7"));
    assert!(!engine.can_redo());
    Ok(())
}

#[tokio::test]
async fn undo_walks_across_drafts_in_edit_order() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let a = engine.create(EntityType::Strength, Payload::new().with("name", "a0"));
    let b = engine.create(EntityType::Strength, Payload::new().with("name", "b0"));
    engine.update(&a, Payload::new().with("name", "a1"));
    engine.update(&b, Payload::new().with("name", "b1"));

    assert_eq!(engine.undo(), Some(b.clone()));
    assert_eq!(engine.draft(&b).unwrap().name(), Some("b0"));
    assert_eq!(engine.draft(&a).unwrap().name(), Some("a1"));

    assert_eq!(engine.undo(), Some(a.clone()));
    assert_eq!(engine.draft(&a).unwrap().name(), Some("a0"));
    Ok(())
}

#[tokio::test]
async fn deleting_a_draft_drops_its_history() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let keep = engine.create(EntityType::Strength, Payload::new().with("name", "keep"));
    let gone = engine.create(EntityType::Strength, Payload::new().with("name", "gone"));
    engine.update(&keep, Payload::new().with("name", "keep-1"));
    engine.update(&gone, Payload::new().with("name", "gone-1"));

    engine.delete(&gone).await?;
    assert!(engine.draft(&gone).is_none());

    assert_eq!(engine.undo(), Some(keep.clone()));
    assert_eq!(engine.draft(&keep).unwrap().name(), Some("keep"));
    assert!(!engine.can_undo());
    Ok(())
}

// ============================================================================
// Store semantics
// ============================================================================

#[tokio::test]
async fn update_of_unknown_draft_is_silent() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;
    let id = engine.create(EntityType::Strength, Payload::new());
    engine.delete(&id).await?;

    assert!(!engine.update(&id, Payload::new().with("name", "ghost")));
    assert!(engine.drafts().is_empty());
    assert!(engine.pending_saves().is_empty());
    Ok(())
}

#[tokio::test]
async fn create_selects_and_delete_deselects() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let first = engine.create(EntityType::Strength, Payload::new());
    let second = engine.create(EntityType::Agility, Payload::new());
    assert_eq!(engine.ui_state().selected_draft, Some(second.clone()));
    assert_eq!(engine.active_draft().map(|d| d.id), Some(second.clone()));

    engine.delete(&second).await?;
    assert!(engine.ui_state().selected_draft.is_none());
    assert!(engine.active_draft().is_none());

    assert!(engine.select(Some(&first)));
    assert_eq!(engine.active_draft().map(|d| d.id), Some(first));
    Ok(())
}

#[tokio::test]
async fn drafts_by_type_filters() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    engine.create(EntityType::Strength, Payload::new());
    engine.create(EntityType::Strength, Payload::new());
    engine.create(EntityType::Conditioning, Payload::new());

    assert_eq!(engine.drafts().len(), 3);
    assert_eq!(engine.drafts_by_type(EntityType::Strength).len(), 2);
    assert_eq!(engine.drafts_by_type(EntityType::Agility).len(), 0);
    Ok(())
}

#[tokio::test]
async fn clear_all_resets_drafts_history_and_selection() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = engine.create(EntityType::Strength, Payload::new());
    engine.update(&id, Payload::new().with("name", "x"));
    assert!(!engine.pending_saves().is_empty());

    engine.clear_all();
    assert!(engine.drafts().is_empty());
    assert!(!engine.can_undo());
    assert!(engine.ui_state().selected_draft.is_none());
    assert!(engine.pending_saves().is_empty());
    Ok(())
}

#[tokio::test]
async fn ui_state_is_not_part_of_history() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    engine.set_active_tab(Some("conditioning".into()));
    engine.set_modal("assign-players", true);
    assert!(!engine.can_undo());

    let ui = engine.ui_state();
    assert_eq!(ui.active_tab.as_deref(), Some("conditioning"));
    assert!(ui.is_modal_open("assign-players"));
    Ok(())
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn strength_draft_needs_exercises_and_assignment() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = engine.create(
        EntityType::Strength,
        Payload::new().with("name", "Upper body").with("date", "2026-03-14"),
    );
    let codes: Vec<_> = engine.validation_errors(&id).iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![IssueCode::ExercisesRequired, IssueCode::AssignmentRequired]);
    assert_eq!(engine.completeness(&id), Some(50));

    engine.update(
        &id,
        Payload::new().with("exercises", FieldValue::List(vec![FieldValue::text("bench press")])),
    );
    engine.add_participant(&id, ParticipantId::from("p-1"));

    let draft = engine.draft(&id).unwrap();
    assert!(draft.validation.as_ref().is_some_and(|v| v.is_valid));
    assert!(engine.validation_errors(&id).is_empty());
    assert_eq!(engine.completeness(&id), Some(100));
    Ok(())
}

#[tokio::test]
async fn unassigned_draft_is_never_sent() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = engine.create(EntityType::Hybrid, complete_payload(EntityType::Hybrid, "Circuit"));
    engine.update(&id, Payload::new().with("duration_minutes", 45_i64));

    let report = engine.commit(&id).await?;
    match report.outcome {
        SyncOutcome::Invalid(result) => {
            assert_eq!(result.error_codes(), vec![IssueCode::AssignmentRequired]);
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
    assert!(session.remote.calls().is_empty());
    assert!(engine.draft(&id).unwrap().dirty);
    Ok(())
}

#[tokio::test]
async fn removing_last_assignee_invalidates() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let id = session.complete_draft(EntityType::Agility, "Footwork");
    assert!(engine.validation_errors(&id).is_empty());

    engine.remove_participant(&id, &ParticipantId::from("player-1"));
    let codes: Vec<_> = engine.validation_errors(&id).iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![IssueCode::AssignmentRequired]);
    Ok(())
}

// ============================================================================
// Conflicts
// ============================================================================

#[tokio::test]
async fn shared_participant_in_same_slot_conflicts() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let morning = session.complete_draft(EntityType::Strength, "Morning lift");
    let run = session.complete_draft(EntityType::Conditioning, "Tempo run");

    let report = engine.commit(&morning).await?;
    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert!(conflict.involves(&morning) && conflict.involves(&run));
    assert!(conflict.shared_participants.contains(&ParticipantId::from("player-1")));
    // Advisory only: the save still went out.
    assert!(matches!(report.outcome, SyncOutcome::Saved(_)));

    engine.update(&run, Payload::new().with("start_time", "15:00"));
    assert!(engine.conflicts_for(&morning)?.is_empty());
    assert!(engine.conflicts().is_empty());
    Ok(())
}

#[tokio::test]
async fn group_roster_expands_membership() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let engine = &session.engine;

    let team = engine.create(EntityType::Strength, complete_payload(EntityType::Strength, "Team lift"));
    engine.add_group(&team, GroupId::from("backs"));
    let solo = session.complete_draft(EntityType::Agility, "Solo drills");

    assert!(engine.conflicts().is_empty());

    engine.set_group_roster(
        [(GroupId::from("backs"), [ParticipantId::from("player-1")].into_iter().collect())]
            .into_iter()
            .collect(),
    );
    let conflicts = engine.conflicts_for(&solo)?;
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].involves(&team));
    Ok(())
}

#[tokio::test]
async fn conflicts_for_unknown_draft_is_an_error() -> Result<(), EngineError> {
    let session = TestSession::start().await?;
    let id = session.engine.create(EntityType::Strength, Payload::new());
    session.engine.delete(&id).await?;

    let err = session.engine.commit(&id).await.unwrap_err();
    assert!(matches!(err, EngineError::DraftNotFound(missing) if missing == id));
    Ok(())
}
