//! End-to-end editing flows through `TimetableEditor` against the in-memory store:
//! copy and paste, the lesson form, deletes, selection changes and read-only sessions.

mod common;

use assert_matches::assert_matches;
use serde_json::json;
use std::sync::Arc;

use timetable::api::{
    ConflictDescriptor, Entity, LessonConflict, MemoryStore, StoreCall, Weekday,
};
use timetable::error::AppError;
use timetable::schedule::{
    Cell, ClickOutcome, Confirmation, DeleteOutcome, EditTarget, InteractionState, LessonDraft,
    TimetableEditor, View, ViewKind,
};
use timetable::session::Session;

use common::{admin, class_editor, options};

fn draft(discipline: &str, professor: &str, room: &str) -> LessonDraft {
    LessonDraft {
        discipline_id: discipline.into(),
        professor_id: professor.into(),
        room_id: room.into(),
    }
}

// ---------------------------------------------------------------------------
// Copy and paste
// ---------------------------------------------------------------------------

/// Pasting a copied lesson onto an empty cell checks for conflicts, inserts a
/// lesson with the source's professor/room/discipline at the target cell and
/// returns to idle with the grid reloaded.
#[tokio::test]
async fn paste_creates_copy_at_target_and_returns_to_idle() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.copy("l1"));
    assert_matches!(editor.state(), InteractionState::Copying(source) if source.id == "l1");

    let target = Cell::new(Weekday::Wednesday, "s3");
    let outcome = editor.click_cell(target.clone()).await;
    assert_eq!(outcome, Ok(ClickOutcome::Pasted));

    let calls = store.calls();
    let check_at = calls
        .iter()
        .position(|c| matches!(c, StoreCall::CheckConflict(_)))
        .expect("conflict check issued");
    let insert_at = calls
        .iter()
        .position(|c| matches!(c, StoreCall::Insert(Entity::Lessons, _)))
        .expect("lesson inserted");
    assert!(check_at < insert_at, "conflict check must precede the insert");

    assert_matches!(&calls[check_at], StoreCall::CheckConflict(candidate) => {
        assert_eq!(candidate.weekday, Weekday::Wednesday);
        assert_eq!(candidate.time_slot_id, "s3");
        assert_eq!(candidate.professor_id, "p1");
        assert_eq!(candidate.room_id, "r1");
        assert_eq!(candidate.class_id, "c1");
    });
    assert_matches!(&calls[insert_at], StoreCall::Insert(_, record) => {
        assert_eq!(
            record,
            &json!({
                "dia_semana": "Quarta",
                "horario_id": "s3",
                "turma_id": "c1",
                "professor_id": "p1",
                "sala_id": "r1",
                "disciplina_id": "d1",
            })
        );
    });

    assert_eq!(editor.state(), &InteractionState::Idle);
    let pasted = editor.grid().at(&target).expect("grid reloaded with the copy");
    assert_eq!(pasted.discipline_name(), "Matemática");
    assert_eq!(editor.grid().len(), 3);
}

/// A conflict reported for the paste target aborts the write, surfaces the
/// backend's description verbatim and keeps the copy source for another try.
#[tokio::test]
async fn paste_conflict_keeps_copying_and_writes_nothing() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;
    store.set_conflicts(vec![ConflictDescriptor {
        description: "Professor Ana Souza already teaches 2AGROA at this time".into(),
    }]);

    assert!(editor.copy("l1"));
    let outcome = editor.click_cell(Cell::new(Weekday::Friday, "s1")).await;

    assert_eq!(
        outcome,
        Err(AppError::Conflict("Professor Ana Souza already teaches 2AGROA at this time".into()))
    );
    assert!(store.mutation_calls().is_empty());
    assert_matches!(editor.state(), InteractionState::Copying(source) if source.id == "l1");
    assert_eq!(editor.grid().len(), 2);
}

/// After a failed paste the same source can be pasted somewhere else.
#[tokio::test]
async fn paste_can_be_retried_on_another_cell() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;
    store.set_conflicts(vec![ConflictDescriptor { description: "Room busy".into() }]);

    assert!(editor.copy("l2"));
    assert_matches!(
        editor.click_cell(Cell::new(Weekday::Monday, "s2")).await,
        Err(AppError::Conflict(_))
    );

    store.set_conflicts(Vec::new());
    assert_eq!(
        editor.click_cell(Cell::new(Weekday::Monday, "s3")).await,
        Ok(ClickOutcome::Pasted)
    );
    assert_eq!(store.mutation_calls().len(), 1);
    assert_eq!(editor.state(), &InteractionState::Idle);
}

/// Cancelling a copy returns to idle without touching the store.
#[tokio::test]
async fn cancel_copy_returns_to_idle() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.copy("l1"));
    assert!(editor.cancel());
    assert_eq!(editor.state(), &InteractionState::Idle);
    assert!(!editor.cancel(), "cancel while idle changes nothing");
    assert!(store.calls().is_empty());
}

/// Clicking a populated cell is never a paste or a create.
#[tokio::test]
async fn click_on_populated_cell_is_ignored() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    let occupied = Cell::new(Weekday::Monday, "s1");
    assert_eq!(editor.click_cell(occupied.clone()).await, Ok(ClickOutcome::Ignored));
    assert_eq!(editor.state(), &InteractionState::Idle);

    assert!(editor.copy("l2"));
    assert_eq!(editor.click_cell(occupied).await, Ok(ClickOutcome::Ignored));
    assert_matches!(editor.state(), InteractionState::Copying(_));
    assert!(store.mutation_calls().is_empty());
}

/// Copying a second lesson while copying replaces the source.
#[tokio::test]
async fn copy_during_copy_replaces_source() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.copy("l1"));
    assert!(editor.copy("l2"));
    assert_matches!(editor.state(), InteractionState::Copying(source) if source.id == "l2");

    editor
        .click_cell(Cell::new(Weekday::Friday, "s3"))
        .await
        .expect("paste accepted");
    assert_matches!(
        store.mutation_calls().as_slice(),
        [StoreCall::Insert(Entity::Lessons, record)] => {
            assert_eq!(record["professor_id"], "p3");
            assert_eq!(record["disciplina_id"], "d3");
        }
    );
}

/// Editing a lesson while copying another opens the form on the edited
/// lesson's own cell.
#[tokio::test]
async fn edit_during_copy_opens_form_on_that_lesson() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.copy("l1"));
    assert!(editor.edit("l2"));

    assert_matches!(
        editor.state(),
        InteractionState::Editing { target: EditTarget::Existing(lesson), cell } => {
            assert_eq!(lesson.id, "l2");
            assert_eq!(cell, &Cell::new(Weekday::Tuesday, "s2"));
        }
    );
    assert!(store.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Lesson form
// ---------------------------------------------------------------------------

/// The worked example: one slot, an empty class, a click on the empty cell
/// and a submitted form produce exactly one insert and a grid showing it.
#[tokio::test]
async fn form_create_on_empty_class() {
    let store = Arc::new(MemoryStore::new());
    store.seed(Entity::TimeSlots, &[json!({"id": "s1", "rotulo": "08:00", "ordem": 1})]);
    store.seed(Entity::Classes, &[json!({"id": "C1", "codigo": "1INFOA"})]);
    store.seed(Entity::Professors, &[json!({"id": "P1", "nome": "Ana"})]);
    store.seed(Entity::Rooms, &[json!({"id": "R1", "nome": "101"})]);
    store.seed(Entity::Disciplines, &[json!({"id": "D1", "nome": "Física"})]);

    let mut editor = TimetableEditor::new(store.clone(), admin(), options());
    editor.load_reference().await;
    editor
        .select_view(Some(View::new(ViewKind::Class, "C1")))
        .await
        .expect("class view loads");
    assert!(editor.grid().is_empty());

    let cell = Cell::new(Weekday::Monday, "s1");
    assert_eq!(editor.click_cell(cell.clone()).await, Ok(ClickOutcome::StateChanged));
    assert_eq!(
        editor.state(),
        &InteractionState::Editing { target: EditTarget::New, cell: cell.clone() }
    );

    editor.submit(draft("D1", "P1", "R1")).await.expect("lesson saved");

    let inserts: Vec<_> = store
        .mutation_calls()
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::Insert(Entity::Lessons, record) => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(
        inserts,
        vec![json!({
            "dia_semana": "Segunda",
            "horario_id": "s1",
            "turma_id": "C1",
            "professor_id": "P1",
            "sala_id": "R1",
            "disciplina_id": "D1",
        })]
    );
    assert_eq!(editor.state(), &InteractionState::Idle);

    let lesson = editor.grid().at(&cell).expect("new lesson in its cell");
    assert_eq!(lesson.discipline_id, "D1");
    assert_eq!(lesson.discipline_name(), "Física");
}

/// A form submitted without a room fails validation before any store call
/// and leaves the form open.
#[tokio::test]
async fn incomplete_form_is_rejected_locally() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    editor.click_cell(Cell::new(Weekday::Thursday, "s4")).await.expect("form opens");
    store.clear_calls();

    let result = editor.submit(draft("d2", "p2", "")).await;

    assert_matches!(result, Err(AppError::Validation(_)));
    assert!(store.calls().is_empty());
    assert_matches!(editor.state(), InteractionState::Editing { target: EditTarget::New, .. });
}

/// Editing an existing lesson sends only its professor/room/discipline, and
/// by default does not ask for conflicts first.
#[tokio::test]
async fn edit_updates_fields_of_existing_lesson() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.edit("l2"));
    assert_matches!(
        editor.state(),
        InteractionState::Editing { target: EditTarget::Existing(lesson), cell }
            if lesson.id == "l2" && *cell == Cell::new(Weekday::Tuesday, "s2")
    );

    editor.submit(draft("d2", "p2", "r1")).await.expect("lesson updated");

    assert_eq!(
        store.mutation_calls(),
        vec![StoreCall::Update(
            Entity::Lessons,
            "l2".into(),
            json!({"professor_id": "p2", "sala_id": "r1", "disciplina_id": "d2"})
        )]
    );
    assert!(!store.calls().iter().any(|c| matches!(c, StoreCall::CheckConflict(_))));
    assert_eq!(editor.state(), &InteractionState::Idle);
    let updated = editor.grid().lesson("l2").expect("still in the grid");
    assert_eq!(updated.professor_name(), "Bruno Lima");
}

/// A backend rejection of the form keeps the form open with the raw message.
#[tokio::test]
async fn backend_error_on_submit_preserves_editing_state() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;
    store.fail_mutations(Some("permission denied for table grade_aulas"));

    editor.click_cell(Cell::new(Weekday::Friday, "s4")).await.expect("form opens");
    let result = editor.submit(draft("d1", "p1", "r1")).await;

    assert_eq!(result, Err(AppError::Backend("permission denied for table grade_aulas".into())));
    assert_matches!(editor.state(), InteractionState::Editing { .. });
    assert_eq!(editor.grid().len(), 2);
}

/// A save that the store accepts stands even when the reload after it fails;
/// the editor returns to idle and reports the grid as stale.
#[tokio::test]
async fn failed_reload_after_save_marks_grid_stale() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;
    assert!(!editor.is_grid_stale());

    editor.click_cell(Cell::new(Weekday::Thursday, "s4")).await.expect("form opens");
    store.fail_entity(Entity::Lessons);

    editor.submit(draft("d2", "p2", "r1")).await.expect("insert accepted");

    assert_eq!(editor.state(), &InteractionState::Idle);
    assert!(editor.is_grid_stale());
    assert!(editor.snapshot().grid_stale);
    assert_eq!(store.rows(Entity::Lessons).len(), 3);
    // The previous grid stays on screen
    assert_eq!(editor.grid().len(), 2);
}

// ---------------------------------------------------------------------------
// Deletes
// ---------------------------------------------------------------------------

/// Deleting the lesson being edited removes it and resets to idle.
#[tokio::test]
async fn deleting_edited_lesson_resets_to_idle() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.edit("l1"));
    let outcome = editor.delete_lesson("l1", Confirmation::Yes).await;

    assert_eq!(outcome, Ok(DeleteOutcome::Deleted));
    assert_eq!(editor.state(), &InteractionState::Idle);
    assert!(editor.grid().lesson("l1").is_none());
    assert_eq!(
        store.mutation_calls(),
        vec![StoreCall::Delete(Entity::Lessons, "l1".into())]
    );
}

/// Answering "no" to the delete confirmation is a no-op, not an error.
#[tokio::test]
async fn declined_delete_makes_no_call() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    let outcome = editor.delete_lesson("l1", Confirmation::No).await;

    assert_eq!(outcome, Ok(DeleteOutcome::Cancelled));
    assert!(store.calls().is_empty());
    assert_eq!(editor.grid().len(), 2);
}

// ---------------------------------------------------------------------------
// Selection changes
// ---------------------------------------------------------------------------

/// Switching to another class drops the copy in progress and the old overlay.
#[tokio::test]
async fn selection_change_resets_interaction_and_overlay() {
    let store = Arc::new(MemoryStore::demo());
    store.set_class_conflicts(
        "c1",
        vec![LessonConflict { lesson_id: "l1".into(), description: "Room busy".into() }],
    );
    let mut editor = class_editor(store.clone(), admin()).await;
    editor.reload().await.expect("reload");
    assert!(editor.conflicts().is_conflicted("l1"));

    assert!(editor.copy("l1"));
    assert!(editor.has_pending_interaction());

    editor
        .select_view(Some(View::new(ViewKind::Class, "c2")))
        .await
        .expect("second class loads");

    assert_eq!(editor.state(), &InteractionState::Idle);
    assert!(!editor.has_pending_interaction());
    assert!(editor.conflicts().is_empty());
    assert!(editor.grid().is_empty());
}

/// Conflicts reported for the class are attached to their lessons after a reload.
#[tokio::test]
async fn reload_refreshes_conflict_overlay() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;
    assert!(editor.conflicts().is_empty());

    store.set_class_conflicts(
        "c1",
        vec![LessonConflict {
            lesson_id: "l2".into(),
            description: "Professor Carla Mendes is double-booked".into(),
        }],
    );
    editor.reload().await.expect("reload");

    assert_eq!(
        editor.conflicts().description("l2"),
        Some("Professor Carla Mendes is double-booked")
    );
    assert!(!editor.conflicts().is_conflicted("l1"));
}

/// Professor and room views list lessons across classes but cannot be edited.
#[tokio::test]
async fn report_views_are_read_only() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    editor
        .select_view(Some(View::new(ViewKind::Professor, "p1")))
        .await
        .expect("professor view loads");

    assert_eq!(editor.grid().len(), 1);
    assert!(editor.grid().lesson_at(Weekday::Monday, "s1").is_some());
    assert_eq!(
        editor.click_cell(Cell::new(Weekday::Friday, "s4")).await,
        Ok(ClickOutcome::Ignored)
    );
    assert!(!editor.copy("l1"));
    assert!(!store.calls().iter().any(|c| matches!(c, StoreCall::ClassConflicts(_))));
    assert!(store.mutation_calls().is_empty());
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Without an administrator session no click changes state and no lesson
/// mutation reaches the store.
#[tokio::test]
async fn viewer_session_cannot_edit() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), Session::viewer()).await;

    assert_eq!(
        editor.click_cell(Cell::new(Weekday::Friday, "s4")).await,
        Ok(ClickOutcome::Ignored)
    );
    assert_eq!(
        editor.click_cell(Cell::new(Weekday::Monday, "s1")).await,
        Ok(ClickOutcome::Ignored)
    );
    assert!(!editor.copy("l1"));
    assert!(!editor.edit("l1"));
    assert_eq!(editor.state(), &InteractionState::Idle);

    assert_eq!(editor.submit(draft("d1", "p1", "r1")).await, Err(AppError::Unauthorized));
    assert_eq!(
        editor.delete_lesson("l1", Confirmation::Yes).await,
        Err(AppError::Unauthorized)
    );
    assert!(store.mutation_calls().is_empty());
}

/// An administrator session past its expiry is treated as a viewer.
#[tokio::test]
async fn expired_session_is_read_only() {
    let store = Arc::new(MemoryStore::demo());
    let expired = Session::admin(chrono::Duration::seconds(-1));
    let mut editor = class_editor(store.clone(), expired).await;

    assert!(!editor.session().is_admin());
    assert!(!editor.copy("l1"));
    assert_eq!(
        editor.delete_lesson("l1", Confirmation::Yes).await,
        Err(AppError::Unauthorized)
    );
}

/// A session that expires while the form is open drops the edit: the state
/// reads as idle and the form cannot be left dangling.
#[tokio::test]
async fn session_expiring_mid_edit_returns_to_idle() {
    let store = Arc::new(MemoryStore::demo());
    let short = Session::admin(chrono::Duration::milliseconds(250));
    let mut editor = class_editor(store.clone(), short).await;

    assert!(editor.edit("l1"));
    assert_matches!(editor.state(), InteractionState::Editing { .. });

    tokio::time::sleep(std::time::Duration::from_millis(350)).await;

    assert!(!editor.session().is_admin());
    assert_eq!(editor.state(), &InteractionState::Idle);
    assert_eq!(editor.snapshot().state, InteractionState::Idle);
    assert!(!editor.has_pending_interaction());
    assert!(!editor.cancel());
    assert_eq!(editor.state(), &InteractionState::Idle);
    assert_eq!(editor.submit(draft("d1", "p1", "r1")).await, Err(AppError::Unauthorized));
    assert!(store.mutation_calls().is_empty());
}

/// Logging out mid-copy drops the copy and revokes editing.
#[tokio::test]
async fn logout_discards_interaction() {
    let store = Arc::new(MemoryStore::demo());
    let mut editor = class_editor(store.clone(), admin()).await;

    assert!(editor.copy("l1"));
    editor.logout();

    assert_eq!(editor.state(), &InteractionState::Idle);
    assert!(!editor.session().is_admin());
    assert_eq!(
        editor.click_cell(Cell::new(Weekday::Friday, "s4")).await,
        Ok(ClickOutcome::Ignored)
    );
}
