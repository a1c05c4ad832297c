//! `MutationGateway` in isolation: conflict policy, the in-flight guard,
//! timeouts and error mapping.

use assert_matches::assert_matches;
use std::sync::Arc;
use std::time::Duration;

use timetable::api::{
    ConflictDescriptor, Entity, LessonFields, MemoryStore, NewLesson, StoreCall, Weekday,
};
use timetable::error::AppError;
use timetable::schedule::{Confirmation, ConflictPolicy, DeleteOutcome, LessonOrigin, MutationGateway};

mod common;

fn new_lesson(slot: &str) -> NewLesson {
    NewLesson {
        weekday: Weekday::Thursday,
        time_slot_id: slot.into(),
        class_id: "c1".into(),
        professor_id: "p2".into(),
        room_id: "r1".into(),
        discipline_id: "d2".into(),
    }
}

fn gateway(store: &Arc<MemoryStore>, policy: ConflictPolicy) -> MutationGateway<MemoryStore> {
    MutationGateway::new(store.clone(), Duration::from_secs(2), policy)
}

fn conflict_checks(store: &MemoryStore) -> usize {
    store
        .calls()
        .iter()
        .filter(|c| matches!(c, StoreCall::CheckConflict(_)))
        .count()
}

// ---------------------------------------------------------------------------
// Conflict policy
// ---------------------------------------------------------------------------

/// Copies are always checked, even with every optional check switched off.
#[tokio::test]
async fn copy_is_always_checked() {
    let store = Arc::new(MemoryStore::new());
    let policy = ConflictPolicy { check_form_creates: false, check_updates: false };
    store.set_conflicts(vec![ConflictDescriptor { description: "Room 101 is taken".into() }]);

    let result = gateway(&store, policy).create(&new_lesson("s1"), LessonOrigin::Copy).await;

    assert_eq!(result, Err(AppError::Conflict("Room 101 is taken".into())));
    assert_eq!(conflict_checks(&store), 1);
    assert!(store.mutation_calls().is_empty());
}

/// With form pre-checks off, a form create goes straight to the insert.
#[tokio::test]
async fn form_create_skips_check_when_disabled() {
    let store = Arc::new(MemoryStore::new());
    let policy = ConflictPolicy { check_form_creates: false, check_updates: false };
    store.set_conflicts(vec![ConflictDescriptor { description: "ignored".into() }]);

    gateway(&store, policy)
        .create(&new_lesson("s1"), LessonOrigin::Form)
        .await
        .expect("insert accepted");

    assert_eq!(conflict_checks(&store), 0);
    assert_matches!(store.mutation_calls().as_slice(), [StoreCall::Insert(Entity::Lessons, _)]);
}

/// The default policy checks form creates too.
#[tokio::test]
async fn form_create_checked_by_default() {
    let store = Arc::new(MemoryStore::new());
    store.set_conflicts(vec![ConflictDescriptor { description: "Class already busy".into() }]);

    let result = gateway(&store, ConflictPolicy::default())
        .create(&new_lesson("s1"), LessonOrigin::Form)
        .await;

    assert_eq!(result, Err(AppError::Conflict("Class already busy".into())));
    assert!(store.mutation_calls().is_empty());
}

/// With update checks on, the candidate keeps the lesson's cell and class
/// and carries the new professor and room.
#[tokio::test]
async fn update_checked_when_enabled() {
    let store = Arc::new(MemoryStore::demo());
    let policy = ConflictPolicy { check_form_creates: true, check_updates: true };
    store.set_conflicts(vec![ConflictDescriptor { description: "Professor busy".into() }]);
    let lesson = common::lesson("l1", "Segunda", "s1", "c1");
    let fields = LessonFields {
        professor_id: "p2".into(),
        room_id: "r2".into(),
        discipline_id: "d1".into(),
    };

    let result = gateway(&store, policy).update(&lesson, &fields).await;

    assert_eq!(result, Err(AppError::Conflict("Professor busy".into())));
    assert_matches!(store.calls().as_slice(), [StoreCall::CheckConflict(candidate)] => {
        assert_eq!(candidate.weekday, Weekday::Monday);
        assert_eq!(candidate.time_slot_id, "s1");
        assert_eq!(candidate.class_id, "c1");
        assert_eq!(candidate.professor_id, "p2");
        assert_eq!(candidate.room_id, "r2");
    });
}

// ---------------------------------------------------------------------------
// In-flight guard and timeouts
// ---------------------------------------------------------------------------

/// A second mutation issued while the first is still awaiting the backend is
/// refused with `Busy`; only one insert reaches the store.
#[tokio::test]
async fn concurrent_mutation_is_refused() {
    let store = Arc::new(MemoryStore::new());
    store.set_latency(Some(Duration::from_millis(100)));
    let gateway = gateway(&store, ConflictPolicy::default());

    let first = new_lesson("s1");
    let second = new_lesson("s2");
    let (a, b) = tokio::join!(
        gateway.create(&first, LessonOrigin::Copy),
        gateway.create(&second, LessonOrigin::Copy),
    );

    assert_eq!(a, Ok(()));
    assert_eq!(b, Err(AppError::Busy));
    assert_eq!(store.mutation_calls().len(), 1);
    assert!(!gateway.is_busy());
}

/// A stalled backend call fails with `Timeout` and releases the guard.
#[tokio::test]
async fn stalled_call_times_out_and_releases_guard() {
    let store = Arc::new(MemoryStore::new());
    store.set_latency(Some(Duration::from_millis(500)));
    let limit = Duration::from_millis(50);
    let gateway = MutationGateway::new(store.clone(), limit, ConflictPolicy::default());

    let result = gateway.delete("l1", Confirmation::Yes).await;
    assert_eq!(result, Err(AppError::Timeout(limit)));
    assert!(!gateway.is_busy());

    store.set_latency(None);
    assert_eq!(gateway.delete("l1", Confirmation::Yes).await, Ok(DeleteOutcome::Deleted));
}

// ---------------------------------------------------------------------------
// Deletes and errors
// ---------------------------------------------------------------------------

/// A declined confirmation never reaches the store.
#[tokio::test]
async fn declined_delete_is_a_no_op() {
    let store = Arc::new(MemoryStore::demo());
    let gateway = gateway(&store, ConflictPolicy::default());

    assert_eq!(gateway.delete("l1", Confirmation::No).await, Ok(DeleteOutcome::Cancelled));
    assert!(store.calls().is_empty());
    assert_eq!(store.rows(Entity::Lessons).len(), 2);
}

/// The backend's own message is surfaced when it rejects a write.
#[tokio::test]
async fn backend_rejection_is_surfaced_verbatim() {
    let store = Arc::new(MemoryStore::new());
    store.fail_mutations(Some("duplicate key value violates unique constraint \"grade_aulas_unique\""));

    let result = gateway(&store, ConflictPolicy::default())
        .create(&new_lesson("s1"), LessonOrigin::Form)
        .await;

    assert_eq!(
        result,
        Err(AppError::Backend(
            "duplicate key value violates unique constraint \"grade_aulas_unique\"".into()
        ))
    );
    assert!(store.rows(Entity::Lessons).is_empty());
}
