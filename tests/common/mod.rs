//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use timetable::api::{Lesson, MemoryStore};
use timetable::schedule::{EditorOptions, TimetableEditor, View, ViewKind};
use timetable::session::Session;

pub fn admin() -> Session {
    Session::admin(chrono::Duration::hours(1))
}

pub fn options() -> EditorOptions {
    EditorOptions {
        timeout: Duration::from_secs(2),
        ..EditorOptions::default()
    }
}

pub fn lesson(id: &str, weekday: &str, slot: &str, class: &str) -> Lesson {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "dia_semana": weekday,
        "horario_id": slot,
        "turma_id": class,
        "professor_id": "p1",
        "sala_id": "r1",
        "disciplina_id": "d1",
    }))
    .expect("valid lesson row")
}

/// Editor over `store` with reference data loaded and class `c1` selected
pub async fn class_editor(store: Arc<MemoryStore>, session: Session) -> TimetableEditor<MemoryStore> {
    let mut editor = TimetableEditor::new(store.clone(), session, options());
    editor.load_reference().await;
    editor
        .select_view(Some(View::new(ViewKind::Class, "c1")))
        .await
        .expect("class view loads");
    store.clear_calls();
    editor
}
