use std::collections::HashMap;
use std::time::Duration;

use super::grid::View;
use super::remote;
use crate::api::{LessonConflict, RecordId, RecordStore};

/// Server-reported clashes for the lessons of the active view, keyed by lesson id.
/// Purely informative: a conflicted lesson is still shown and editable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictOverlay {
    by_lesson: HashMap<RecordId, String>,
}

impl ConflictOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the overlay with the backend's current verdict for `view`.
    /// Only class views have a bulk conflict query; other views come back empty.
    pub async fn refresh<S: RecordStore + ?Sized>(&mut self, store: &S, view: &View, timeout: Duration) {
        self.clear();
        let Some(class_id) = view.class_id() else {
            return;
        };

        match remote(timeout, store.class_conflicts(class_id)).await {
            Ok(conflicts) => {
                self.apply(conflicts);
                if !self.by_lesson.is_empty() {
                    tracing::info!(class = %class_id, lessons = self.by_lesson.len(), "conflicts reported");
                }
            }
            Err(e) => {
                tracing::warn!(class = %class_id, error = %e, "conflict check failed; overlay left empty");
            }
        }
    }

    pub fn apply(&mut self, conflicts: Vec<LessonConflict>) {
        for conflict in conflicts {
            self.by_lesson
                .entry(conflict.lesson_id)
                .and_modify(|text| {
                    text.push('\n');
                    text.push_str(&conflict.description);
                })
                .or_insert_with(|| conflict.description.clone());
        }
    }

    pub fn description(&self, lesson_id: &str) -> Option<&str> {
        self.by_lesson.get(lesson_id).map(String::as_str)
    }

    pub fn is_conflicted(&self, lesson_id: &str) -> bool {
        self.by_lesson.contains_key(lesson_id)
    }

    pub fn len(&self) -> usize {
        self.by_lesson.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lesson.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_lesson.clear();
    }
}
