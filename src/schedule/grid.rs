use std::collections::HashMap;

use crate::api::{Lesson, RecordId, Weekday};

/// One position in the weekly grid
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub weekday: Weekday,
    pub slot_id: RecordId,
}

impl Cell {
    pub fn new(weekday: Weekday, slot_id: impl Into<RecordId>) -> Self {
        Self {
            weekday,
            slot_id: slot_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Class,
    Professor,
    Room,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Class, ViewKind::Professor, ViewKind::Room];

    pub fn label(self) -> &'static str {
        match self {
            ViewKind::Class => "By class",
            ViewKind::Professor => "By professor",
            ViewKind::Room => "By room",
        }
    }
}

/// Which lessons are loaded: those of one class, one professor or one room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum View {
    Class(RecordId),
    Professor(RecordId),
    Room(RecordId),
}

impl View {
    pub fn new(kind: ViewKind, id: impl Into<RecordId>) -> Self {
        let id = id.into();
        match kind {
            ViewKind::Class => View::Class(id),
            ViewKind::Professor => View::Professor(id),
            ViewKind::Room => View::Room(id),
        }
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            View::Class(_) => ViewKind::Class,
            View::Professor(_) => ViewKind::Professor,
            View::Room(_) => ViewKind::Room,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            View::Class(id) | View::Professor(id) | View::Room(id) => id,
        }
    }

    /// Lesson column the view filters on
    pub fn filter_column(&self) -> &'static str {
        match self {
            View::Class(_) => "turma_id",
            View::Professor(_) => "professor_id",
            View::Room(_) => "sala_id",
        }
    }

    pub fn class_id(&self) -> Option<&str> {
        match self {
            View::Class(id) => Some(id),
            _ => None,
        }
    }
}

/// Maps each occupied cell of the active view to its lesson
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridIndex {
    lessons: Vec<Lesson>,
    cells: HashMap<(Weekday, RecordId), usize>,
}

impl GridIndex {
    pub fn build(lessons: Vec<Lesson>) -> Self {
        let mut cells = HashMap::with_capacity(lessons.len());
        for (i, lesson) in lessons.iter().enumerate() {
            let key = (lesson.weekday, lesson.time_slot_id.clone());
            if let Some(&first) = cells.get(&key) {
                let first: &Lesson = &lessons[first];
                tracing::warn!(
                    weekday = %lesson.weekday,
                    slot = %lesson.time_slot_id,
                    shown = %first.id,
                    hidden = %lesson.id,
                    "two lessons share one cell of this view"
                );
                continue;
            }
            cells.insert(key, i);
        }
        Self { lessons, cells }
    }

    pub fn lesson_at(&self, weekday: Weekday, slot_id: &str) -> Option<&Lesson> {
        self.cells
            .get(&(weekday, slot_id.to_string()))
            .map(|&i| &self.lessons[i])
    }

    pub fn at(&self, cell: &Cell) -> Option<&Lesson> {
        self.lesson_at(cell.weekday, &cell.slot_id)
    }

    pub fn lesson(&self, id: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == id)
    }

    pub fn cell_of(&self, id: &str) -> Option<Cell> {
        self.lesson(id).map(|l| Cell::new(l.weekday, l.time_slot_id.clone()))
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
