//! `GridIndex` lookups over a fetched lesson list.

use timetable::api::Weekday;
use timetable::schedule::{Cell, GridIndex, View, ViewKind};

mod common;

use common::lesson;

// ---------------------------------------------------------------------------
// Cell lookups
// ---------------------------------------------------------------------------

/// Every lesson lands in its own (weekday, slot) cell; empty cells answer `None`.
#[test]
fn lessons_are_indexed_by_cell() {
    let grid = GridIndex::build(vec![
        lesson("l1", "Segunda", "s1", "c1"),
        lesson("l2", "Terça", "s2", "c1"),
        lesson("l3", "Sexta", "s1", "c1"),
    ]);

    assert_eq!(grid.len(), 3);
    assert_eq!(grid.lesson_at(Weekday::Monday, "s1").map(|l| l.id.as_str()), Some("l1"));
    assert_eq!(grid.lesson_at(Weekday::Tuesday, "s2").map(|l| l.id.as_str()), Some("l2"));
    assert_eq!(grid.at(&Cell::new(Weekday::Friday, "s1")).map(|l| l.id.as_str()), Some("l3"));

    assert!(grid.lesson_at(Weekday::Monday, "s2").is_none());
    assert!(grid.lesson_at(Weekday::Wednesday, "s1").is_none());
    assert!(grid.lesson_at(Weekday::Monday, "unknown-slot").is_none());
}

/// When two lessons share a cell the first one fetched is shown.
#[test]
fn first_lesson_wins_a_shared_cell() {
    let grid = GridIndex::build(vec![
        lesson("first", "Quarta", "s3", "c1"),
        lesson("second", "Quarta", "s3", "c1"),
    ]);

    assert_eq!(grid.lesson_at(Weekday::Wednesday, "s3").map(|l| l.id.as_str()), Some("first"));
    // The hidden lesson is still part of the fetched list
    assert_eq!(grid.len(), 2);
    assert!(grid.lesson("second").is_some());
}

/// `cell_of` finds where a lesson sits by id.
#[test]
fn cell_of_locates_lesson_by_id() {
    let grid = GridIndex::build(vec![lesson("l7", "Quinta", "s4", "c2")]);

    assert_eq!(grid.cell_of("l7"), Some(Cell::new(Weekday::Thursday, "s4")));
    assert_eq!(grid.cell_of("missing"), None);
}

/// An empty fetch yields an empty grid.
#[test]
fn empty_fetch_builds_empty_grid() {
    let grid = GridIndex::build(Vec::new());

    assert!(grid.is_empty());
    assert!(grid.lessons().is_empty());
    assert!(grid.lesson_at(Weekday::Monday, "s1").is_none());
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Each view filters lessons on its own column; only class views carry a class id.
#[test]
fn views_filter_on_their_own_column() {
    let class = View::new(ViewKind::Class, "c1");
    let professor = View::new(ViewKind::Professor, "p1");
    let room = View::new(ViewKind::Room, "r1");

    assert_eq!(class.filter_column(), "turma_id");
    assert_eq!(professor.filter_column(), "professor_id");
    assert_eq!(room.filter_column(), "sala_id");

    assert_eq!(class.class_id(), Some("c1"));
    assert_eq!(professor.class_id(), None);
    assert_eq!(room.kind(), ViewKind::Room);
    assert_eq!(room.id(), "r1");
}
