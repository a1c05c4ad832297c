//! What the administrator is in the middle of doing on the grid.
//!
//! The machine is pure: it never talks to the store. A paste is reported
//! back as [`Transition::Paste`] and the caller settles it with
//! [`InteractionMachine::succeeded`] or by leaving the state alone.

use super::grid::{Cell, GridIndex, View};
use crate::api::{Lesson, RecordId};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    New,
    Existing(Lesson),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Copying(Lesson),
    Editing { target: EditTarget, cell: Cell },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ClickCell(Cell),
    Copy(RecordId),
    Edit(RecordId),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Changed,
    /// Create a copy of `source` at `target`; the state is still `Copying`
    Paste { source: Lesson, target: Cell },
}

static IDLE: InteractionState = InteractionState::Idle;

#[derive(Debug, Clone)]
pub struct InteractionMachine {
    state: InteractionState,
    session: Session,
}

impl InteractionMachine {
    pub fn new(session: Session) -> Self {
        Self {
            state: InteractionState::Idle,
            session,
        }
    }

    /// Current state. A session that has expired since the last intent reads as `Idle`.
    pub fn state(&self) -> &InteractionState {
        if self.session.is_admin() {
            &self.state
        } else {
            &IDLE
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_session(&mut self, session: Session) {
        if !session.is_admin() {
            self.reset();
        }
        self.session = session;
    }

    /// A copy or edit is in progress and would be lost by a reset
    pub fn is_pending(&self) -> bool {
        !matches!(self.state(), InteractionState::Idle)
    }

    pub fn reset(&mut self) {
        if self.is_pending() {
            tracing::debug!("interaction reset to idle");
        }
        self.state = InteractionState::Idle;
    }

    /// The mutation started by the current state went through
    pub fn succeeded(&mut self) {
        self.state = InteractionState::Idle;
    }

    pub fn handle(&mut self, intent: Intent, grid: &GridIndex, view: Option<&View>) -> Transition {
        if !self.session.is_admin() {
            if !matches!(self.state, InteractionState::Idle) {
                tracing::info!("session expired; interaction dropped");
                self.state = InteractionState::Idle;
            }
            return Transition::Ignored;
        }
        // Report views (by professor or room) are read-only
        let Some(View::Class(_)) = view else {
            return Transition::Ignored;
        };

        let next = match (&self.state, intent) {
            (InteractionState::Editing { .. }, Intent::Cancel) => InteractionState::Idle,
            // The form is modal while editing
            (InteractionState::Editing { .. }, _) => return Transition::Ignored,

            (InteractionState::Copying(_), Intent::Cancel) => InteractionState::Idle,
            (InteractionState::Idle, Intent::Cancel) => return Transition::Ignored,

            (state, Intent::ClickCell(cell)) => {
                if grid.at(&cell).is_some() {
                    return Transition::Ignored;
                }
                match state {
                    InteractionState::Copying(source) => {
                        return Transition::Paste {
                            source: source.clone(),
                            target: cell,
                        };
                    }
                    _ => InteractionState::Editing {
                        target: EditTarget::New,
                        cell,
                    },
                }
            }

            (_, Intent::Copy(id)) => match grid.lesson(&id) {
                Some(lesson) => InteractionState::Copying(lesson.clone()),
                None => return Transition::Ignored,
            },

            (_, Intent::Edit(id)) => match (grid.lesson(&id), grid.cell_of(&id)) {
                (Some(lesson), Some(cell)) => InteractionState::Editing {
                    target: EditTarget::Existing(lesson.clone()),
                    cell,
                },
                _ => return Transition::Ignored,
            },
        };

        tracing::debug!(from = ?state_name(&self.state), to = ?state_name(&next), "interaction");
        self.state = next;
        Transition::Changed
    }
}

fn state_name(state: &InteractionState) -> &'static str {
    match state {
        InteractionState::Idle => "idle",
        InteractionState::Copying(_) => "copying",
        InteractionState::Editing { target: EditTarget::New, .. } => "creating",
        InteractionState::Editing { .. } => "editing",
    }
}
