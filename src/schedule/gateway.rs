//! The single path every lesson create/update/delete goes through.
//!
//! Nothing here touches local grid state: callers reload after a success,
//! and a failure leaves what the user sees exactly as it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::remote;
use crate::api::{to_record, ConflictCandidate, Entity, Lesson, LessonFields, NewLesson, RecordStore};
use crate::error::{AppError, AppResult};

/// Where a new lesson came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonOrigin {
    Copy,
    Form,
}

/// Answer of the yes/no gate in front of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Which writes ask the backend for conflicts first. Pasted copies always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPolicy {
    pub check_form_creates: bool,
    pub check_updates: bool,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            check_form_creates: true,
            check_updates: false,
        }
    }
}

pub struct MutationGateway<S: RecordStore + ?Sized> {
    store: Arc<S>,
    timeout: Duration,
    policy: ConflictPolicy,
    in_flight: Arc<AtomicBool>,
}

/// Holds the in-flight flag; released on drop, whatever the outcome
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: RecordStore + ?Sized> MutationGateway<S> {
    pub fn new(store: Arc<S>, timeout: Duration, policy: ConflictPolicy) -> Self {
        Self {
            store,
            timeout,
            policy,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> AppResult<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(self.in_flight.clone()))
            .map_err(|_| AppError::Busy)
    }

    /// Fails with the first clash the backend reports for `candidate`
    async fn ensure_no_conflict(&self, candidate: &ConflictCandidate) -> AppResult<()> {
        let conflicts = remote(self.timeout, self.store.check_conflict(candidate)).await?;
        match conflicts.into_iter().next() {
            Some(first) => {
                tracing::info!(
                    weekday = %candidate.weekday,
                    slot = %candidate.time_slot_id,
                    reason = %first.description,
                    "write refused: conflict"
                );
                Err(AppError::Conflict(first.description))
            }
            None => Ok(()),
        }
    }

    pub async fn create(&self, lesson: &NewLesson, origin: LessonOrigin) -> AppResult<()> {
        let _guard = self.begin()?;

        if origin == LessonOrigin::Copy || self.policy.check_form_creates {
            self.ensure_no_conflict(&lesson.candidate()).await?;
        }

        let record = to_record(lesson)?;
        remote(self.timeout, self.store.insert(Entity::Lessons, record)).await?;
        tracing::info!(
            weekday = %lesson.weekday,
            slot = %lesson.time_slot_id,
            class = %lesson.class_id,
            ?origin,
            "lesson created"
        );
        Ok(())
    }

    pub async fn update(&self, lesson: &Lesson, fields: &LessonFields) -> AppResult<()> {
        let _guard = self.begin()?;

        if self.policy.check_updates {
            let candidate = ConflictCandidate {
                weekday: lesson.weekday,
                time_slot_id: lesson.time_slot_id.clone(),
                professor_id: fields.professor_id.clone(),
                room_id: fields.room_id.clone(),
                class_id: lesson.class_id.clone(),
            };
            self.ensure_no_conflict(&candidate).await?;
        }

        let record = to_record(fields)?;
        remote(self.timeout, self.store.update(Entity::Lessons, &lesson.id, record)).await?;
        tracing::info!(lesson = %lesson.id, "lesson updated");
        Ok(())
    }

    pub async fn delete(&self, lesson_id: &str, confirmation: Confirmation) -> AppResult<DeleteOutcome> {
        if confirmation == Confirmation::No {
            return Ok(DeleteOutcome::Cancelled);
        }
        let _guard = self.begin()?;

        remote(self.timeout, self.store.delete(Entity::Lessons, lesson_id)).await?;
        tracing::info!(lesson = %lesson_id, "lesson deleted");
        Ok(DeleteOutcome::Deleted)
    }
}
