use std::sync::Arc;
use std::time::Duration;

use super::conflicts::ConflictOverlay;
use super::gateway::{Confirmation, ConflictPolicy, DeleteOutcome, LessonOrigin, MutationGateway};
use super::grid::{Cell, GridIndex, View};
use super::interaction::{EditTarget, Intent, InteractionMachine, InteractionState, Transition};
use super::reference::ReferenceData;
use super::registry::{self, RegistryEntry, RegistryKind, RegistryRecord};
use super::remote;
use crate::api::{fetch_all, Entity, Lesson, LessonFields, NewLesson, RecordId, RecordStore, Select};
use crate::error::{AppError, AppResult};
use crate::session::{self, AdminSecret, Session};

#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub timeout: Duration,
    pub policy: ConflictPolicy,
    pub session_ttl: chrono::Duration,
    pub admin_secret: Option<AdminSecret>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            policy: ConflictPolicy::default(),
            session_ttl: chrono::Duration::hours(8),
            admin_secret: None,
        }
    }
}

/// Values picked in the lesson form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonDraft {
    pub discipline_id: RecordId,
    pub professor_id: RecordId,
    pub room_id: RecordId,
}

impl LessonDraft {
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            discipline_id: lesson.discipline_id.clone(),
            professor_id: lesson.professor_id.clone(),
            room_id: lesson.room_id.clone(),
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.discipline_id.trim().is_empty()
            || self.professor_id.trim().is_empty()
            || self.room_id.trim().is_empty()
        {
            return Err(AppError::Validation(
                "Choose a discipline, a professor and a room.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Ignored,
    StateChanged,
    Pasted,
}

/// Everything the grid screen renders, detached from the editor
#[derive(Debug, Clone, Default)]
pub struct EditorSnapshot {
    pub reference: ReferenceData,
    pub view: Option<View>,
    pub grid: GridIndex,
    pub conflicts: ConflictOverlay,
    pub state: InteractionState,
    pub session: Session,
    /// A write went through but the grid could not be reloaded afterwards
    pub grid_stale: bool,
}

impl EditorSnapshot {
    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }
}

pub struct TimetableEditor<S: RecordStore + ?Sized> {
    store: Arc<S>,
    gateway: MutationGateway<S>,
    options: EditorOptions,
    reference: ReferenceData,
    view: Option<View>,
    grid: GridIndex,
    overlay: ConflictOverlay,
    machine: InteractionMachine,
    grid_stale: bool,
}

impl<S: RecordStore + ?Sized> TimetableEditor<S> {
    pub fn new(store: Arc<S>, session: Session, options: EditorOptions) -> Self {
        Self {
            gateway: MutationGateway::new(store.clone(), options.timeout, options.policy),
            store,
            options,
            reference: ReferenceData::default(),
            view: None,
            grid: GridIndex::default(),
            overlay: ConflictOverlay::new(),
            machine: InteractionMachine::new(session),
            grid_stale: false,
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn conflicts(&self) -> &ConflictOverlay {
        &self.overlay
    }

    pub fn state(&self) -> &InteractionState {
        self.machine.state()
    }

    pub fn session(&self) -> &Session {
        self.machine.session()
    }

    /// A copy or edit would be discarded by changing the selection
    pub fn is_grid_stale(&self) -> bool {
        self.grid_stale
    }

    pub fn has_pending_interaction(&self) -> bool {
        self.machine.is_pending()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            reference: self.reference.clone(),
            view: self.view.clone(),
            grid: self.grid.clone(),
            conflicts: self.overlay.clone(),
            state: self.machine.state().clone(),
            session: self.machine.session().clone(),
            grid_stale: self.grid_stale,
        }
    }

    pub async fn load_reference(&mut self) {
        self.reference = ReferenceData::load_all(self.store.as_ref(), self.options.timeout).await;
    }

    /// Switch to another class/professor/room. Any copy or edit in progress is dropped.
    pub async fn select_view(&mut self, view: Option<View>) -> AppResult<()> {
        self.machine.reset();
        self.overlay.clear();
        self.grid = GridIndex::default();
        self.grid_stale = false;
        self.view = view;
        self.reload().await
    }

    /// Reload the lessons of the active view, then its conflicts
    pub async fn reload(&mut self) -> AppResult<()> {
        let Some(view) = self.view.clone() else {
            return Ok(());
        };

        let query = Select::where_eq(Entity::Lessons, view.filter_column(), view.id());
        let lessons: Vec<Lesson> = remote(
            self.options.timeout,
            fetch_all::<Lesson, S>(self.store.as_ref(), &query),
        )
        .await?;
        tracing::info!(view = ?view, lessons = lessons.len(), "grid loaded");

        self.grid = GridIndex::build(lessons);
        self.grid_stale = false;
        self.overlay
            .refresh(self.store.as_ref(), &view, self.options.timeout)
            .await;
        Ok(())
    }

    /// Settle a successful mutation: back to idle, then show the store's new state
    async fn after_mutation(&mut self) {
        self.machine.succeeded();
        self.refresh_after_write().await;
    }

    /// The write itself stands; a failed reload only marks the grid stale
    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "saved, but the grid could not be reloaded");
            self.grid_stale = true;
        }
    }

    fn require_admin(&self) -> AppResult<()> {
        if self.machine.session().is_admin() {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }

    pub async fn click_cell(&mut self, cell: Cell) -> AppResult<ClickOutcome> {
        match self.machine.handle(Intent::ClickCell(cell), &self.grid, self.view.as_ref()) {
            Transition::Ignored => Ok(ClickOutcome::Ignored),
            Transition::Changed => Ok(ClickOutcome::StateChanged),
            Transition::Paste { source, target } => {
                let class_id = self
                    .view
                    .as_ref()
                    .and_then(View::class_id)
                    .ok_or(AppError::Unauthorized)?
                    .to_string();
                let lesson = NewLesson {
                    weekday: target.weekday,
                    time_slot_id: target.slot_id,
                    class_id,
                    professor_id: source.professor_id,
                    room_id: source.room_id,
                    discipline_id: source.discipline_id,
                };
                // On failure the machine stays in Copying so another cell can be tried
                self.gateway.create(&lesson, LessonOrigin::Copy).await?;
                self.after_mutation().await;
                Ok(ClickOutcome::Pasted)
            }
        }
    }

    pub fn copy(&mut self, lesson_id: &str) -> bool {
        self.machine.handle(Intent::Copy(lesson_id.to_string()), &self.grid, self.view.as_ref())
            == Transition::Changed
    }

    pub fn edit(&mut self, lesson_id: &str) -> bool {
        self.machine.handle(Intent::Edit(lesson_id.to_string()), &self.grid, self.view.as_ref())
            == Transition::Changed
    }

    pub fn cancel(&mut self) -> bool {
        self.machine.handle(Intent::Cancel, &self.grid, self.view.as_ref()) == Transition::Changed
    }

    /// Save the lesson form opened by a click on an empty cell or an edit
    pub async fn submit(&mut self, draft: LessonDraft) -> AppResult<()> {
        self.require_admin()?;
        let InteractionState::Editing { target, cell } = self.machine.state().clone() else {
            return Err(AppError::Validation("No lesson is being edited.".to_string()));
        };
        draft.validate()?;

        match target {
            EditTarget::New => {
                let class_id = self
                    .view
                    .as_ref()
                    .and_then(View::class_id)
                    .ok_or_else(|| AppError::Validation("Select a class first.".to_string()))?
                    .to_string();
                let lesson = NewLesson {
                    weekday: cell.weekday,
                    time_slot_id: cell.slot_id,
                    class_id,
                    professor_id: draft.professor_id,
                    room_id: draft.room_id,
                    discipline_id: draft.discipline_id,
                };
                self.gateway.create(&lesson, LessonOrigin::Form).await?;
            }
            EditTarget::Existing(lesson) => {
                let fields = LessonFields {
                    professor_id: draft.professor_id,
                    room_id: draft.room_id,
                    discipline_id: draft.discipline_id,
                };
                self.gateway.update(&lesson, &fields).await?;
            }
        }

        self.after_mutation().await;
        Ok(())
    }

    pub async fn delete_lesson(&mut self, lesson_id: &str, confirmation: Confirmation) -> AppResult<DeleteOutcome> {
        self.require_admin()?;
        let outcome = self.gateway.delete(lesson_id, confirmation).await?;
        if outcome == DeleteOutcome::Deleted {
            self.after_mutation().await;
        }
        Ok(outcome)
    }

    pub fn login(&mut self, password: &str) -> AppResult<Session> {
        let session = session::login(password, self.options.admin_secret.as_ref(), self.options.session_ttl)?;
        self.machine.set_session(session.clone());
        Ok(session)
    }

    pub fn logout(&mut self) {
        tracing::info!("administrator logged out");
        self.machine.reset();
        self.machine.set_session(Session::viewer());
    }

    pub async fn registry_list(&self, kind: RegistryKind) -> AppResult<Vec<RegistryEntry>> {
        registry::list(self.store.as_ref(), kind, self.options.timeout).await
    }

    pub async fn registry_create(&mut self, record: &RegistryRecord) -> AppResult<()> {
        self.require_admin()?;
        registry::create(self.store.as_ref(), record, self.options.timeout).await?;
        self.after_registry_change().await;
        Ok(())
    }

    pub async fn registry_update(&mut self, id: &str, record: &RegistryRecord) -> AppResult<()> {
        self.require_admin()?;
        registry::update(self.store.as_ref(), id, record, self.options.timeout).await?;
        self.after_registry_change().await;
        Ok(())
    }

    pub async fn registry_delete(
        &mut self,
        kind: RegistryKind,
        id: &str,
        confirmation: Confirmation,
    ) -> AppResult<DeleteOutcome> {
        self.require_admin()?;
        let outcome = registry::delete(self.store.as_ref(), kind, id, confirmation, self.options.timeout).await?;
        if outcome == DeleteOutcome::Deleted {
            self.after_registry_change().await;
        }
        Ok(outcome)
    }

    /// Lessons embed registry names, so the grid is reloaded along with the lists
    async fn after_registry_change(&mut self) {
        self.load_reference().await;
        self.refresh_after_write().await;
    }
}
