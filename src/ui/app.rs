use eframe::egui;
use egui::{Color32, RichText};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use crate::api::{Lesson, MemoryStore, RecordStore, SupabaseClient};
use crate::config::Config;
use crate::error::AppError;
use crate::schedule::{
    Cell, ClickOutcome, Confirmation, EditTarget, EditorOptions, EditorSnapshot, InteractionState, LessonDraft,
    RegistryEntry, RegistryKind, RegistryRecord, TimetableEditor, View, ViewKind,
};
use crate::session::{AdminSecret, SessionStore};
use super::theme::{conflict_color, dialog_frame, success_color};
use super::views::{self, GridAction, RegistryAction, Selection};

type SharedEditor = Arc<tokio::sync::Mutex<TimetableEditor<dyn RecordStore>>>;

/// Accepted in the offline demo when no administrator secret is configured
const DEMO_PASSWORD: &str = "admin";

pub struct TimetableApp {
    config: Config,
    screen: Screen,
    demo: bool,

    editor: Option<SharedEditor>,
    snapshot: EditorSnapshot,
    sessions: Option<SessionStore>,
    view_kind: ViewKind,

    // Selection change waiting for the discard confirmation
    pending_selection: Option<Selection>,

    // Lesson form, keyed by the cell and lesson it was opened for
    form_draft: LessonDraft,
    form_key: Option<(Cell, Option<String>)>,
    pending_delete: Option<Lesson>,

    show_login: bool,
    login_password: String,
    login_error: bool,

    // Registry screen
    registry_kind: RegistryKind,
    registry_entries: Vec<RegistryEntry>,
    registry_requested: Option<RegistryKind>,
    registry_primary: String,
    registry_extra: String,
    registry_editing: Option<String>,
    registry_pending_delete: Option<RegistryEntry>,

    // Settings dialog and setup screen
    show_settings: bool,
    settings_draft: Config,
    settings_key: String,

    // Status
    status_message: Option<(String, bool)>, // (message, is_error)
    busy: bool,

    // Async communication
    ctx: egui::Context,
    runtime: tokio::runtime::Runtime,
    result_rx: Receiver<AsyncResult>,
    result_tx: Sender<AsyncResult>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Setup,
    Grid,
    Registry,
}

/// One user action, run against the editor on the runtime
enum Command {
    LoadReference,
    SelectView(Option<View>),
    Reload,
    ClickCell(Cell),
    Copy(String),
    Edit(String),
    Cancel,
    Submit(LessonDraft),
    DeleteLesson(String),
    Login(String),
    Logout,
    RegistryList(RegistryKind),
    RegistrySave { id: Option<String>, record: RegistryRecord },
    RegistryDelete(RegistryKind, String),
}

struct RegistryUpdate {
    kind: RegistryKind,
    entries: Vec<RegistryEntry>,
    changed: bool,
}

enum AsyncResult {
    Updated {
        snapshot: EditorSnapshot,
        registry: Option<RegistryUpdate>,
        notice: Option<String>,
    },
    Failed {
        snapshot: EditorSnapshot,
        error: AppError,
    },
}

fn describe(error: &AppError) -> String {
    match error {
        AppError::Conflict(description) => format!("Conflict: {}", description),
        AppError::Backend(message) => format!("Error: {}", message),
        other => other.to_string(),
    }
}

async fn execute(
    editor: &mut TimetableEditor<dyn RecordStore>,
    command: Command,
    sessions: Option<&SessionStore>,
) -> AsyncResult {
    let mut registry = None;

    let result: Result<Option<String>, AppError> = match command {
        Command::LoadReference => {
            editor.load_reference().await;
            Ok(None)
        }
        Command::SelectView(view) => editor.select_view(view).await.map(|()| None),
        Command::Reload => {
            editor.load_reference().await;
            editor.reload().await.map(|()| None)
        }
        Command::ClickCell(cell) => editor
            .click_cell(cell)
            .await
            .map(|outcome| (outcome == ClickOutcome::Pasted).then(|| "Lesson copied.".to_string())),
        Command::Copy(id) => {
            editor.copy(&id);
            Ok(None)
        }
        Command::Edit(id) => {
            editor.edit(&id);
            Ok(None)
        }
        Command::Cancel => {
            editor.cancel();
            Ok(None)
        }
        Command::Submit(draft) => editor.submit(draft).await.map(|()| Some("Lesson saved.".to_string())),
        Command::DeleteLesson(id) => editor
            .delete_lesson(&id, Confirmation::Yes)
            .await
            .map(|_| Some("Lesson deleted.".to_string())),
        Command::Login(password) => editor.login(&password).map(|session| {
            if let Some(store) = sessions {
                if let Err(e) = store.save(&session) {
                    tracing::warn!(error = %e, "could not save session");
                }
            }
            Some("Logged in as administrator.".to_string())
        }),
        Command::Logout => {
            editor.logout();
            if let Some(store) = sessions {
                store.clear();
            }
            Ok(None)
        }
        Command::RegistryList(kind) => editor.registry_list(kind).await.map(|entries| {
            registry = Some(RegistryUpdate { kind, entries, changed: false });
            None
        }),
        Command::RegistrySave { id, record } => {
            let kind = record.kind();
            let saved = match &id {
                Some(id) => editor.registry_update(id, &record).await,
                None => editor.registry_create(&record).await,
            };
            match saved {
                Ok(()) => {
                    registry = relist(editor, kind).await;
                    Ok(Some("Saved.".to_string()))
                }
                Err(e) => Err(e),
            }
        }
        Command::RegistryDelete(kind, id) => match editor.registry_delete(kind, &id, Confirmation::Yes).await {
            Ok(_) => {
                registry = relist(editor, kind).await;
                Ok(Some("Deleted.".to_string()))
            }
            Err(e) => Err(e),
        },
    };

    let snapshot = editor.snapshot();
    match result {
        Ok(notice) => AsyncResult::Updated { snapshot, registry, notice },
        Err(error) => AsyncResult::Failed { snapshot, error },
    }
}

/// The registry list after a change; a failed re-list keeps the old one on screen
async fn relist(editor: &TimetableEditor<dyn RecordStore>, kind: RegistryKind) -> Option<RegistryUpdate> {
    match editor.registry_list(kind).await {
        Ok(entries) => Some(RegistryUpdate { kind, entries, changed: true }),
        Err(e) => {
            tracing::warn!(error = %e, "registry saved, but the list could not be reloaded");
            None
        }
    }
}

impl TimetableApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load config; using defaults");
            Config::default()
        });
        super::setup_fonts(&cc.egui_ctx);
        super::setup_theme(&cc.egui_ctx);

        let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
        let (result_tx, result_rx) = channel();

        let sessions = SessionStore::default_location()
            .map_err(|e| tracing::warn!(error = %e, "sessions will not be remembered"))
            .ok();

        let mut app = Self {
            settings_draft: config.clone(),
            settings_key: config.anon_key.clone().unwrap_or_default(),
            config,
            screen: Screen::Setup,
            demo: false,
            editor: None,
            snapshot: EditorSnapshot::default(),
            sessions,
            view_kind: ViewKind::Class,
            pending_selection: None,
            form_draft: LessonDraft::default(),
            form_key: None,
            pending_delete: None,
            show_login: false,
            login_password: String::new(),
            login_error: false,
            registry_kind: RegistryKind::Professors,
            registry_entries: Vec::new(),
            registry_requested: None,
            registry_primary: String::new(),
            registry_extra: String::new(),
            registry_editing: None,
            registry_pending_delete: None,
            show_settings: false,
            status_message: None,
            busy: false,
            ctx: cc.egui_ctx.clone(),
            runtime,
            result_rx,
            result_tx,
        };

        if app.config.is_configured() {
            app.connect();
        }

        app
    }

    fn editor_options(&self, admin_secret: Option<AdminSecret>) -> EditorOptions {
        EditorOptions {
            timeout: self.config.request_timeout(),
            policy: self.config.conflict_policy(),
            session_ttl: self.config.session_ttl(),
            admin_secret,
        }
    }

    fn connect(&mut self) {
        match SupabaseClient::new(&self.config) {
            Ok(client) => {
                let store: Arc<dyn RecordStore> = Arc::new(client);
                let options = self.editor_options(self.config.admin_secret());
                self.open_editor(store, options, false);
            }
            Err(e) => {
                self.screen = Screen::Setup;
                self.status_message = Some((format!("Could not connect: {:#}", e), true));
            }
        }
    }

    fn start_demo(&mut self) {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::demo());
        let secret = self
            .config
            .admin_secret()
            .unwrap_or_else(|| AdminSecret::Plain(DEMO_PASSWORD.to_string()));
        let options = self.editor_options(Some(secret));
        self.open_editor(store, options, true);
    }

    fn open_editor(&mut self, store: Arc<dyn RecordStore>, options: EditorOptions, demo: bool) {
        let session = match (&self.sessions, demo) {
            (Some(sessions), false) => sessions.load(),
            _ => Default::default(),
        };
        let editor = TimetableEditor::new(store, session, options);

        self.snapshot = editor.snapshot();
        self.editor = Some(Arc::new(tokio::sync::Mutex::new(editor)));
        self.demo = demo;
        self.busy = false;
        self.form_key = None;
        self.pending_selection = None;
        self.registry_requested = None;
        self.screen = Screen::Grid;
        tracing::info!(demo, "editor opened");
        self.run(Command::LoadReference);
    }

    /// Start `command` unless another one is still running. Returns whether it started.
    fn run(&mut self, command: Command) -> bool {
        let Some(editor) = self.editor.clone() else {
            return false;
        };
        let Ok(mut guard) = editor.try_lock_owned() else {
            tracing::debug!("editor busy; action dropped");
            return false;
        };

        self.busy = true;
        let tx = self.result_tx.clone();
        let ctx = self.ctx.clone();
        let sessions = if self.demo { None } else { self.sessions.clone() };

        self.runtime.spawn(async move {
            let result = execute(&mut guard, command, sessions.as_ref()).await;
            drop(guard);
            let _ = tx.send(result);
            ctx.request_repaint();
        });
        true
    }

    fn check_async_results(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            self.busy = false;
            match result {
                AsyncResult::Updated { snapshot, registry, notice } => {
                    self.apply_snapshot(snapshot);
                    if let Some(update) = registry {
                        self.apply_registry(update);
                    }
                    if self.show_login && self.snapshot.is_admin() {
                        self.show_login = false;
                        self.login_password.clear();
                        self.login_error = false;
                    }
                    if let Some(notice) = notice {
                        self.status_message = Some(if self.snapshot.grid_stale {
                            (format!("{} The timetable could not be refreshed; press reload.", notice), true)
                        } else {
                            (notice, false)
                        });
                    }
                }
                AsyncResult::Failed { snapshot, error } => {
                    self.apply_snapshot(snapshot);
                    if self.show_login && error == AppError::Unauthorized {
                        self.login_error = true;
                        self.login_password.clear();
                    } else {
                        self.status_message = Some((describe(&error), true));
                    }
                }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: EditorSnapshot) {
        match &snapshot.state {
            InteractionState::Editing { target, cell } => {
                let lesson_id = match target {
                    EditTarget::Existing(lesson) => Some(lesson.id.clone()),
                    EditTarget::New => None,
                };
                let key = (cell.clone(), lesson_id);
                if self.form_key.as_ref() != Some(&key) {
                    self.form_draft = match target {
                        EditTarget::Existing(lesson) => LessonDraft::from_lesson(lesson),
                        EditTarget::New => LessonDraft::default(),
                    };
                    self.form_key = Some(key);
                }
            }
            _ => self.form_key = None,
        }

        if let Some(view) = &snapshot.view {
            self.view_kind = view.kind();
        }
        self.snapshot = snapshot;
    }

    fn apply_registry(&mut self, update: RegistryUpdate) {
        if update.kind != self.registry_kind {
            return;
        }
        self.registry_entries = update.entries;
        if update.changed {
            self.clear_registry_form();
        }
    }

    fn clear_registry_form(&mut self) {
        self.registry_primary.clear();
        self.registry_extra.clear();
        self.registry_editing = None;
    }

    fn request_selection(&mut self, selection: Selection) {
        let pending = !matches!(self.snapshot.state, InteractionState::Idle);
        if pending && self.config.confirm_discard {
            self.pending_selection = Some(selection);
        } else {
            self.apply_selection(selection);
        }
    }

    fn apply_selection(&mut self, selection: Selection) {
        if self.run(Command::SelectView(selection.view)) {
            self.view_kind = selection.kind;
        }
    }

    fn open_registry(&mut self) {
        self.screen = Screen::Registry;
        self.registry_requested = None;
    }

    fn select_registry_kind(&mut self, kind: RegistryKind) {
        if kind == self.registry_kind {
            return;
        }
        self.registry_kind = kind;
        self.registry_entries.clear();
        self.registry_requested = None;
        self.registry_pending_delete = None;
        self.clear_registry_form();
    }

    fn open_settings(&mut self) {
        self.settings_draft = self.config.clone();
        self.settings_key = self.config.anon_key.clone().unwrap_or_default();
        self.show_settings = true;
    }

    fn save_settings(&mut self) {
        let mut config = self.settings_draft.clone();
        config.supabase_url = config.supabase_url.trim().to_string();
        let key = self.settings_key.trim();
        config.anon_key = (!key.is_empty()).then(|| key.to_string());
        // The plain secret lives only in the environment
        config.admin_password = self.config.admin_password.clone();

        let backend_changed = config.supabase_url != self.config.supabase_url || config.anon_key != self.config.anon_key;
        let policy_changed = config.conflict_policy() != self.config.conflict_policy()
            || config.request_timeout_secs != self.config.request_timeout_secs;
        self.config = config;

        if let Err(e) = self.config.save() {
            self.status_message = Some((format!("Failed to save: {:#}", e), true));
            return;
        }
        self.show_settings = false;

        if self.config.is_configured() && (backend_changed || policy_changed || self.editor.is_none() || self.demo) {
            self.connect();
        }
    }

    fn render_settings_fields(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("settings_grid")
            .num_columns(2)
            .spacing([20.0, 10.0])
            .show(ui, |ui| {
                ui.label("Supabase URL:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_draft.supabase_url)
                        .hint_text("https://project.supabase.co")
                        .desired_width(380.0),
                );
                ui.end_row();

                ui.label("Anon key:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_key)
                        .password(true)
                        .hint_text("Paste the project's anon key")
                        .desired_width(380.0),
                );
                ui.end_row();

                ui.label("Timeout (seconds):");
                ui.add(egui::DragValue::new(&mut self.settings_draft.request_timeout_secs).range(1..=120));
                ui.end_row();

                ui.label("Conflict checks:");
                ui.vertical(|ui| {
                    ui.checkbox(
                        &mut self.settings_draft.check_conflicts_on_form_create,
                        "Before creating a lesson from the form",
                    );
                    ui.checkbox(&mut self.settings_draft.check_conflicts_on_update, "Before updating a lesson");
                });
                ui.end_row();

                ui.label("Selection:");
                ui.checkbox(
                    &mut self.settings_draft.confirm_discard,
                    "Ask before discarding a copy or edit in progress",
                );
                ui.end_row();

                ui.label("Zoom:");
                ui.add(egui::Slider::new(&mut self.settings_draft.font_scale, 0.75..=2.0));
                ui.end_row();
            });
    }

    fn render_setup(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Timetable setup");
            ui.add_space(12.0);
            ui.label("Connect to the school's Supabase project, or look around with sample data.");
            ui.add_space(20.0);
        });

        self.render_settings_fields(ui);
        ui.add_space(20.0);

        let mut connect = false;
        let mut demo = false;
        ui.horizontal(|ui| {
            if ui.button(format!("{}  Save and connect", egui_phosphor::regular::PLUGS_CONNECTED)).clicked() {
                connect = true;
            }
            if ui.button(format!("{}  Offline demo", egui_phosphor::regular::FLASK)).clicked() {
                demo = true;
            }
        });

        if connect {
            self.save_settings();
        }
        if demo {
            self.start_demo();
        }
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui, title: &str) {
        let mut login = false;
        let mut logout = false;
        let mut reload = false;
        let mut settings = false;
        let mut switch_screen = None;
        let is_admin = self.snapshot.is_admin();

        ui.horizontal(|ui| {
            ui.heading(title);
            if self.demo {
                ui.label(RichText::new("offline demo").weak());
            }
            if self.busy {
                ui.spinner();
                ui.label(RichText::new("Saving...").weak());
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if is_admin {
                    if ui.button(format!("{}  Log out", egui_phosphor::regular::SIGN_OUT)).clicked() {
                        logout = true;
                    }
                } else if ui.button(format!("{}  Administrator", egui_phosphor::regular::SIGN_IN)).clicked() {
                    login = true;
                }

                if ui.button(egui_phosphor::regular::GEAR).on_hover_text("Settings").clicked() {
                    settings = true;
                }
                if ui.button(egui_phosphor::regular::ARROWS_CLOCKWISE).on_hover_text("Reload").clicked() {
                    reload = true;
                }

                match self.screen {
                    Screen::Grid => {
                        if ui.button(format!("{}  Registry", egui_phosphor::regular::LIST_BULLETS)).clicked() {
                            switch_screen = Some(Screen::Registry);
                        }
                    }
                    _ => {
                        if ui.button(format!("{}  Timetable", egui_phosphor::regular::CALENDAR)).clicked() {
                            switch_screen = Some(Screen::Grid);
                        }
                    }
                }
            });
        });

        if login {
            self.show_login = true;
            self.login_error = false;
        }
        if logout {
            self.run(Command::Logout);
        }
        if settings {
            self.open_settings();
        }
        if reload {
            if self.screen == Screen::Registry {
                self.registry_requested = None;
            }
            self.run(Command::Reload);
        }
        match switch_screen {
            Some(Screen::Registry) => self.open_registry(),
            Some(screen) => self.screen = screen,
            None => {}
        }
    }

    fn render_grid_screen(&mut self, ui: &mut egui::Ui) {
        self.render_toolbar(ui, "Timetable");
        ui.add_space(8.0);

        if let Some(selection) =
            views::render_selectors(ui, &self.snapshot.reference, self.view_kind, self.snapshot.view.as_ref())
        {
            self.request_selection(selection);
        }
        ui.add_space(8.0);

        let mut cancel = false;
        if let InteractionState::Copying(source) = &self.snapshot.state {
            egui::Frame::none()
                .fill(Color32::from_rgb(14, 52, 84))
                .rounding(egui::Rounding::same(6.0))
                .inner_margin(egui::Margin::same(8.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(egui_phosphor::regular::COPY).color(Color32::WHITE));
                        ui.label(format!(
                            "Copying {} with {}. Click an empty cell to paste it.",
                            source.discipline_name(),
                            source.professor_name()
                        ));
                        if ui.button("Cancel").clicked() {
                            cancel = true;
                        }
                    });
                });
            ui.add_space(8.0);
        }
        if cancel {
            self.run(Command::Cancel);
        }

        if let Some(action) = views::render_grid(ui, &self.snapshot) {
            match action {
                GridAction::ClickCell(cell) => {
                    self.run(Command::ClickCell(cell));
                }
                GridAction::Copy(id) => {
                    self.run(Command::Copy(id));
                }
                GridAction::Edit(id) => {
                    self.run(Command::Edit(id));
                }
                GridAction::Delete(lesson) => self.pending_delete = Some(lesson),
            }
        }
    }

    fn render_registry_screen(&mut self, ui: &mut egui::Ui) {
        self.render_toolbar(ui, "Registry");
        ui.add_space(8.0);

        let mut selected_kind = None;
        ui.horizontal(|ui| {
            for kind in RegistryKind::ALL {
                if ui.selectable_label(self.registry_kind == kind, kind.title()).clicked() {
                    selected_kind = Some(kind);
                }
            }
        });
        if let Some(kind) = selected_kind {
            self.select_registry_kind(kind);
        }

        if self.registry_requested != Some(self.registry_kind) && self.run(Command::RegistryList(self.registry_kind)) {
            self.registry_requested = Some(self.registry_kind);
        }

        ui.add_space(12.0);
        let is_admin = self.snapshot.is_admin();
        let kind = self.registry_kind;

        if is_admin {
            let mut save = false;
            let mut cancel_edit = false;
            egui::Grid::new("registry_form")
                .num_columns(2)
                .spacing([16.0, 8.0])
                .show(ui, |ui| {
                    ui.label(kind.primary_label());
                    let response = ui.add(egui::TextEdit::singleline(&mut self.registry_primary).desired_width(300.0));
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        save = true;
                    }
                    ui.end_row();

                    if let Some(extra_label) = kind.extra_label() {
                        ui.label(extra_label);
                        ui.add(egui::TextEdit::singleline(&mut self.registry_extra).desired_width(300.0));
                        ui.end_row();
                    }
                });

            ui.add_enabled_ui(!self.busy, |ui| {
                ui.horizontal(|ui| {
                    let label = if self.registry_editing.is_some() {
                        format!("{}  Save changes", egui_phosphor::regular::FLOPPY_DISK)
                    } else {
                        format!("{}  Add", egui_phosphor::regular::PLUS)
                    };
                    if ui.button(label).clicked() {
                        save = true;
                    }
                    if self.registry_editing.is_some() && ui.button("Cancel").clicked() {
                        cancel_edit = true;
                    }
                });
            });

            if save {
                let record = RegistryRecord::from_form(kind, &self.registry_primary, &self.registry_extra);
                match record.validate() {
                    Ok(()) => {
                        let id = self.registry_editing.clone();
                        self.run(Command::RegistrySave { id, record });
                    }
                    Err(e) => self.status_message = Some((describe(&e), true)),
                }
            }
            if cancel_edit {
                self.clear_registry_form();
            }
            ui.add_space(12.0);
            ui.separator();
        }

        match views::render_registry_list(ui, &self.registry_entries, is_admin) {
            Some(RegistryAction::Edit(entry)) => {
                self.registry_primary = entry.primary;
                self.registry_extra = entry.extra.unwrap_or_default();
                self.registry_editing = Some(entry.id);
            }
            Some(RegistryAction::Delete(entry)) => self.registry_pending_delete = Some(entry),
            None => {}
        }
    }

    fn render_lesson_form(&mut self, ctx: &egui::Context) {
        let InteractionState::Editing { target, cell } = &self.snapshot.state else {
            return;
        };
        let title = match target {
            EditTarget::New => "New lesson",
            EditTarget::Existing(_) => "Edit lesson",
        };
        let reference = &self.snapshot.reference;
        let slot_label = reference
            .time_slot(&cell.slot_id)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| cell.slot_id.clone());
        let disciplines: Vec<(String, String)> = reference
            .disciplines
            .iter()
            .map(|d| (d.id.clone(), d.name.clone()))
            .collect();
        let professors = reference.options_for(ViewKind::Professor);
        let rooms = reference.options_for(ViewKind::Room);

        let mut save = false;
        let mut cancel = false;
        let busy = self.busy;
        let draft = &mut self.form_draft;

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .default_width(480.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(dialog_frame())
            .show(ctx, |ui| {
                ui.label(RichText::new(format!("{}, {}", cell.weekday, slot_label)).weak());
                ui.add_space(10.0);

                egui::Grid::new("lesson_form")
                    .num_columns(2)
                    .spacing([12.0, 10.0])
                    .show(ui, |ui| {
                        choice_row(ui, "lesson_discipline", "Discipline", &mut draft.discipline_id, &disciplines);
                        choice_row(ui, "lesson_professor", "Professor", &mut draft.professor_id, &professors);
                        choice_row(ui, "lesson_room", "Room", &mut draft.room_id, &rooms);
                    });

                ui.add_space(16.0);
                ui.add_enabled_ui(!busy, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button(format!("{}  Save", egui_phosphor::regular::FLOPPY_DISK)).clicked() {
                            save = true;
                        }
                        if ui.button("Cancel").clicked() {
                            cancel = true;
                        }
                    });
                });
            });

        if save {
            let draft = self.form_draft.clone();
            self.run(Command::Submit(draft));
        }
        if cancel {
            self.run(Command::Cancel);
        }
    }

    fn render_confirmations(&mut self, ctx: &egui::Context) {
        if let Some(lesson) = self.pending_delete.clone() {
            let mut answer = None;
            egui::Window::new("Delete lesson")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .frame(dialog_frame())
                .show(ctx, |ui| {
                    ui.label("Delete this lesson?");
                    ui.add_space(6.0);
                    ui.label(RichText::new(lesson.discipline_name()).strong());
                    ui.label(format!("{} · {}", lesson.professor_name(), lesson.room_name()));
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        if ui.button(RichText::new("Delete").color(conflict_color())).clicked() {
                            answer = Some(Confirmation::Yes);
                        }
                        if ui.button("Cancel").clicked() {
                            answer = Some(Confirmation::No);
                        }
                    });
                });

            match answer {
                Some(Confirmation::Yes) => {
                    if self.run(Command::DeleteLesson(lesson.id)) {
                        self.pending_delete = None;
                    }
                }
                Some(Confirmation::No) => self.pending_delete = None,
                None => {}
            }
        }

        if let Some(entry) = self.registry_pending_delete.clone() {
            let mut answer = None;
            egui::Window::new(format!("Delete from {}", self.registry_kind.title()))
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .frame(dialog_frame())
                .show(ctx, |ui| {
                    ui.label(format!("Delete {}?", entry.primary));
                    ui.label(RichText::new("Entries still used by scheduled lessons cannot be deleted.").weak());
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        if ui.button(RichText::new("Delete").color(conflict_color())).clicked() {
                            answer = Some(Confirmation::Yes);
                        }
                        if ui.button("Cancel").clicked() {
                            answer = Some(Confirmation::No);
                        }
                    });
                });

            match answer {
                Some(Confirmation::Yes) => {
                    if self.run(Command::RegistryDelete(self.registry_kind, entry.id)) {
                        self.registry_pending_delete = None;
                    }
                }
                Some(Confirmation::No) => self.registry_pending_delete = None,
                None => {}
            }
        }

        if let Some(selection) = self.pending_selection.clone() {
            let mut answer = None;
            egui::Window::new("Discard changes?")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .frame(dialog_frame())
                .show(ctx, |ui| {
                    ui.label("A copy or edit is in progress. Switching the view will discard it.");
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        if ui.button("Discard").clicked() {
                            answer = Some(Confirmation::Yes);
                        }
                        if ui.button("Keep editing").clicked() {
                            answer = Some(Confirmation::No);
                        }
                    });
                });

            match answer {
                Some(Confirmation::Yes) => {
                    self.pending_selection = None;
                    self.apply_selection(selection);
                }
                Some(Confirmation::No) => self.pending_selection = None,
                None => {}
            }
        }
    }

    fn render_login(&mut self, ctx: &egui::Context) {
        let mut submit = false;
        let mut close = false;
        let demo_hint = self.demo && self.config.admin_secret().is_none();

        egui::Window::new("Administrator login")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(dialog_frame())
            .show(ctx, |ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.login_password)
                        .password(true)
                        .hint_text("Password")
                        .desired_width(260.0),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }
                if self.login_error {
                    ui.label(RichText::new("Wrong password.").color(conflict_color()));
                }
                if demo_hint {
                    ui.label(RichText::new(format!("Demo password: {}", DEMO_PASSWORD)).weak());
                }
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    if ui.button(format!("{}  Log in", egui_phosphor::regular::SIGN_IN)).clicked() {
                        submit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                });
            });

        if submit {
            self.login_error = false;
            let password = self.login_password.clone();
            self.run(Command::Login(password));
        }
        if close {
            self.show_login = false;
            self.login_password.clear();
            self.login_error = false;
        }
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let mut save = false;
        let mut close = false;

        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .default_width(620.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(dialog_frame())
            .show(ctx, |ui| {
                self.render_settings_fields(ui);
                ui.add_space(16.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save = true;
                    }
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                });
            });

        if save {
            self.save_settings();
        }
        if close {
            self.show_settings = false;
        }
    }

    fn render_status(&mut self, ui: &mut egui::Ui) {
        let mut dismiss = false;
        if let Some((msg, is_error)) = &self.status_message {
            let color = if *is_error { conflict_color() } else { success_color() };
            let dim_color = Color32::from_rgb(120, 120, 130);
            ui.horizontal(|ui| {
                ui.add(egui::Label::new(RichText::new(msg).color(color)));
                ui.add_space(8.0);
                let close_btn = ui.add(
                    egui::Label::new(RichText::new(egui_phosphor::regular::X).size(14.0).color(dim_color))
                        .sense(egui::Sense::click()),
                );
                if close_btn.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                }
                if close_btn.clicked() {
                    dismiss = true;
                }
            });
            ui.add_space(6.0);
        }
        if dismiss {
            self.status_message = None;
        }
    }
}

fn choice_row(ui: &mut egui::Ui, id_salt: &str, label: &str, selected: &mut String, options: &[(String, String)]) {
    ui.label(label);
    let text = options
        .iter()
        .find(|(id, _)| id == selected)
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| "Choose...".to_string());
    egui::ComboBox::from_id_salt(id_salt)
        .selected_text(text)
        .width(300.0)
        .show_ui(ui, |ui| {
            for (id, name) in options {
                ui.selectable_value(selected, id.clone(), name);
            }
        });
    ui.end_row();
}

impl eframe::App for TimetableApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Pinch or Ctrl+scroll zooms
        let zoom_delta = ctx.input(|i| i.zoom_delta());
        if zoom_delta != 1.0 {
            self.config.font_scale = (self.config.font_scale * zoom_delta).clamp(0.75, 2.0);
            if (zoom_delta - 1.0).abs() > 0.01 {
                if let Err(e) = self.config.save() {
                    tracing::warn!(error = %e, "could not save zoom level");
                }
            }
        }
        ctx.set_pixels_per_point(self.config.font_scale);

        self.check_async_results();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape))
            && !matches!(self.snapshot.state, InteractionState::Idle)
        {
            self.run(Command::Cancel);
        }

        if self.screen == Screen::Grid {
            self.render_lesson_form(ctx);
        }
        self.render_confirmations(ctx);
        if self.show_login {
            self.render_login(ctx);
        }
        if self.show_settings {
            self.render_settings(ctx);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(16.0, 12.0)))
            .show(ctx, |ui| {
                self.render_status(ui);
                match self.screen {
                    Screen::Setup => self.render_setup(ui),
                    Screen::Grid => self.render_grid_screen(ui),
                    Screen::Registry => self.render_registry_screen(ui),
                }
            });
    }
}
