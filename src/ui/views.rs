use egui::{RichText, Ui};

use crate::api::{Lesson, TimeSlot, Weekday};
use crate::schedule::{Cell, EditorSnapshot, InteractionState, ReferenceData, RegistryEntry, View, ViewKind};
use super::theme::{accent, cell_colors, conflict_color, empty_cell_colors, phosphor_fill_family};

const CELL_WIDTH: f32 = 170.0;
const CELL_HEIGHT: f32 = 66.0;
const SLOT_COLUMN_WIDTH: f32 = 120.0;

/// What the user did on the grid this frame
#[derive(Debug, Clone, PartialEq)]
pub enum GridAction {
    ClickCell(Cell),
    Copy(String),
    Edit(String),
    Delete(Lesson),
}

/// A requested change of the active view. Applied by the app, which may ask first.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub kind: ViewKind,
    pub view: Option<View>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryAction {
    Edit(RegistryEntry),
    Delete(RegistryEntry),
}

fn pointer_on_hover(ui: &Ui, response: &egui::Response) {
    if response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
}

fn icon_button(ui: &mut Ui, icon: &str, hint: &str) -> bool {
    let (_, _, secondary) = cell_colors();
    let response = ui.add(
        egui::Label::new(RichText::new(icon).size(14.0).color(secondary)).sense(egui::Sense::click()),
    );
    pointer_on_hover(ui, &response);
    response.on_hover_text(hint).clicked()
}

pub fn render_selectors(ui: &mut Ui, reference: &ReferenceData, kind: ViewKind, current: Option<&View>) -> Option<Selection> {
    let mut requested = None;

    ui.horizontal(|ui| {
        for k in ViewKind::ALL {
            if ui.selectable_label(kind == k, k.label()).clicked() && kind != k {
                requested = Some(Selection { kind: k, view: None });
            }
        }

        ui.add_space(16.0);

        let options = reference.options_for(kind);
        let selected_id = current.filter(|v| v.kind() == kind).map(View::id);
        let selected_text = selected_id
            .and_then(|id| options.iter().find(|(option_id, _)| option_id == id))
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| "Choose...".to_string());

        egui::ComboBox::from_id_salt("view_item")
            .selected_text(selected_text)
            .width(260.0)
            .show_ui(ui, |ui| {
                for (id, label) in &options {
                    let is_selected = selected_id == Some(id.as_str());
                    if ui.selectable_label(is_selected, label).clicked() && !is_selected {
                        requested = Some(Selection {
                            kind,
                            view: Some(View::new(kind, id.clone())),
                        });
                    }
                }
            });

        if options.is_empty() {
            ui.label(RichText::new("Nothing registered yet").weak());
        }
    });

    requested
}

fn render_slot_label(ui: &mut Ui, slot: &TimeSlot) {
    ui.vertical(|ui| {
        ui.set_width(SLOT_COLUMN_WIDTH);
        ui.label(RichText::new(&slot.label).strong());
        if !slot.period.is_empty() {
            ui.label(RichText::new(&slot.period).size(12.0).weak());
        }
    });
}

fn render_lesson_cell(
    ui: &mut Ui,
    lesson: &Lesson,
    kind: ViewKind,
    conflict: Option<&str>,
    editable: bool,
) -> Option<GridAction> {
    let (bg, text_color, secondary) = cell_colors();
    let (rect, response) = ui.allocate_exact_size(egui::vec2(CELL_WIDTH, CELL_HEIGHT), egui::Sense::hover());

    ui.painter().rect_filled(rect, 6.0, bg);
    if conflict.is_some() {
        ui.painter().rect_stroke(rect, 6.0, egui::Stroke::new(2.0, conflict_color()));
    }

    let detail = match kind {
        ViewKind::Class => format!("{} · {}", lesson.professor_name(), lesson.room_name()),
        ViewKind::Professor => format!("{} · {}", lesson.class_code(), lesson.room_name()),
        ViewKind::Room => format!("{} · {}", lesson.class_code(), lesson.professor_name()),
    };

    let mut action = None;
    let mut child_ui = ui.new_child(egui::UiBuilder::new().max_rect(rect.shrink(6.0)));
    child_ui.vertical(|ui| {
        ui.spacing_mut().item_spacing.y = 2.0;
        ui.horizontal(|ui| {
            if conflict.is_some() {
                ui.label(
                    RichText::new(egui_phosphor::fill::WARNING)
                        .family(phosphor_fill_family())
                        .size(13.0)
                        .color(conflict_color()),
                );
            }
            ui.add(egui::Label::new(RichText::new(lesson.discipline_name()).color(text_color).strong()).truncate());
        });
        ui.add(egui::Label::new(RichText::new(detail).size(12.0).color(secondary)).truncate());

        if editable {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 10.0;
                if icon_button(ui, egui_phosphor::regular::COPY, "Copy to another cell") {
                    action = Some(GridAction::Copy(lesson.id.clone()));
                }
                if icon_button(ui, egui_phosphor::regular::PENCIL_SIMPLE, "Edit") {
                    action = Some(GridAction::Edit(lesson.id.clone()));
                }
                if icon_button(ui, egui_phosphor::regular::TRASH, "Delete") {
                    action = Some(GridAction::Delete(lesson.clone()));
                }
            });
        }
    });

    if let Some(description) = conflict {
        response.on_hover_text(RichText::new(description).color(conflict_color()));
    }

    action
}

/// Returns true when an editable empty cell was clicked
fn render_empty_cell(ui: &mut Ui, editable: bool, copying: bool) -> bool {
    let (bg, hover) = empty_cell_colors();
    let (_, _, secondary) = cell_colors();
    let sense = if editable { egui::Sense::click() } else { egui::Sense::hover() };
    let (rect, response) = ui.allocate_exact_size(egui::vec2(CELL_WIDTH, CELL_HEIGHT), sense);

    let hovered = editable && response.hovered();
    ui.painter().rect_filled(rect, 6.0, if hovered { hover } else { bg });

    if hovered {
        let (icon, color) = if copying {
            (egui_phosphor::regular::CLIPBOARD_TEXT, accent())
        } else {
            (egui_phosphor::regular::PLUS, secondary)
        };
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            icon,
            egui::FontId::proportional(18.0),
            color,
        );
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    editable && response.clicked()
}

/// The 5 x N weekly grid of the active view
pub fn render_grid(ui: &mut Ui, snapshot: &EditorSnapshot) -> Option<GridAction> {
    let Some(view) = snapshot.view.as_ref() else {
        ui.add_space(24.0);
        ui.label(RichText::new("Choose a class, professor or room to see its timetable.").weak());
        return None;
    };

    if snapshot.reference.time_slots.is_empty() {
        ui.label(RichText::new("No time slots are registered.").weak());
        return None;
    }

    let editable = snapshot.is_admin() && view.kind() == ViewKind::Class;
    let copying = matches!(snapshot.state, InteractionState::Copying(_));
    let mut action = None;

    egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
        egui::Grid::new("timetable_grid")
            .spacing([6.0, 6.0])
            .show(ui, |ui| {
                ui.label("");
                for day in Weekday::ALL {
                    ui.vertical_centered(|ui| {
                        ui.set_width(CELL_WIDTH);
                        ui.label(RichText::new(day.label()).strong());
                    });
                }
                ui.end_row();

                for slot in &snapshot.reference.time_slots {
                    render_slot_label(ui, slot);
                    for day in Weekday::ALL {
                        let cell = Cell::new(day, slot.id.clone());
                        let clicked = match snapshot.grid.at(&cell) {
                            Some(lesson) => render_lesson_cell(
                                ui,
                                lesson,
                                view.kind(),
                                snapshot.conflicts.description(&lesson.id),
                                editable,
                            ),
                            None => render_empty_cell(ui, editable, copying).then(|| GridAction::ClickCell(cell.clone())),
                        };
                        if clicked.is_some() {
                            action = clicked;
                        }
                    }
                    ui.end_row();
                }
            });
    });

    action
}

pub fn render_registry_list(ui: &mut Ui, entries: &[RegistryEntry], editable: bool) -> Option<RegistryAction> {
    if entries.is_empty() {
        ui.label(RichText::new("Nothing registered yet.").weak());
        return None;
    }

    let (_, text_color, secondary) = cell_colors();
    let mut action = None;

    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        egui::Grid::new("registry_list")
            .num_columns(3)
            .striped(true)
            .spacing([24.0, 8.0])
            .show(ui, |ui| {
                for entry in entries {
                    ui.label(RichText::new(&entry.primary).color(text_color));
                    ui.label(RichText::new(entry.extra.as_deref().unwrap_or("")).color(secondary));
                    if editable {
                        ui.horizontal(|ui| {
                            if icon_button(ui, egui_phosphor::regular::PENCIL_SIMPLE, "Edit") {
                                action = Some(RegistryAction::Edit(entry.clone()));
                            }
                            if icon_button(ui, egui_phosphor::regular::TRASH, "Delete") {
                                action = Some(RegistryAction::Delete(entry.clone()));
                            }
                        });
                    } else {
                        ui.label("");
                    }
                    ui.end_row();
                }
            });
    });

    action
}
