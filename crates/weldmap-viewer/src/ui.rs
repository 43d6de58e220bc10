//! UI overlays using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use std::collections::VecDeque;
use weldmap_core::{EntityKind, Notice, SliceStatus, ViewDirection};
use weldmap_scene::ui::{notice_color, render_entity_list, render_notice, render_property_form};
use weldmap_scene::{EditorState, MainCamera, UiLayout, ViewRequest};

use crate::app::ViewerSettings;
use crate::file_picker::{trigger_file_open, trigger_file_save, FileFilter, FilePickerContext, PendingFileResults};
use crate::section_client::{request_section, PendingSectionResults, SectionState};

/// Seconds a notice stays in the toast area
const NOTICE_TTL: f64 = 8.0;
/// Notices kept for the history list
const NOTICE_HISTORY: usize = 50;

/// Notices drained from the editor, newest last
#[derive(Resource, Default)]
pub struct NoticeLog {
    entries: VecDeque<(Notice, f64)>,
}

impl NoticeLog {
    pub fn push(&mut self, notice: Notice, now: f64) {
        self.entries.push_back((notice, now));
        while self.entries.len() > NOTICE_HISTORY {
            self.entries.pop_front();
        }
    }

    /// Notices younger than the toast lifetime
    pub fn recent(&self, now: f64) -> impl Iterator<Item = &Notice> {
        self.entries
            .iter()
            .filter(move |(_, at)| now - at < NOTICE_TTL)
            .map(|(notice, _)| notice)
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &Notice> {
        self.entries.iter().map(|(notice, _)| notice)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Grouped system parameters for the main UI system to work around Bevy's 16-param limit
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub editor: ResMut<'w, EditorState>,
    pub ui_layout: ResMut<'w, UiLayout>,
    pub settings: Res<'w, ViewerSettings>,
    pub pending_file_results: Res<'w, PendingFileResults>,
    pub pending_sections: Res<'w, PendingSectionResults>,
    pub section_state: ResMut<'w, SectionState>,
    pub view_request: ResMut<'w, ViewRequest>,
    pub notices: ResMut<'w, NoticeLog>,
    pub camera: Query<'w, 's, &'static Transform, With<MainCamera>>,
    pub time: Res<'w, Time>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NoticeLog>()
            .add_systems(Update, (update_ui_layout, refresh_filter, collect_notices))
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Update UI layout based on window size
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        // Only update if dimensions changed significantly
        if (ui_layout.screen_width - width).abs() > 1.0 || (ui_layout.screen_height - height).abs() > 1.0 {
            ui_layout.update_from_window(width, height);
        }
    }
}

/// Keep the filter options in step with the store
fn refresh_filter(mut editor: ResMut<EditorState>) {
    editor.bypass_change_detection().refresh_filter();
}

fn collect_notices(mut editor: ResMut<EditorState>, mut log: ResMut<NoticeLog>, time: Res<Time>) {
    let now = time.elapsed_secs_f64();
    for notice in editor.bypass_change_detection().drain_notices() {
        log.push(notice, now);
    }
}

/// Point in front of the camera where new entities are placed
fn placement(camera: Option<&Transform>, distance: f32) -> [f64; 3] {
    let Some(transform) = camera else {
        return [0.0; 3];
    };
    let point = transform.translation + *transform.forward() * distance;
    point.to_array().map(f64::from)
}

fn ui_system(mut params: UiParams) {
    let is_mobile = params.ui_layout.is_mobile;
    let ui_scale = params.ui_layout.ui_scale();
    let left_width = params.ui_layout.left_panel_width();
    let right_width = params.ui_layout.right_panel_width();
    let now = params.time.elapsed_secs_f64();

    // Get the egui context - early return if not available. Cloned so the
    // panels below can borrow the rest of `params`.
    let Ok(ctx) = params.contexts.ctx_mut().map(|ctx| ctx.clone()) else { return };

    // Mobile: toggle buttons at the bottom
    if is_mobile {
        egui::TopBottomPanel::bottom("mobile_toolbar").show(&ctx, |ui| {
            ui.horizontal(|ui| {
                let menu_text = if params.ui_layout.show_left_panel { "☰ Menu" } else { "☰" };
                if ui.button(egui::RichText::new(menu_text).size(16.0 * ui_scale)).clicked() {
                    params.ui_layout.show_left_panel = !params.ui_layout.show_left_panel;
                    if params.ui_layout.show_left_panel {
                        params.ui_layout.show_right_panel = false;
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if params.editor.selection().is_some() {
                        let details_text = if params.ui_layout.show_right_panel { "Details ✕" } else { "Details" };
                        if ui.button(egui::RichText::new(details_text).size(16.0 * ui_scale)).clicked() {
                            params.ui_layout.show_right_panel = !params.ui_layout.show_right_panel;
                            if params.ui_layout.show_right_panel {
                                params.ui_layout.show_left_panel = false;
                            }
                        }
                    }
                });
            });
        });
    }

    // Notices
    let recent: Vec<Notice> = params.notices.recent(now).cloned().collect();
    egui::TopBottomPanel::bottom("notice_panel").show(&ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!(
                    "{} weld points · {} locators · {} pins",
                    params.editor.store().collection(EntityKind::WeldPoint).len(),
                    params.editor.store().collection(EntityKind::Locator).len(),
                    params.editor.store().collection(EntityKind::Pin).len(),
                ))
                .small()
                .color(egui::Color32::GRAY),
            );
            if params.editor.is_dragging() {
                ui.separator();
                ui.label(egui::RichText::new("Dragging (Shift rotates)").small());
            }
        });
        for notice in &recent {
            render_notice(ui, notice);
        }
        ui.collapsing("Messages", |ui| {
            egui::ScrollArea::vertical().max_height(120.0).show(ui, |ui| {
                for notice in params.notices.history().rev() {
                    ui.label(
                        egui::RichText::new(format!("{}: {}", notice.title, notice.message))
                            .small()
                            .color(notice_color(notice.level)),
                    );
                }
            });
            if ui.small_button("Clear").clicked() {
                params.notices.clear();
            }
        });
    });

    // Scene panel (left side)
    if !is_mobile || params.ui_layout.show_left_panel {
        egui::SidePanel::left("scene_panel")
            .default_width(left_width)
            .resizable(!is_mobile)
            .show(&ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    render_scene_panel(ui, &mut params);
                });
            });
    }

    // Property panel (right side)
    let has_selection = params.editor.selection().is_some();
    if has_selection && (!is_mobile || params.ui_layout.show_right_panel) {
        egui::SidePanel::right("properties_panel")
            .default_width(right_width)
            .resizable(!is_mobile)
            .show(&ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    render_property_form(ui, &mut params.editor, &params.ui_layout);

                    let is_locator = params
                        .editor
                        .selection()
                        .is_some_and(|s| s.kind == EntityKind::Locator);
                    if is_locator {
                        ui.separator();
                        ui.heading("Cross-section");
                        let in_flight = params.section_state.in_flight;
                        let button = ui.add_enabled(!in_flight, egui::Button::new("✂ Slice model here"));
                        if button.clicked() {
                            request_section(
                                &mut params.editor,
                                &params.settings,
                                &params.pending_sections,
                                &mut params.section_state,
                            );
                        }
                        if in_flight {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Waiting for service…");
                            });
                        }
                    }
                });
            });
    }

    render_delete_confirmation(&ctx, &mut params.editor);
    render_section_results(&ctx, &mut params.section_state);
}

fn render_scene_panel(ui: &mut egui::Ui, params: &mut UiParams) {
    ui.heading("Weldmap");
    ui.separator();

    // Reference model
    ui.label(egui::RichText::new("Reference model").strong());
    match params.editor.store().model() {
        Some(model) => {
            ui.label(&model.name);
            ui.label(
                egui::RichText::new(format!("{} · {} triangles", model.format.label(), model.mesh.triangle_count()))
                    .small()
                    .color(egui::Color32::GRAY),
            );
        }
        None => {
            ui.label(egui::RichText::new("No model loaded").italics().color(egui::Color32::GRAY));
        }
    }
    if ui.button("📂 Load STL/OBJ…").clicked() {
        trigger_file_open(&params.pending_file_results, FilePickerContext::LoadModel, FileFilter::model());
    }

    ui.separator();
    ui.label(egui::RichText::new("Tables").strong());
    egui::Grid::new("table_buttons").num_columns(3).show(ui, |ui| {
        for kind in EntityKind::ALL {
            ui.label(kind.plural());
            if ui.small_button("Import").clicked() {
                trigger_file_open(
                    &params.pending_file_results,
                    FilePickerContext::ImportTable(kind),
                    FileFilter::csv(),
                );
            }
            if ui.small_button("Export").clicked() {
                if let Some(bytes) = params.editor.export_table(kind) {
                    trigger_file_save(
                        &params.pending_file_results,
                        FilePickerContext::ExportTable(kind),
                        kind.table_file_name(),
                        &bytes,
                        FileFilter::csv(),
                    );
                }
            }
            ui.end_row();
        }
    });

    ui.separator();
    ui.label(egui::RichText::new("Process").strong());
    let current = params.editor.filter().current().to_string();
    let options = params.editor.filter().options().to_vec();
    let mut chosen = None;
    egui::ComboBox::from_id_salt("process_filter")
        .selected_text(current.as_str())
        .show_ui(ui, |ui| {
            for option in &options {
                if ui.selectable_label(*option == current, option.as_str()).clicked() {
                    chosen = Some(option.clone());
                }
            }
        });
    if let Some(value) = chosen {
        params.editor.set_filter(&value);
    }

    ui.separator();
    ui.label(egui::RichText::new("Add").strong());
    ui.horizontal_wrapped(|ui| {
        for kind in EntityKind::ALL {
            if ui.button(format!("+ {}", kind.label())).clicked() {
                let position = placement(params.camera.single().ok(), params.settings.config.add_distance);
                params.editor.add_entity(kind, position);
            }
        }
    });

    ui.separator();
    ui.label(egui::RichText::new("View").strong());
    ui.horizontal(|ui| {
        for direction in ViewDirection::ALL {
            if ui.button(direction.label()).clicked() {
                params.view_request.0 = Some(direction);
            }
        }
    });

    ui.separator();
    for kind in EntityKind::ALL {
        render_entity_list(ui, &mut params.editor, kind);
    }
}

/// Modal confirmation for a pending delete
fn render_delete_confirmation(ctx: &egui::Context, editor: &mut EditorState) {
    let Some(pending) = editor.pending_delete().cloned() else {
        return;
    };

    let mut confirm = false;
    let mut cancel = false;
    egui::Window::new("Delete entity")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(format!("Delete {} '{}'? This cannot be undone.", pending.kind, pending.id));
            ui.horizontal(|ui| {
                if ui.button("Delete").clicked() {
                    confirm = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

    if confirm {
        editor.confirm_delete();
    } else if cancel {
        editor.cancel_delete();
    }
}

fn render_section_results(ctx: &egui::Context, state: &mut SectionState) {
    if !state.show_results {
        return;
    }
    let Some(response) = state.last_response.as_ref() else {
        return;
    };

    let mut open = true;
    egui::Window::new("Cross-section results")
        .open(&mut open)
        .default_width(360.0)
        .show(ctx, |ui| {
            ui.label(&response.message);
            ui.label(
                egui::RichText::new(format!(
                    "{} · {} locator(s)",
                    response.obj_file_processed, response.num_locators_processed
                ))
                .small()
                .color(egui::Color32::GRAY),
            );
            ui.separator();
            for result in &response.slice_results {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new(&result.id).strong());
                    match result.status {
                        SliceStatus::Success => {
                            ui.label(result.image_path.as_deref().unwrap_or("(no image)"));
                        }
                        SliceStatus::Error => {
                            ui.colored_label(
                                egui::Color32::from_rgb(230, 80, 80),
                                result.message.as_deref().unwrap_or("failed"),
                            );
                        }
                    }
                });
            }
        });
    state.show_results = open;
}
