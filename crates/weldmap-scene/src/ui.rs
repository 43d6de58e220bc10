//! Shared egui widgets for the property form and entity lists

use bevy_egui::egui;
use weldmap_core::{EntityKind, Field, Notice, NoticeLevel, Scalar};

use crate::types::{EditorState, UiLayout};

fn field_label(field: Field) -> String {
    match field {
        Field::Rx | Field::Ry | Field::Rz => format!("{} (°)", field.name()),
        Field::X | Field::Y | Field::Z => format!("{} (mm)", field.name()),
        _ => field.name().to_string(),
    }
}

/// Render the property form of the selected entity.
///
/// Each field commits on focus loss; rejected values are reverted by the
/// editor and reported as a notice.
pub fn render_property_form(ui: &mut egui::Ui, editor: &mut EditorState, ui_layout: &UiLayout) {
    let ui_scale = ui_layout.ui_scale();

    let Some(kind) = editor.form().kind() else {
        let text = match editor.selection() {
            Some(selection) => format!("{} '{}' not found", selection.kind, selection.id),
            None => "Nothing selected".to_string(),
        };
        ui.label(egui::RichText::new(text).italics().color(egui::Color32::GRAY));
        return;
    };

    ui.heading(egui::RichText::new(kind.label()).size(16.0 * ui_scale));
    ui.separator();

    let mut committed = Vec::new();
    egui::Grid::new("property_form")
        .num_columns(2)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            for field in editor.form().fields() {
                ui.label(field_label(*field));
                let Some(text) = editor.form_mut().staged_mut(*field) else {
                    ui.end_row();
                    continue;
                };
                let response = ui.add(
                    egui::TextEdit::singleline(text)
                        .desired_width(140.0 * ui_scale)
                        .id_salt(field.name()),
                );
                let invalid = field.is_numeric() && matches!(Scalar::parse(text), Scalar::Raw(_));
                if invalid {
                    response.clone().on_hover_text("Not a number");
                }
                if response.lost_focus() {
                    committed.push(*field);
                }
                ui.end_row();
            }
        });

    for field in committed {
        editor.commit_field(field);
    }

    ui.add_space(8.0);
    if ui.button("🗑 Delete").clicked() {
        editor.request_delete();
    }
}

/// Render the selectable list of visible entities of one kind
pub fn render_entity_list(ui: &mut egui::Ui, editor: &mut EditorState, kind: EntityKind) {
    let mut clicked = None;
    let entities = editor.filtered(kind);

    ui.collapsing(format!("{} ({})", kind.plural(), entities.len()), |ui| {
        if entities.is_empty() {
            ui.label(egui::RichText::new("None").small().color(egui::Color32::GRAY));
        }
        for entity in &entities {
            let selected = editor.is_selected(kind, &entity.id);
            let label = if entity.process.is_empty() {
                entity.id.clone()
            } else {
                format!("{}  [{}]", entity.id, entity.process)
            };
            if ui.selectable_label(selected, label).clicked() && !selected {
                clicked = Some(entity.id.clone());
            }
        }
    });

    // The renderer attaches the marker handle on the next frame
    if let Some(id) = clicked {
        editor.select(kind, &id, None);
    }
}

pub fn notice_color(level: NoticeLevel) -> egui::Color32 {
    match level {
        NoticeLevel::Info => egui::Color32::from_rgb(120, 200, 120),
        NoticeLevel::Warning => egui::Color32::from_rgb(230, 190, 60),
        NoticeLevel::Error => egui::Color32::from_rgb(230, 80, 80),
    }
}

/// Render one notice as a titled line
pub fn render_notice(ui: &mut egui::Ui, notice: &Notice) {
    ui.horizontal_wrapped(|ui| {
        ui.label(
            egui::RichText::new(&notice.title)
                .strong()
                .color(notice_color(notice.level)),
        );
        ui.label(&notice.message);
    });
}
