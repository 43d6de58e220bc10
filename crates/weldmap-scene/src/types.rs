//! Shared resources: editor state, visual handles, scene settings and UI layout

use bevy::prelude::*;
use weldmap_core::{Editor, EntityKind, ViewDirection, ViewerConfig, VisualHandle};

/// The editor, shared by every system
#[derive(Resource, Deref, DerefMut)]
pub struct EditorState(pub Editor<EntityVisual>);

impl EditorState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self(Editor::new(config))
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

/// Live handle on a marker. Edits are written back to the marker's
/// `Transform` by the renderer while `dirty` is set.
#[derive(Debug, Clone)]
pub struct EntityVisual {
    pub entity: Entity,
    pub transform: Transform,
    pub dirty: bool,
}

impl EntityVisual {
    pub fn new(entity: Entity, transform: Transform) -> Self {
        Self {
            entity,
            transform,
            dirty: false,
        }
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.transform.translation = translation;
        self.dirty = true;
    }

    /// Spin about the world Z axis
    pub fn rotate_about_z(&mut self, angle: f32) {
        self.transform.rotation = Quat::from_rotation_z(angle) * self.transform.rotation;
        self.dirty = true;
    }
}

impl VisualHandle for EntityVisual {
    fn position(&self) -> [f64; 3] {
        self.transform.translation.to_array().map(f64::from)
    }

    fn set_position(&mut self, position: [f64; 3]) {
        self.set_translation(Vec3::from_array(position.map(|v| v as f32)));
    }

    fn rotation(&self) -> [f64; 3] {
        let (x, y, z) = self.transform.rotation.to_euler(EulerRot::XYZ);
        [x, y, z].map(f64::from)
    }

    fn set_rotation(&mut self, rotation: [f64; 3]) {
        let [x, y, z] = rotation.map(|v| v as f32);
        self.transform.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
        self.dirty = true;
    }
}

/// Rendering options taken from the viewer configuration
#[derive(Debug, Clone, Resource)]
pub struct SceneSettings {
    /// Marker size in model units
    pub marker_scale: f32,
    /// Scale multiplier for the selected marker
    pub highlight_scale: f32,
    pub grid_spacing: f32,
    pub grid_lines: i32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl SceneSettings {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            marker_scale: config.marker_scale,
            highlight_scale: 1.6,
            grid_spacing: 100.0,
            grid_lines: 10,
        }
    }
}

/// Pending camera preset from the view buttons
#[derive(Debug, Clone, Resource, Default)]
pub struct ViewRequest(pub Option<ViewDirection>);

/// Marker colour per kind
pub fn kind_color(kind: EntityKind) -> Color {
    match kind {
        EntityKind::WeldPoint => Color::srgb(0.95, 0.55, 0.1),
        EntityKind::Locator => Color::srgb(0.2, 0.6, 0.95),
        EntityKind::Pin => Color::srgb(0.3, 0.85, 0.35),
    }
}

/// UI layout detection and responsive settings
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    pub is_mobile: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    pub show_left_panel: bool,
    pub show_right_panel: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            is_mobile: false,
            screen_width: 1920.0,
            screen_height: 1080.0,
            show_left_panel: true,
            show_right_panel: true,
        }
    }
}

impl UiLayout {
    pub fn update_from_window(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
        // Consider mobile if width < 800 or in portrait orientation
        self.is_mobile = width < 800.0 || (height > width * 1.2);
    }

    pub fn left_panel_width(&self) -> f32 {
        if self.is_mobile {
            self.screen_width * 0.85
        } else {
            280.0
        }
    }

    pub fn right_panel_width(&self) -> f32 {
        if self.is_mobile {
            self.screen_width * 0.85
        } else {
            320.0
        }
    }

    pub fn ui_scale(&self) -> f32 {
        if self.is_mobile { 1.2 } else { 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_visual_handle_round_trip() {
        let mut visual = EntityVisual::new(Entity::PLACEHOLDER, Transform::default());
        assert!(!visual.dirty);

        visual.set_position([1.0, -2.0, 3.5]);
        assert!(visual.dirty);
        assert_eq!(visual.position(), [1.0, -2.0, 3.5]);

        visual.set_rotation([0.1, 0.2, 0.3]);
        let r = visual.rotation();
        assert_relative_eq!(r[0], 0.1, epsilon = 1e-5);
        assert_relative_eq!(r[1], 0.2, epsilon = 1e-5);
        assert_relative_eq!(r[2], 0.3, epsilon = 1e-5);
    }

    #[test]
    fn test_rotate_about_z_accumulates() {
        let mut visual = EntityVisual::new(Entity::PLACEHOLDER, Transform::default());
        visual.rotate_about_z(0.25);
        visual.rotate_about_z(0.25);
        assert_relative_eq!(visual.rotation()[2], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_layout_mobile_detection() {
        let mut layout = UiLayout::default();
        layout.update_from_window(600.0, 900.0);
        assert!(layout.is_mobile);
        layout.update_from_window(1600.0, 900.0);
        assert!(!layout.is_mobile);
    }
}
