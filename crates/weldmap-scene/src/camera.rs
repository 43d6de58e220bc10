//! Camera controls and orbit navigation

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use weldmap_core::view::{self, Bounds, CameraPose, MAX_ELEVATION};

use crate::types::{EditorState, ViewRequest};

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let mut settings = Self {
            distance: 0.0,
            target_distance: 0.0,
            azimuth: 0.0,
            elevation: 0.0,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        };
        settings.apply_pose(&CameraPose::default());
        settings.distance = settings.target_distance;
        settings
    }
}

impl CameraSettings {
    /// Move smoothly to a framed pose
    pub fn apply_pose(&mut self, pose: &CameraPose) {
        self.target_focus = Vec3::from_array(pose.target.map(|v| v as f32));
        self.target_distance = (pose.distance as f32).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.azimuth = pose.azimuth as f32;
        self.elevation = pose.elevation as f32;
    }

    /// Unit vector from the orbit target towards the eye
    pub fn eye_direction(&self) -> Vec3 {
        Vec3::new(
            self.azimuth.cos() * self.elevation.cos(),
            self.azimuth.sin() * self.elevation.cos(),
            self.elevation.sin(),
        )
    }
}

const MIN_DISTANCE: f32 = 10.0;
const MAX_DISTANCE: f32 = 50_000.0;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .init_resource::<ViewRequest>()
            .add_systems(
                Update,
                (apply_orbit_request, apply_view_request, update_camera).chain(),
            );
    }
}

/// Recenter the orbit on whatever the selection controller asked for
fn apply_orbit_request(mut editor: ResMut<EditorState>, mut settings: ResMut<CameraSettings>) {
    if let Some(target) = editor.bypass_change_detection().take_orbit_request() {
        settings.target_focus = Vec3::from_array(target.map(|v| v as f32));
    }
}

/// Frame visible markers and the reference model from a preset direction
fn apply_view_request(
    mut request: ResMut<ViewRequest>,
    editor: Res<EditorState>,
    mut settings: ResMut<CameraSettings>,
    projection: Query<&Projection, With<MainCamera>>,
) {
    let Some(direction) = request.0.take() else {
        return;
    };

    let fov = match projection.single() {
        Ok(Projection::Perspective(p)) => p.fov as f64,
        _ => std::f64::consts::FRAC_PI_4,
    };

    let markers = weldmap_core::EntityKind::ALL
        .into_iter()
        .flat_map(|kind| editor.filtered(kind))
        .filter_map(|e| e.position_f64());
    let mut bounds = Bounds::from_points(markers);
    if let Some(model) = editor.store().model() {
        bounds = Some(match bounds {
            Some(b) => b.union(model.bounds),
            None => model.bounds,
        });
    }

    let pose = view::frame(bounds, direction, fov);
    tracing::info!(view = direction.label(), distance = pose.distance, "Framing view");
    settings.apply_pose(&pose);
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    editor: Res<EditorState>,
    time: Res<Time>,
    mut contexts: EguiContexts,
) {
    // Check if egui wants the mouse - if so, don't process camera controls
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    // Orbit with left drag, unless a marker is being dragged
    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer && !editor.is_dragging() {
        settings.azimuth -= total_motion.x * settings.sensitivity;
        settings.elevation = (settings.elevation - total_motion.y * settings.sensitivity)
            .clamp(-MAX_ELEVATION as f32, MAX_ELEVATION as f32);
    }

    // Pan with right drag in the camera's vertical plane
    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer {
        let right = Vec3::new(settings.azimuth.sin(), -settings.azimuth.cos(), 0.0);
        let pan_speed = settings.distance * 0.002;
        settings.target_focus += right * total_motion.x * pan_speed;
        settings.target_focus += Vec3::Z * total_motion.y * pan_speed;
    }

    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * settings.zoom_speed;
            settings.target_distance =
                (settings.target_distance * zoom_factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        // Spherical coordinates with Z-up
        transform.translation = settings.target + settings.eye_direction() * settings.distance;
        transform.look_at(settings.target, Vec3::Z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weldmap_core::ViewDirection;

    #[test]
    fn test_default_matches_default_pose() {
        let settings = CameraSettings::default();
        let pose = CameraPose::default();
        assert_eq!(settings.distance, pose.distance as f32);
        assert_eq!(settings.azimuth, pose.azimuth as f32);
    }

    #[test]
    fn test_apply_pose_clamps_distance() {
        let mut settings = CameraSettings::default();
        let pose = view::frame(Some(Bounds::from_point([5.0, 0.0, 0.0])), ViewDirection::Y, 0.8);
        settings.apply_pose(&pose);
        assert_eq!(settings.target_focus, Vec3::new(5.0, 0.0, 0.0));
        assert!(settings.target_distance >= MIN_DISTANCE);
        let eye = settings.eye_direction();
        assert!(eye.y > 0.99);
    }
}
