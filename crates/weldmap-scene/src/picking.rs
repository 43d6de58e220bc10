//! Pointer interaction: click to select, drag the selected marker

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::camera::MainCamera;
use crate::models::Marker;
use crate::types::{EditorState, EntityVisual, SceneSettings};

/// Pointer travel (pixels) below which a press counts as a click
const CLICK_SLOP: f32 = 5.0;

/// Radians of spin per pixel of horizontal motion while rotating
const ROTATE_SENSITIVITY: f32 = 0.01;

/// Drag of the selected marker on a camera-facing plane
#[derive(Debug, Clone)]
struct DragState {
    plane_origin: Vec3,
    plane: InfinitePlane3d,
    grab_offset: Vec3,
    last_cursor: Vec2,
    moved: bool,
}

/// Press tracking between frames
#[derive(Resource, Default)]
pub struct PointerState {
    press: Option<Vec2>,
    drag: Option<DragState>,
}

/// Plugin for marker picking and dragging
pub struct PickingPlugin;

impl Plugin for PickingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerState>()
            .add_systems(Update, (handle_pointer, handle_deselection));
    }
}

/// Distance along the ray to the closest approach of `point`, if that
/// approach is within `radius`
pub fn ray_hit(ray: Ray3d, point: Vec3, radius: f32) -> Option<f32> {
    let to_point = point - ray.origin;
    let t = to_point.dot(*ray.direction);
    if t < 0.0 {
        return None;
    }
    let closest = ray.origin + *ray.direction * t;
    ((closest - point).length_squared() < radius * radius).then_some(t)
}

/// Nearest marker under the ray
fn pick_marker<'a>(
    ray: Ray3d,
    markers: impl Iterator<Item = (Entity, &'a Marker, &'a Transform)>,
    radius: f32,
) -> Option<(Entity, &'a Marker, Transform)> {
    let mut closest: Option<(f32, Entity, &'a Marker, Transform)> = None;
    for (entity, marker, transform) in markers {
        let Some(t) = ray_hit(ray, transform.translation, radius) else {
            continue;
        };
        if closest.as_ref().is_none_or(|(best, ..)| t < *best) {
            closest = Some((t, entity, marker, *transform));
        }
    }
    closest.map(|(_, entity, marker, transform)| (entity, marker, transform))
}

fn handle_pointer(
    mut editor: ResMut<EditorState>,
    mut state: ResMut<PointerState>,
    settings: Res<SceneSettings>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    markers: Query<(Entity, &Marker, &Transform)>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window>,
    mut contexts: EguiContexts,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let cursor = window.cursor_position();
    let ray = cursor.and_then(|pos| camera.viewport_to_world(camera_transform, pos).ok());
    let hit_radius = settings.marker_scale * settings.highlight_scale * 0.6;

    if mouse_button.just_pressed(MouseButton::Left) && !egui_wants_pointer {
        state.press = cursor;
        state.drag = None;

        // Pressing on the selected marker grabs it
        let handle_entity = editor.selection().and_then(|s| s.handle.as_ref()).map(|h| h.entity);
        if let (Some(ray), Some(handle_entity), Some(pos)) = (ray, handle_entity, cursor) {
            if let Ok((_, _, transform)) = markers.get(handle_entity) {
                if ray_hit(ray, transform.translation, hit_radius).is_some() && editor.begin_transform() {
                    let plane = InfinitePlane3d {
                        normal: camera_transform.forward(),
                    };
                    let grab_point = ray
                        .intersect_plane(transform.translation, plane)
                        .map(|t| ray.get_point(t))
                        .unwrap_or(transform.translation);
                    state.drag = Some(DragState {
                        plane_origin: transform.translation,
                        plane,
                        grab_offset: transform.translation - grab_point,
                        last_cursor: pos,
                        moved: false,
                    });
                }
            }
        }
    }

    if mouse_button.pressed(MouseButton::Left) {
        let press = state.press;
        if let (Some(drag), Some(pos)) = (state.drag.as_mut(), cursor) {
            if !drag.moved && press.is_some_and(|p| p.distance(pos) > CLICK_SLOP) {
                drag.moved = true;
            }
            let delta = pos - drag.last_cursor;
            drag.last_cursor = pos;

            let rotatable = editor.selection().is_some_and(|s| s.kind.has_rotation());
            let shift = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
            if drag.moved {
                if let Some(handle) = editor.handle_mut() {
                    if shift && rotatable {
                        handle.rotate_about_z(-delta.x * ROTATE_SENSITIVITY);
                    } else if let Some(point) = ray.and_then(|ray| {
                        ray.intersect_plane(drag.plane_origin, drag.plane)
                            .map(|t| ray.get_point(t))
                    }) {
                        handle.set_translation(point + drag.grab_offset);
                    }
                }
            }
        }
    }

    if mouse_button.just_released(MouseButton::Left) {
        let press = state.press.take();
        if let Some(drag) = state.drag.take() {
            if drag.moved {
                editor.transform_end();
                return;
            }
            editor.cancel_transform();
        }

        // A short press without travel is a click
        let (Some(start), Some(pos)) = (press, cursor) else {
            return;
        };
        if start.distance(pos) > CLICK_SLOP || egui_wants_pointer {
            return;
        }
        let Some(ray) = ray else {
            return;
        };

        match pick_marker(ray, markers.iter(), hit_radius) {
            Some((entity, marker, transform)) => {
                if !editor.is_selected(marker.kind, &marker.id) {
                    let visual = EntityVisual::new(entity, transform);
                    editor.select(marker.kind, &marker.id, Some(visual));
                }
            }
            None => {
                editor.deselect();
            }
        }
    }
}

/// Handle Escape key to deselect current selection
fn handle_deselection(
    mut editor: ResMut<EditorState>,
    mut state: ResMut<PointerState>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    if state.drag.take().is_some() {
        editor.cancel_transform();
        return;
    }
    editor.deselect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray_along_x() -> Ray3d {
        Ray3d::new(Vec3::ZERO, Dir3::X)
    }

    #[test]
    fn test_ray_hit_within_radius() {
        let t = ray_hit(ray_along_x(), Vec3::new(100.0, 3.0, 0.0), 5.0).unwrap();
        assert!((t - 100.0).abs() < 1e-4);
        assert!(ray_hit(ray_along_x(), Vec3::new(100.0, 6.0, 0.0), 5.0).is_none());
    }

    #[test]
    fn test_ray_hit_ignores_points_behind() {
        assert!(ray_hit(ray_along_x(), Vec3::new(-10.0, 0.0, 0.0), 5.0).is_none());
    }

    #[test]
    fn test_pick_marker_prefers_nearest() {
        let near = Marker {
            kind: weldmap_core::EntityKind::WeldPoint,
            id: "near".to_string(),
        };
        let far = Marker {
            kind: weldmap_core::EntityKind::Pin,
            id: "far".to_string(),
        };
        let near_t = Transform::from_xyz(50.0, 0.0, 0.0);
        let far_t = Transform::from_xyz(200.0, 0.0, 0.0);
        let markers = [
            (Entity::PLACEHOLDER, &far, &far_t),
            (Entity::PLACEHOLDER, &near, &near_t),
        ];
        let (_, marker, _) = pick_marker(ray_along_x(), markers.into_iter(), 5.0).unwrap();
        assert_eq!(marker.id, "near");
        assert!(pick_marker(Ray3d::new(Vec3::ZERO, Dir3::Y), markers.into_iter(), 5.0).is_none());
    }
}
