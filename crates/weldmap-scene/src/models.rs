//! Marker and reference model visualization
//!
//! Markers are kept in step with the editor declaratively: whenever the store
//! revision, the process filter or the selection changes, one marker exists
//! per visible entity and nothing else.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use weldmap_core::{EntityKind, TriangleMesh};

use crate::types::{kind_color, EditorState, EntityVisual, SceneSettings};

/// A rendered weld point, locator or pin
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: EntityKind,
    pub id: String,
}

impl Marker {
    pub fn is(&self, kind: EntityKind, id: &str) -> bool {
        self.kind == kind && self.id == id
    }
}

/// Marker component for the reference model mesh
#[derive(Component)]
pub struct ReferenceModelEntity;

/// Shared meshes and materials for markers
#[derive(Resource)]
pub struct MarkerAssets {
    meshes: HashMap<EntityKind, Handle<Mesh>>,
    materials: HashMap<EntityKind, Handle<StandardMaterial>>,
    highlight: Handle<StandardMaterial>,
}

impl MarkerAssets {
    fn mesh(&self, kind: EntityKind) -> Handle<Mesh> {
        self.meshes.get(&kind).cloned().unwrap_or_default()
    }

    fn material(&self, kind: EntityKind, selected: bool) -> Handle<StandardMaterial> {
        if selected {
            return self.highlight.clone();
        }
        self.materials.get(&kind).cloned().unwrap_or_default()
    }
}

/// What the markers were last built from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SyncKey {
    revision: u64,
    filter: String,
    selected: Option<(EntityKind, String)>,
}

/// Plugin for marker and model rendering
pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_marker_assets).add_systems(
            Update,
            (sync_markers, bind_selected_handle, apply_handle_transform, sync_reference_model).chain(),
        );
    }
}

fn setup_marker_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Unit-sized shapes scaled by the marker size; cone and cylinder point
    // along +Z so a locator's rotation is visible
    let axis_to_z = Quat::from_rotation_x(FRAC_PI_2);
    let shapes = [
        (EntityKind::WeldPoint, Mesh::from(Sphere::new(0.5))),
        (EntityKind::Locator, Mesh::from(Cone::new(0.5, 1.0)).rotated_by(axis_to_z)),
        (EntityKind::Pin, Mesh::from(Cylinder::new(0.25, 1.0)).rotated_by(axis_to_z)),
    ];

    let mut marker_meshes = HashMap::new();
    let mut marker_materials = HashMap::new();
    for (kind, mesh) in shapes {
        marker_meshes.insert(kind, meshes.add(mesh));
        marker_materials.insert(
            kind,
            materials.add(StandardMaterial {
                base_color: kind_color(kind),
                perceptual_roughness: 0.6,
                ..default()
            }),
        );
    }

    let highlight = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.9, 0.1),
        emissive: LinearRgba::rgb(0.6, 0.5, 0.0),
        ..default()
    });

    commands.insert_resource(MarkerAssets {
        meshes: marker_meshes,
        materials: marker_materials,
        highlight,
    });
}

fn marker_transform(entity: &weldmap_core::Entity, scale: f32) -> Option<Transform> {
    let position = entity.position_f64()?;
    let rotation = entity
        .rotation_deg()
        .map(|[x, y, z]| {
            Quat::from_euler(
                EulerRot::XYZ,
                x.to_radians() as f32,
                y.to_radians() as f32,
                z.to_radians() as f32,
            )
        })
        .unwrap_or(Quat::IDENTITY);
    Some(
        Transform::from_translation(Vec3::from_array(position.map(|v| v as f32)))
            .with_rotation(rotation)
            .with_scale(Vec3::splat(scale)),
    )
}

/// Spawn, update and despawn markers to match the filtered store
fn sync_markers(
    mut commands: Commands,
    editor: Res<EditorState>,
    settings: Res<SceneSettings>,
    assets: Res<MarkerAssets>,
    mut last: Local<Option<SyncKey>>,
    mut markers: Query<(
        Entity,
        &mut Marker,
        &mut Transform,
        &mut MeshMaterial3d<StandardMaterial>,
    )>,
) {
    let selection = editor.selection();
    let key = SyncKey {
        revision: editor.store().revision(),
        filter: editor.filter().current().to_string(),
        selected: selection.map(|s| (s.kind, s.id.clone())),
    };
    if last.as_ref() == Some(&key) {
        return;
    }

    let mut visible: HashMap<(EntityKind, &str), &weldmap_core::Entity> = HashMap::new();
    for kind in EntityKind::ALL {
        for entity in editor.filtered(kind) {
            visible.insert((kind, entity.id.as_str()), entity);
        }
    }

    // An id commit renames the selected entity; keep its marker so the
    // attached handle stays valid
    let handle_entity = selection.and_then(|s| s.handle.as_ref()).map(|h| h.entity);
    let selected_has_marker = selection.is_some_and(|s| markers.iter().any(|(_, m, _, _)| m.is(s.kind, &s.id)));
    if let (Some(selected), Some(handle_entity), false) = (selection, handle_entity, selected_has_marker) {
        if let Ok((_, mut marker, _, _)) = markers.get_mut(handle_entity) {
            if marker.kind == selected.kind {
                tracing::debug!(from = %marker.id, to = %selected.id, "Re-keying renamed marker");
                marker.id = selected.id.clone();
            }
        }
    }

    let mut existing: HashMap<(EntityKind, String), Entity> = HashMap::new();
    for (entity, marker, mut transform, mut material) in markers.iter_mut() {
        let Some(record) = visible.get(&(marker.kind, marker.id.as_str())) else {
            commands.entity(entity).despawn();
            continue;
        };
        if existing.contains_key(&(marker.kind, marker.id.clone())) {
            commands.entity(entity).despawn();
            continue;
        }

        let selected = editor.is_selected(marker.kind, &marker.id);
        let scale = marker_scale(&settings, selected);
        match marker_transform(record, scale) {
            Some(t) => *transform = t,
            None => {
                commands.entity(entity).despawn();
                continue;
            }
        }
        material.0 = assets.material(marker.kind, selected);
        existing.insert((marker.kind, marker.id.clone()), entity);
    }

    let mut spawned = 0usize;
    for ((kind, id), record) in &visible {
        if existing.contains_key(&(*kind, id.to_string())) {
            continue;
        }
        let selected = editor.is_selected(*kind, id);
        let Some(transform) = marker_transform(record, marker_scale(&settings, selected)) else {
            tracing::warn!(kind = %kind, id = %id, "Skipping marker with non-numeric coordinates");
            continue;
        };
        commands.spawn((
            Mesh3d(assets.mesh(*kind)),
            MeshMaterial3d(assets.material(*kind, selected)),
            transform,
            Marker {
                kind: *kind,
                id: id.to_string(),
            },
        ));
        spawned += 1;
    }

    if spawned > 0 {
        tracing::debug!(spawned, visible = visible.len(), "Synchronized markers");
    }
    *last = Some(key);
}

fn marker_scale(settings: &SceneSettings, selected: bool) -> f32 {
    if selected {
        settings.marker_scale * settings.highlight_scale
    } else {
        settings.marker_scale
    }
}

/// Give a selection made from the list (or a new entity) its live handle, and
/// re-point the handle when its marker was rebuilt
fn bind_selected_handle(mut editor: ResMut<EditorState>, markers: Query<(Entity, &Marker, &Transform)>) {
    let Some(selection) = editor.selection() else {
        return;
    };
    let (kind, id) = (selection.kind, selection.id.clone());
    let current = selection.handle.as_ref().map(|h| h.entity);

    let Some((entity, _, transform)) = markers.iter().find(|(_, m, _)| m.is(kind, &id)) else {
        return;
    };

    match current {
        None => {
            let visual = EntityVisual::new(entity, *transform);
            editor.attach_handle(kind, &id, visual);
        }
        Some(bound) if bound != entity => {
            if let Some(handle) = editor.bypass_change_detection().handle_mut() {
                handle.entity = entity;
                handle.dirty = true;
            }
        }
        Some(_) => {}
    }
}

/// Write pending handle edits to the selected marker
fn apply_handle_transform(mut editor: ResMut<EditorState>, mut markers: Query<&mut Transform, With<Marker>>) {
    let Some(handle) = editor.bypass_change_detection().handle_mut() else {
        return;
    };
    if !handle.dirty {
        return;
    }
    if let Ok(mut transform) = markers.get_mut(handle.entity) {
        transform.translation = handle.transform.translation;
        transform.rotation = handle.transform.rotation;
    }
    handle.dirty = false;
}

/// Build a renderable mesh with flat normals from a triangle mesh
pub fn build_model_mesh(source: &TriangleMesh) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, source.positions.clone());
    mesh.insert_indices(Indices::U32(source.indices.clone()));
    mesh.duplicate_vertices();
    mesh.compute_flat_normals();
    mesh
}

/// Replace the reference model mesh whenever a new model is installed
fn sync_reference_model(
    mut commands: Commands,
    editor: Res<EditorState>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing: Query<Entity, With<ReferenceModelEntity>>,
    mut last_revision: Local<u64>,
) {
    let revision = editor.store().model_revision();
    if revision == *last_revision {
        return;
    }
    *last_revision = revision;

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let Some(model) = editor.store().model() else {
        return;
    };

    tracing::info!(name = %model.name, triangles = model.mesh.triangle_count(), "Rendering reference model");
    commands.spawn((
        Mesh3d(meshes.add(build_model_mesh(&model.mesh))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.7, 0.72, 0.75, 0.85),
            perceptual_roughness: 0.8,
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            cull_mode: None,
            ..default()
        })),
        Transform::IDENTITY,
        ReferenceModelEntity,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_marker_transform_uses_rotation_degrees() {
        let entity = weldmap_core::Entity::new(EntityKind::Locator, "L1", [1.0, 2.0, 3.0])
            .with_rotation([0.0, 0.0, 90.0]);
        let transform = marker_transform(&entity, 10.0).unwrap();
        assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.scale, Vec3::splat(10.0));
        let (_, _, z) = transform.rotation.to_euler(EulerRot::XYZ);
        assert_relative_eq!(z, FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn test_marker_transform_skips_raw_coordinates() {
        let mut entity = weldmap_core::Entity::new(EntityKind::WeldPoint, "W1", [0.0; 3]);
        entity.position[1] = weldmap_core::Scalar::parse("n/a");
        assert!(marker_transform(&entity, 1.0).is_none());
    }

    #[test]
    fn test_selected_marker_is_larger() {
        let settings = SceneSettings::default();
        assert!(marker_scale(&settings, true) > marker_scale(&settings, false));
    }

    #[test]
    fn test_build_model_mesh_has_flat_normals() {
        let source = TriangleMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
        };
        let mesh = build_model_mesh(&source);
        assert_eq!(mesh.count_vertices(), 3);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
    }
}
