//! Scene setup - camera, lights, grid and world axes

use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

use crate::camera::MainCamera;
use crate::types::SceneSettings;

/// Marker component for the main directional light
#[derive(Component)]
pub struct MainDirectionalLight;

/// Marker component for grid lines
#[derive(Component)]
pub struct GridLine;

/// Marker component for world axis visualization
#[derive(Component)]
pub struct WorldAxis;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneSettings>()
            .add_systems(Startup, setup_scene);
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<SceneSettings>,
) {
    // Z is up; the camera system places the eye every frame
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 1.0,
            far: 200_000.0,
            ..default()
        }),
        Transform::from_xyz(1000.0, -1000.0, 800.0).looking_at(Vec3::ZERO, Vec3::Z),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.95, 1.0),
        brightness: 300.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(2.0, 2.0, 4.0).looking_at(Vec3::ZERO, Vec3::Z),
        MainDirectionalLight,
    ));

    // Fill light from the opposite side
    commands.spawn((
        DirectionalLight {
            illuminance: 1500.0,
            shadows_enabled: false,
            color: Color::srgb(1.0, 0.95, 0.9),
            ..default()
        },
        Transform::from_xyz(-2.0, -1.0, 1.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));

    // Grid on the X-Y plane
    let spacing = settings.grid_spacing;
    let extent = settings.grid_lines as f32 * spacing;
    let thickness = spacing * 0.005;

    let line_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.4, 0.4, 0.4, 0.5),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let line_mesh_x = meshes.add(Cuboid::new(extent * 2.0, thickness, thickness));
    let line_mesh_y = meshes.add(Cuboid::new(thickness, extent * 2.0, thickness));

    for i in -settings.grid_lines..=settings.grid_lines {
        let offset = i as f32 * spacing;
        commands.spawn((
            Mesh3d(line_mesh_x.clone()),
            MeshMaterial3d(line_material.clone()),
            Transform::from_translation(Vec3::new(0.0, offset, 0.0)),
            GridLine,
        ));
        commands.spawn((
            Mesh3d(line_mesh_y.clone()),
            MeshMaterial3d(line_material.clone()),
            Transform::from_translation(Vec3::new(offset, 0.0, 0.0)),
            GridLine,
        ));
    }

    // World axes: cylinder + cone per axis, Bevy primitives are Y-aligned
    let axis_length = spacing * 3.0;
    let axis_radius = spacing * 0.02;
    let cone_height = axis_radius * 6.0;
    let shaft = meshes.add(Cylinder::new(axis_radius, axis_length));
    let tip = meshes.add(Cone::new(axis_radius * 2.5, cone_height));

    let axes = [
        (Color::srgb(0.9, 0.2, 0.2), Vec3::X, Quat::from_rotation_z(-FRAC_PI_2)),
        (Color::srgb(0.2, 0.9, 0.2), Vec3::Y, Quat::IDENTITY),
        (Color::srgb(0.2, 0.2, 0.9), Vec3::Z, Quat::from_rotation_x(FRAC_PI_2)),
    ];
    for (color, direction, rotation) in axes {
        let material = materials.add(StandardMaterial {
            base_color: color,
            unlit: true,
            ..default()
        });
        commands.spawn((
            Mesh3d(shaft.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(direction * axis_length / 2.0).with_rotation(rotation),
            WorldAxis,
        ));
        commands.spawn((
            Mesh3d(tip.clone()),
            MeshMaterial3d(material),
            Transform::from_translation(direction * (axis_length + cone_height / 2.0))
                .with_rotation(rotation),
            WorldAxis,
        ));
    }
}
