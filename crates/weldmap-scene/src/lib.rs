//! Weldmap Scene - 3D rendering and pointer interaction
//!
//! This crate provides the Bevy half of the Weldmap editor: the orbit
//! camera, the marker renderer that mirrors the editor state, picking and
//! dragging of the selected marker, and the egui widgets shared by the
//! viewer panels.

pub mod camera;
pub mod models;
pub mod picking;
pub mod scene;
pub mod types;
pub mod ui;

use bevy::prelude::*;

/// Plugin that sets up the editor scene. Requires an [`EditorState`]
/// resource and the egui plugin.
pub struct WeldmapScenePlugin;

impl Plugin for WeldmapScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(models::ModelsPlugin)
            .add_plugins(picking::PickingPlugin);
    }
}

// Re-export commonly used types
pub use types::*;
pub use camera::{CameraSettings, MainCamera};
pub use models::Marker;
