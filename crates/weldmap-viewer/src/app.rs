//! Application setup and shared resources

use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::{DefaultPickingPlugins, prelude::MeshPickingPlugin};
use weldmap_core::ViewerConfig;
use weldmap_scene::{EditorState, SceneSettings, UiLayout, WeldmapScenePlugin};

use crate::file_loader::FileLoaderPlugin;
use crate::file_picker::FilePickerPlugin;
use crate::section_client::SectionClientPlugin;
use crate::ui::UiPlugin;

/// Configuration the viewer was started with
#[derive(Resource, Debug, Clone, Default)]
pub struct ViewerSettings {
    pub config: ViewerConfig,
}

/// Read `?section=` from the page URL, falling back to defaults
#[cfg(target_arch = "wasm32")]
pub fn browser_config() -> ViewerConfig {
    let mut config = ViewerConfig::default();

    let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) else {
        return config;
    };
    if let Ok(url) = web_sys::Url::new(&href) {
        if let Some(section_url) = url.search_params().get("section") {
            tracing::info!("Using cross-section service from URL parameter: {}", section_url);
            config.section_url = section_url;
        }
    }
    config
}

/// Run the Bevy application
pub fn run(config: ViewerConfig) {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .insert_resource(WinitSettings::default())
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Weldmap".to_string(),
                canvas: Some("#weldmap-canvas".to_string()),
                fit_canvas_to_parent: true,
                prevent_default_event_handling: false,
                ..default()
            }),
            ..default()
        }))
        // Picking plugins must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(EditorState::new(&config))
        .insert_resource(SceneSettings::from_config(&config))
        .insert_resource(ViewerSettings { config })
        .init_resource::<UiLayout>()
        .add_plugins(WeldmapScenePlugin)
        .add_plugins(FilePickerPlugin)
        .add_plugins(FileLoaderPlugin)
        .add_plugins(SectionClientPlugin)
        .add_plugins(UiPlugin)
        .run();
}
