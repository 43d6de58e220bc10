//! Dispatch of picked files to the editor

use bevy::prelude::*;
use weldmap_core::{Notice, TransientResource, ViewDirection};
use weldmap_scene::{EditorState, ViewRequest};

use crate::file_picker::{FileOperation, FilePickerContext, FilePickerResult, FilePickerState};

/// Plugin for table import and model loading
pub struct FileLoaderPlugin;

impl Plugin for FileLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, process_file_picker_results);
    }
}

/// Resource record for a loaded model. The bytes are parsed in memory on
/// both targets, so nothing outlives the load and there is nothing to release.
fn model_resource(result: &FilePickerResult) -> TransientResource {
    TransientResource::none(model_name(result))
}

/// Identifier the cross-section service resolves the model by: the full
/// path on desktop, the bare file name in the browser
fn model_name(result: &FilePickerResult) -> &str {
    result.path.as_deref().unwrap_or(&result.filename)
}

/// Apply one picker result to the editor. Returns whether the camera should
/// frame the scene afterwards.
pub fn apply_result(editor: &mut EditorState, result: FilePickerResult) -> bool {
    if !result.success {
        let message = result.error.unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(file = %result.filename, "File operation failed: {}", message);
        let title = match result.operation {
            FileOperation::Open => "Open failed",
            FileOperation::Save => "Save failed",
        };
        editor.notify(Notice::error(title, format!("{}: {}", result.filename, message)));
        return false;
    }

    match result.context {
        FilePickerContext::ImportTable(kind) => {
            let Some(content) = result.content.as_deref() else {
                return false;
            };
            tracing::info!(kind = %kind, file = %result.filename, bytes = content.len(), "Importing table");
            editor.import_table(kind, content)
        }
        FilePickerContext::LoadModel => {
            let Some(content) = result.content.as_deref() else {
                return false;
            };
            let resource = model_resource(&result);
            editor.load_model(model_name(&result), content, resource)
        }
        FilePickerContext::ExportTable(kind) => {
            tracing::info!(kind = %kind, file = %result.filename, "Export completed");
            editor.notify(Notice::info("Export", format!("Saved {}", result.filename)));
            false
        }
    }
}

/// Process completed file picker results
fn process_file_picker_results(
    mut file_picker_state: ResMut<FilePickerState>,
    mut editor: ResMut<EditorState>,
    mut view_request: ResMut<ViewRequest>,
) {
    while let Some(result) = file_picker_state.take_result() {
        if apply_result(&mut editor, result) {
            view_request.0 = Some(ViewDirection::Isometric);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weldmap_core::{EntityKind, NoticeLevel};

    fn opened(context: FilePickerContext, filename: &str, content: &[u8]) -> FilePickerResult {
        FilePickerResult {
            context,
            operation: FileOperation::Open,
            filename: filename.to_string(),
            path: None,
            content: Some(content.to_vec()),
            success: true,
            error: None,
        }
    }

    #[test]
    fn test_import_table_result() {
        let mut editor = EditorState::default();
        let result = opened(
            FilePickerContext::ImportTable(EntityKind::Locator),
            "locators.csv",
            b"id,x,y,z,rx,ry,rz\nL1,0,0,0,0,90,0\n",
        );
        assert!(apply_result(&mut editor, result));
        assert!(editor.store().get(EntityKind::Locator, "L1").is_some());
    }

    #[test]
    fn test_unsupported_model_leaves_store_untouched() {
        let mut editor = EditorState::default();
        let result = opened(FilePickerContext::LoadModel, "part.step", b"ISO-10303-21;");
        assert!(!apply_result(&mut editor, result));
        assert!(editor.store().model().is_none());
        assert_eq!(editor.drain_notices()[0].title, "Unsupported format");
    }

    #[test]
    fn test_failed_open_is_reported() {
        let mut editor = EditorState::default();
        let result = FilePickerResult {
            context: FilePickerContext::LoadModel,
            operation: FileOperation::Open,
            filename: "part.stl".to_string(),
            path: None,
            content: None,
            success: false,
            error: Some("permission denied".to_string()),
        };
        assert!(!apply_result(&mut editor, result));
        let notices = editor.drain_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("permission denied"));
    }

    #[test]
    fn test_loaded_model_holds_no_release() {
        let mut editor = EditorState::default();
        let result = opened(FilePickerContext::LoadModel, "cube.obj", b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert!(apply_result(&mut editor, result));
        let resource = editor.store().model().unwrap().resource();
        assert_eq!(resource.label(), "cube.obj");
        assert!(format!("{:?}", resource).contains("pending_release: false"));
    }

    #[test]
    fn test_model_name_prefers_path() {
        let mut result = opened(FilePickerContext::LoadModel, "part.obj", b"");
        assert_eq!(model_name(&result), "part.obj");
        result.path = Some("/data/part.obj".to_string());
        assert_eq!(model_name(&result), "/data/part.obj");
    }
}
