//! File picking and saving for tables and reference models
//!
//! The browser build uses a hidden `<input type="file">` and a Blob download;
//! the desktop build uses native dialogs. Either way results land in a
//! shared queue drained once per frame.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use weldmap_core::EntityKind;

/// File picker plugin
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FilePickerState>()
            .init_resource::<PendingFileResults>()
            .add_systems(Update, process_file_results);
    }
}

/// Type of file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Open,
    Save,
}

/// What the picked file is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePickerContext {
    /// Replace one kind's collection from CSV
    ImportTable(EntityKind),
    /// Load an STL or OBJ reference model
    LoadModel,
    /// Save one kind's visible entities as CSV
    ExportTable(EntityKind),
}

/// File filter for the picker dialog
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Display name (e.g., "CSV Files")
    pub name: String,
    /// File extensions without dots (e.g., ["stl", "obj"])
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn csv() -> Self {
        Self {
            name: "CSV Files".to_string(),
            extensions: vec!["csv".to_string()],
        }
    }

    pub fn model() -> Self {
        Self {
            name: "3D Models".to_string(),
            extensions: vec!["stl".to_string(), "obj".to_string()],
        }
    }

    /// Convert to accept string for HTML input element
    pub fn to_accept_string(&self) -> String {
        if self.extensions.is_empty() {
            "*".to_string()
        } else {
            self.extensions
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

/// Result from a file picker operation
#[derive(Debug, Clone)]
pub struct FilePickerResult {
    pub context: FilePickerContext,
    pub operation: FileOperation,
    /// Filename (without path)
    pub filename: String,
    /// Full path on desktop; `None` in the browser
    pub path: Option<String>,
    /// File content (for open operations)
    pub content: Option<Vec<u8>>,
    pub success: bool,
    pub error: Option<String>,
}

impl FilePickerResult {
    fn failed(context: FilePickerContext, operation: FileOperation, filename: &str, error: String) -> Self {
        Self {
            context,
            operation,
            filename: filename.to_string(),
            path: None,
            content: None,
            success: false,
            error: Some(error),
        }
    }
}

/// Results pushed by dialog callbacks
#[derive(Resource, Default)]
pub struct PendingFileResults(pub Arc<Mutex<VecDeque<FilePickerResult>>>);

/// Completed results ready for dispatch
#[derive(Resource, Default)]
pub struct FilePickerState {
    pub completed_results: VecDeque<FilePickerResult>,
}

impl FilePickerState {
    /// Take the next completed result
    pub fn take_result(&mut self) -> Option<FilePickerResult> {
        self.completed_results.pop_front()
    }
}

/// System to process file results from dialog callbacks
fn process_file_results(pending: Res<PendingFileResults>, mut picker_state: ResMut<FilePickerState>) {
    if let Ok(mut pending_results) = pending.0.lock() {
        picker_state.completed_results.extend(pending_results.drain(..));
    }
}

fn push_result(pending: &Arc<Mutex<VecDeque<FilePickerResult>>>, result: FilePickerResult) {
    if let Ok(mut results) = pending.lock() {
        results.push_back(result);
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Blob, HtmlInputElement, Url};

    /// Open a file picker dialog using a hidden HTML input element
    pub fn open_file_picker(
        filter: &FileFilter,
        pending_results: Arc<Mutex<VecDeque<FilePickerResult>>>,
        context: FilePickerContext,
    ) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            Some(input) => input,
            None => {
                tracing::error!("open_file_picker: failed to create input element");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(&filter.to_accept_string());
        input.style().set_property("display", "none").ok();

        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input to body: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, pending_results.clone(), context);
            } else {
                tracing::debug!("open_file_picker: no file selected");
            }

            // Remove the input element
            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    fn read_file(file: web_sys::File, pending: Arc<Mutex<VecDeque<FilePickerResult>>>, context: FilePickerContext) {
        let filename = file.name();
        let reader = match web_sys::FileReader::new() {
            Ok(reader) => reader,
            Err(e) => {
                let error = format!("FileReader unavailable: {:?}", e);
                push_result(&pending, FilePickerResult::failed(context, FileOperation::Open, &filename, error));
                return;
            }
        };
        let reader_clone = reader.clone();

        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let content = reader_clone
                .result()
                .ok()
                .and_then(|r| r.dyn_into::<js_sys::ArrayBuffer>().ok())
                .map(|buffer| js_sys::Uint8Array::new(&buffer).to_vec());

            let result = match content {
                Some(content) => FilePickerResult {
                    context,
                    operation: FileOperation::Open,
                    filename: filename.clone(),
                    path: None,
                    content: Some(content),
                    success: true,
                    error: None,
                },
                None => FilePickerResult::failed(
                    context,
                    FileOperation::Open,
                    &filename,
                    "could not read file".to_string(),
                ),
            };
            push_result(&pending, result);
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
        reader.read_as_array_buffer(&file).ok();
    }

    /// Wrap bytes in a Blob and return its object URL
    fn create_object_url(content: &[u8], mime_type: &str) -> Option<String> {
        let uint8_array = js_sys::Uint8Array::from(content);
        let array = js_sys::Array::new();
        array.push(&uint8_array.buffer());

        let blob_options = web_sys::BlobPropertyBag::new();
        blob_options.set_type(mime_type);

        let blob = Blob::new_with_u8_array_sequence_and_options(&array, &blob_options).ok()?;
        Url::create_object_url_with_blob(&blob).ok()
    }

    fn revoke_object_url(url: &str) {
        Url::revoke_object_url(url).ok();
    }

    /// Save content to a file using a download link
    pub fn save_file(
        filename: &str,
        content: &[u8],
        mime_type: &str,
        pending_results: Arc<Mutex<VecDeque<FilePickerResult>>>,
        context: FilePickerContext,
    ) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };
        let Some(url) = create_object_url(content, mime_type) else {
            let error = "could not create download".to_string();
            push_result(&pending_results, FilePickerResult::failed(context, FileOperation::Save, filename, error));
            return;
        };

        // Temporary anchor element for the download
        let Ok(anchor) = document.create_element("a") else {
            revoke_object_url(&url);
            return;
        };
        anchor.set_attribute("href", &url).ok();
        anchor.set_attribute("download", filename).ok();

        if let Some(body) = document.body() {
            body.append_child(&anchor).ok();
            if let Some(html_el) = anchor.dyn_ref::<web_sys::HtmlElement>() {
                html_el.click();
            }
            body.remove_child(&anchor).ok();
        }

        // Revoke URL after a delay
        let url_clone = url.clone();
        let closure = Closure::wrap(Box::new(move || {
            revoke_object_url(&url_clone);
        }) as Box<dyn FnMut()>);
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), 1000)
            .ok();
        closure.forget();

        push_result(
            &pending_results,
            FilePickerResult {
                context,
                operation: FileOperation::Save,
                filename: filename.to_string(),
                path: None,
                content: None,
                success: true,
                error: None,
            },
        );
    }
}

// ============================================================================
// Native dialogs
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;
    use rfd::FileDialog;

    fn dialog(filter: &FileFilter) -> FileDialog {
        let extensions: Vec<&str> = filter.extensions.iter().map(String::as_str).collect();
        FileDialog::new().add_filter(&filter.name, &extensions)
    }

    pub fn open_file_picker(
        filter: &FileFilter,
        pending_results: Arc<Mutex<VecDeque<FilePickerResult>>>,
        context: FilePickerContext,
    ) {
        let Some(path) = dialog(filter).pick_file() else {
            tracing::debug!("File dialog cancelled");
            return;
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = match std::fs::read(&path) {
            Ok(content) => FilePickerResult {
                context,
                operation: FileOperation::Open,
                filename,
                path: Some(path.display().to_string()),
                content: Some(content),
                success: true,
                error: None,
            },
            Err(e) => FilePickerResult::failed(context, FileOperation::Open, &filename, e.to_string()),
        };
        push_result(&pending_results, result);
    }

    pub fn save_file(
        filename: &str,
        content: &[u8],
        filter: &FileFilter,
        pending_results: Arc<Mutex<VecDeque<FilePickerResult>>>,
        context: FilePickerContext,
    ) {
        let Some(path) = dialog(filter).set_file_name(filename).save_file() else {
            tracing::debug!("Save dialog cancelled");
            return;
        };

        let result = match std::fs::write(&path, content) {
            Ok(()) => FilePickerResult {
                context,
                operation: FileOperation::Save,
                filename: filename.to_string(),
                path: Some(path.display().to_string()),
                content: None,
                success: true,
                error: None,
            },
            Err(e) => FilePickerResult::failed(context, FileOperation::Save, filename, e.to_string()),
        };
        push_result(&pending_results, result);
    }
}

/// Helper to trigger file open from UI
pub fn trigger_file_open(pending: &PendingFileResults, context: FilePickerContext, filter: FileFilter) {
    tracing::debug!(accept = %filter.to_accept_string(), ?context, "Opening file picker");
    #[cfg(target_arch = "wasm32")]
    js_interop::open_file_picker(&filter, pending.0.clone(), context);
    #[cfg(not(target_arch = "wasm32"))]
    native::open_file_picker(&filter, pending.0.clone(), context);
}

/// Helper to trigger file save from UI
pub fn trigger_file_save(
    pending: &PendingFileResults,
    context: FilePickerContext,
    filename: &str,
    content: &[u8],
    filter: FileFilter,
) {
    #[cfg(target_arch = "wasm32")]
    {
        let _ = filter;
        js_interop::save_file(filename, content, "text/csv", pending.0.clone(), context);
    }
    #[cfg(not(target_arch = "wasm32"))]
    native::save_file(filename, content, &filter, pending.0.clone(), context);
}
