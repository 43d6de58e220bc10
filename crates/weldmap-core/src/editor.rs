//! Application state container
//!
//! [`Editor`] owns the store, the process filter, the selection controller
//! and the property form, and exposes one method per operator action.
//! Failures never escape: they become [`Notice`]s for the UI to show.

use std::collections::VecDeque;
use tracing::{info, warn};

use crate::config::ViewerConfig;
use crate::entity::{Entity, EntityKind, EntityPatch, Field};
use crate::error::EditorError;
use crate::filter::ProcessFilter;
use crate::form::PropertyForm;
use crate::model::{ReferenceModel, TransientResource};
use crate::section::{LocatorRecord, SectionRequest};
use crate::selection::{PendingDelete, Selection, SelectionController, VisualHandle};
use crate::store::{AddRequest, EntityStore};
use crate::table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the operator
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl From<&EditorError> for Notice {
    fn from(e: &EditorError) -> Self {
        let level = match e {
            EditorError::LookupMiss(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Self {
            level,
            title: e.category().to_string(),
            message: e.to_string(),
        }
    }
}

pub struct Editor<V> {
    store: EntityStore,
    filter: ProcessFilter,
    selection: SelectionController<V>,
    form: PropertyForm,
    notices: VecDeque<Notice>,
    default_process: String,
}

impl<V: VisualHandle> Default for Editor<V> {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

impl<V: VisualHandle> Editor<V> {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            store: EntityStore::new(),
            filter: ProcessFilter::new(),
            selection: SelectionController::new(),
            form: PropertyForm::new(),
            notices: VecDeque::new(),
            default_process: config.default_process.clone(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn filter(&self) -> &ProcessFilter {
        &self.filter
    }

    pub fn form(&self) -> &PropertyForm {
        &self.form
    }

    /// Staged form text for widgets to edit
    pub fn form_mut(&mut self) -> &mut PropertyForm {
        &mut self.form
    }

    pub fn selection(&self) -> Option<&Selection<V>> {
        self.selection.selected()
    }

    pub fn is_selected(&self, kind: EntityKind, id: &str) -> bool {
        self.selection.is_selected(kind, id)
    }

    pub fn handle_mut(&mut self) -> Option<&mut V> {
        self.selection.handle_mut()
    }

    pub fn is_dragging(&self) -> bool {
        self.selection.is_dragging()
    }

    pub fn take_orbit_request(&mut self) -> Option<[f64; 3]> {
        self.selection.take_orbit_request()
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.selection.pending_delete()
    }

    /// Report an error as a notice
    fn report(&mut self, error: EditorError) {
        warn!(category = error.category(), "{}", error);
        self.notices.push_back(Notice::from(&error));
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Replace one kind's collection from CSV bytes
    pub fn import_table(&mut self, kind: EntityKind, bytes: &[u8]) -> bool {
        let result = table::read_records(kind, bytes).and_then(|records| self.store.load(kind, &records));
        match result {
            Ok(count) => {
                self.selection.reconcile(&self.store, &mut self.form);
                self.refresh_filter();
                self.notify(Notice::info(
                    "Import",
                    format!("Loaded {} {}", count, kind.plural().to_lowercase()),
                ));
                true
            }
            Err(e) => {
                self.report(e.into());
                false
            }
        }
    }

    /// CSV bytes of the currently visible entities of `kind`
    pub fn export_table(&mut self, kind: EntityKind) -> Option<Vec<u8>> {
        let visible = self.filter.apply(&self.store, kind);
        match table::write_records(kind, visible) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                self.report(EditorError::Export(e.to_string()));
                None
            }
        }
    }

    /// Parse and install a reference model. On failure nothing changes and
    /// `resource` is released.
    pub fn load_model(&mut self, name: &str, bytes: &[u8], resource: TransientResource) -> bool {
        match ReferenceModel::load(name, bytes, resource) {
            Ok(model) => {
                self.store.set_model(model);
                true
            }
            Err(e) => {
                self.report(e.into());
                false
            }
        }
    }

    /// Create an entity at `position` and select it. Returns the new id.
    pub fn add_entity(&mut self, kind: EntityKind, position: [f64; 3]) -> String {
        let process = self
            .filter
            .specific()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_process.clone());
        let id = self.store.add(kind, AddRequest { position, process });
        self.refresh_filter();
        self.selection.select(&self.store, &mut self.form, kind, &id, None);
        info!(kind = %kind, id = %id, "Added entity");
        id
    }

    pub fn select(&mut self, kind: EntityKind, id: &str, handle: Option<V>) {
        self.selection.select(&self.store, &mut self.form, kind, id, handle);
    }

    pub fn attach_handle(&mut self, kind: EntityKind, id: &str, handle: V) -> bool {
        self.selection.attach_handle(&self.store, kind, id, handle)
    }

    pub fn deselect(&mut self) -> bool {
        self.selection.deselect(&mut self.form)
    }

    /// Commit one form field if its staged text changed. Rejected edits
    /// revert the field and raise a notice.
    pub fn commit_field(&mut self, field: Field) -> bool {
        let Some(text) = self.form.pending(field).map(str::to_string) else {
            return false;
        };
        let result = EntityPatch::from_field_text(field, &text)
            .map_err(EditorError::from)
            .and_then(|patch| self.selection.commit(&mut self.store, &mut self.form, &patch));
        match result {
            Ok(()) => {
                self.refresh_filter();
                true
            }
            Err(e) => {
                self.form.revert(field);
                self.report(e);
                false
            }
        }
    }

    pub fn commit_patch(&mut self, patch: &EntityPatch) -> bool {
        match self.selection.commit(&mut self.store, &mut self.form, patch) {
            Ok(()) => {
                self.refresh_filter();
                true
            }
            Err(e) => {
                self.form.revert_all();
                self.report(e);
                false
            }
        }
    }

    pub fn begin_transform(&mut self) -> bool {
        self.selection.begin_transform()
    }

    pub fn transform_end(&mut self) -> bool {
        match self.selection.transform_end(&mut self.store, &mut self.form) {
            Ok(()) => true,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn cancel_transform(&mut self) {
        self.selection.cancel_transform(&self.store);
    }

    pub fn request_delete(&mut self) -> bool {
        match self.selection.request_delete() {
            Ok(_) => true,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn confirm_delete(&mut self) -> bool {
        let removed = self.selection.confirm_delete(&mut self.store, &mut self.form);
        if removed {
            self.refresh_filter();
        }
        removed
    }

    pub fn cancel_delete(&mut self) {
        self.selection.cancel_delete();
    }

    pub fn set_filter(&mut self, value: &str) -> bool {
        self.filter.select(value)
    }

    /// Bring the filter options up to date with the store
    pub fn refresh_filter(&mut self) -> bool {
        self.filter.refresh(&self.store)
    }

    pub fn filtered(&self, kind: EntityKind) -> Vec<&Entity> {
        self.filter.apply(&self.store, kind)
    }

    /// Request body for the selected locator against the loaded model
    pub fn section_request(&mut self) -> Option<SectionRequest> {
        match self.build_section_request() {
            Ok(request) => Some(request),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    fn build_section_request(&self) -> Result<SectionRequest, EditorError> {
        let model = self
            .store
            .model()
            .ok_or_else(|| EditorError::LookupMiss("load a reference model first".to_string()))?;
        let locator = self
            .selection
            .selected()
            .filter(|s| s.kind == EntityKind::Locator)
            .and_then(|s| self.store.get(s.kind, &s.id))
            .ok_or_else(|| EditorError::LookupMiss("select a locator first".to_string()))?;
        Ok(SectionRequest {
            obj_file_path: model.name.clone(),
            locators: vec![LocatorRecord::from_entity(locator)?],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::CUBE_OBJ;
    use crate::selection::tests::TestHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const WELDS: &[u8] = b"id,process,x,y,z\nW1,P1,1,2,3\nW2,P2,4,5,6\n";

    fn editor() -> Editor<TestHandle> {
        let mut editor = Editor::default();
        assert!(editor.import_table(EntityKind::WeldPoint, WELDS));
        editor.drain_notices();
        editor
    }

    fn stage(editor: &mut Editor<TestHandle>, field: Field, text: &str) {
        *editor.form_mut().staged_mut(field).unwrap() = text.to_string();
    }

    #[test]
    fn test_import_then_filter() {
        let mut editor = editor();
        assert_eq!(editor.filter().options(), ["ALL", "P1", "P2"]);
        assert!(editor.set_filter("P1"));
        let ids: Vec<_> = editor.filtered(EntityKind::WeldPoint).iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, ["W1"]);
    }

    #[test]
    fn test_import_failure_keeps_collection_and_notifies() {
        let mut editor = editor();
        assert!(!editor.import_table(EntityKind::WeldPoint, b"id,x,y\nW9,1,2\n"));
        assert_eq!(editor.store().collection(EntityKind::WeldPoint).len(), 2);
        let notices = editor.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].title, "Import");
    }

    #[test]
    fn test_commit_field_then_reselect() {
        let mut editor = editor();
        editor.select(EntityKind::WeldPoint, "W1", None);
        stage(&mut editor, Field::X, "10");
        assert!(editor.commit_field(Field::X));
        assert!(editor.deselect());
        editor.select(EntityKind::WeldPoint, "W1", None);
        assert_eq!(editor.form().staged(Field::X), Some("10.000"));
    }

    #[test]
    fn test_unchanged_field_is_not_committed() {
        let mut editor = editor();
        editor.select(EntityKind::WeldPoint, "W1", None);
        let revision = editor.store().revision();
        stage(&mut editor, Field::X, "1");
        assert!(!editor.commit_field(Field::X));
        assert_eq!(editor.store().revision(), revision);
    }

    #[test]
    fn test_small_edit_is_committed() {
        let mut editor = editor();
        editor.select(EntityKind::WeldPoint, "W1", None);
        stage(&mut editor, Field::X, "1.0004");
        assert!(editor.commit_field(Field::X));
        let w1 = editor.store().get(EntityKind::WeldPoint, "W1").unwrap();
        assert_eq!(w1.position_f64(), Some([1.0004, 2.0, 3.0]));
    }

    #[test]
    fn test_duplicate_id_reverts_and_notifies() {
        let mut editor = editor();
        editor.select(EntityKind::WeldPoint, "W2", None);
        stage(&mut editor, Field::Id, "W1");
        assert!(!editor.commit_field(Field::Id));
        assert_eq!(editor.form().staged(Field::Id), Some("W2"));
        assert!(editor.store().get(EntityKind::WeldPoint, "W2").is_some());
        let notices = editor.drain_notices();
        assert_eq!(notices[0].title, "Validation");
    }

    #[test]
    fn test_bad_number_reverts() {
        let mut editor = editor();
        editor.select(EntityKind::WeldPoint, "W1", None);
        stage(&mut editor, Field::Y, "two");
        assert!(!editor.commit_field(Field::Y));
        assert_eq!(editor.form().staged(Field::Y), Some("2.000"));
        assert_eq!(editor.drain_notices().len(), 1);
    }

    #[test]
    fn test_add_uses_filter_process_and_selects() {
        let mut editor = editor();
        editor.set_filter("P2");
        let id = editor.add_entity(EntityKind::Pin, [1.0, 1.0, 1.0]);
        assert!(editor.is_selected(EntityKind::Pin, &id));
        assert_eq!(editor.store().get(EntityKind::Pin, &id).unwrap().process, "P2");

        editor.set_filter("ALL");
        let id = editor.add_entity(EntityKind::Pin, [0.0; 3]);
        assert_eq!(editor.store().get(EntityKind::Pin, &id).unwrap().process, "");
    }

    #[test]
    fn test_delete_flow() {
        let mut editor = editor();
        assert!(!editor.request_delete());
        assert_eq!(editor.drain_notices()[0].level, NoticeLevel::Warning);

        editor.select(EntityKind::WeldPoint, "W1", None);
        assert!(editor.request_delete());
        assert!(editor.store().get(EntityKind::WeldPoint, "W1").is_some());
        assert!(editor.confirm_delete());
        assert!(editor.store().get(EntityKind::WeldPoint, "W1").is_none());
        assert!(editor.selection().is_none());
        assert_eq!(editor.filter().options(), ["ALL", "P2"]);
    }

    #[test]
    fn test_export_uses_filtered_view() {
        let mut editor = editor();
        editor.set_filter("P2");
        let bytes = editor.export_table(EntityKind::WeldPoint).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "id,process,x,y,z,gun,notes\nW2,P2,4,5,6,,\n");
    }

    #[test]
    fn test_model_reload_releases_previous() {
        let mut editor = editor();
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let first = TransientResource::new("first", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(editor.load_model("cube.obj", CUBE_OBJ.as_bytes(), first));
        assert!(editor.load_model("cube.obj", CUBE_OBJ.as_bytes(), TransientResource::none("second")));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        assert!(!editor.load_model("cube.step", b"", TransientResource::none("third")));
        assert_eq!(editor.drain_notices()[0].title, "Unsupported format");
        assert_eq!(editor.store().model().unwrap().resource().label(), "second");
    }

    #[test]
    fn test_section_request_needs_model_and_locator() {
        let mut editor = editor();
        assert!(editor.section_request().is_none());

        editor.load_model("part.obj", CUBE_OBJ.as_bytes(), TransientResource::none("part"));
        editor.select(EntityKind::WeldPoint, "W1", None);
        assert!(editor.section_request().is_none());

        let id = editor.add_entity(EntityKind::Locator, [1.0, 2.0, 3.0]);
        let request = editor.section_request().unwrap();
        assert_eq!(request.obj_file_path, "part.obj");
        assert_eq!(request.locators[0].id, id);
        assert_eq!(editor.drain_notices().len(), 2);
    }

    #[test]
    fn test_drag_commits_through_editor() {
        let mut editor = editor();
        editor.select(EntityKind::WeldPoint, "W1", Some(TestHandle::default()));
        assert!(editor.begin_transform());
        assert!(!editor.deselect());
        editor.handle_mut().unwrap().position = [7.0, 8.0, 9.0];
        assert!(editor.transform_end());
        assert_eq!(
            editor.store().get(EntityKind::WeldPoint, "W1").unwrap().position_f64(),
            Some([7.0, 8.0, 9.0])
        );
        assert_eq!(editor.form().staged(Field::Z), Some("9.000"));
    }
}
