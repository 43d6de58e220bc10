//! Selection and synchronization controller
//!
//! Keeps the store, the property form and the live visual handle of the
//! selected entity consistent. The controller only sees handles through
//! [`VisualHandle`], so it is independent of the renderer.

use tracing::{debug, warn};

use crate::entity::{EntityKind, EntityPatch};
use crate::error::EditorError;
use crate::form::PropertyForm;
use crate::store::EntityStore;

/// Live 3D representation of an entity. Rotation is XYZ Euler in radians.
pub trait VisualHandle {
    fn position(&self) -> [f64; 3];
    fn set_position(&mut self, position: [f64; 3]);
    fn rotation(&self) -> [f64; 3];
    fn set_rotation(&mut self, rotation: [f64; 3]);
}

/// The selected entity and, when the renderer has supplied one, its handle
#[derive(Debug, Clone)]
pub struct Selection<V> {
    pub kind: EntityKind,
    pub id: String,
    pub handle: Option<V>,
}

impl<V> Selection<V> {
    pub fn is(&self, kind: EntityKind, id: &str) -> bool {
        self.kind == kind && self.id == id
    }
}

#[derive(Debug, Clone)]
pub enum SelectionState<V> {
    Idle,
    Selected(Selection<V>),
}

/// A delete waiting for operator confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub kind: EntityKind,
    pub id: String,
}

#[derive(Debug)]
pub struct SelectionController<V> {
    state: SelectionState<V>,
    dragging: bool,
    pending_delete: Option<PendingDelete>,
    orbit_request: Option<[f64; 3]>,
}

impl<V> Default for SelectionController<V> {
    fn default() -> Self {
        Self {
            state: SelectionState::Idle,
            dragging: false,
            pending_delete: None,
            orbit_request: None,
        }
    }
}

impl<V: VisualHandle> SelectionController<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState<V> {
        &self.state
    }

    pub fn selected(&self) -> Option<&Selection<V>> {
        match &self.state {
            SelectionState::Selected(selection) => Some(selection),
            SelectionState::Idle => None,
        }
    }

    pub fn is_selected(&self, kind: EntityKind, id: &str) -> bool {
        self.selected().is_some_and(|s| s.is(kind, id))
    }

    pub fn handle(&self) -> Option<&V> {
        self.selected().and_then(|s| s.handle.as_ref())
    }

    /// Mutable handle access for the renderer while dragging
    pub fn handle_mut(&mut self) -> Option<&mut V> {
        match &mut self.state {
            SelectionState::Selected(selection) => selection.handle.as_mut(),
            SelectionState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    /// Orbit target the camera should move to, consumed once
    pub fn take_orbit_request(&mut self) -> Option<[f64; 3]> {
        self.orbit_request.take()
    }

    /// Select an entity. A missing entity is tolerated and leaves the form empty.
    pub fn select(
        &mut self,
        store: &EntityStore,
        form: &mut PropertyForm,
        kind: EntityKind,
        id: &str,
        handle: Option<V>,
    ) {
        let entity = store.get(kind, id);
        if entity.is_none() {
            warn!(kind = %kind, id = %id, "Selected entity not found in store");
        }
        form.load(entity);

        if let Some(handle) = &handle {
            self.orbit_request = Some(handle.position());
        }
        debug!(kind = %kind, id = %id, has_handle = handle.is_some(), "Selected");
        self.state = SelectionState::Selected(Selection {
            kind,
            id: id.to_string(),
            handle,
        });
        self.pending_delete = None;
    }

    /// Supply the handle for a selection made without one.
    ///
    /// The handle is brought in line with the committed values and the camera
    /// recenters on it. Returns `false` if `(kind, id)` is not the selection
    /// or a handle is already attached.
    pub fn attach_handle(&mut self, store: &EntityStore, kind: EntityKind, id: &str, handle: V) -> bool {
        let SelectionState::Selected(selection) = &mut self.state else {
            return false;
        };
        if !selection.is(kind, id) || selection.handle.is_some() {
            return false;
        }
        let handle = selection.handle.insert(handle);
        sync_handle(store, kind, id, handle);
        self.orbit_request = Some(handle.position());
        debug!(kind = %kind, id = %id, "Attached visual handle");
        true
    }

    /// Return to idle. Ignored while a drag is in progress.
    pub fn deselect(&mut self, form: &mut PropertyForm) -> bool {
        if self.dragging {
            debug!("Ignoring deselect during drag");
            return false;
        }
        self.clear(form);
        true
    }

    fn clear(&mut self, form: &mut PropertyForm) {
        self.state = SelectionState::Idle;
        self.dragging = false;
        self.pending_delete = None;
        self.orbit_request = Some([0.0; 3]);
        form.clear();
    }

    /// Apply a validated patch to the selected entity.
    ///
    /// On success the form is refreshed from the store and the handle is
    /// moved to the committed transform. An id change re-keys the selection.
    pub fn commit(
        &mut self,
        store: &mut EntityStore,
        form: &mut PropertyForm,
        patch: &EntityPatch,
    ) -> Result<(), EditorError> {
        let SelectionState::Selected(selection) = &mut self.state else {
            return Err(EditorError::LookupMiss("nothing is selected".to_string()));
        };
        if !store.update(selection.kind, &selection.id, patch)? {
            warn!(kind = %selection.kind, id = %selection.id, "Commit target no longer exists");
            return Err(EditorError::LookupMiss(format!(
                "{} '{}' no longer exists",
                selection.kind, selection.id
            )));
        }
        if let Some(new_id) = &patch.id {
            selection.id = new_id.trim().to_string();
        }

        form.load(store.get(selection.kind, &selection.id));
        if let Some(handle) = selection.handle.as_mut() {
            sync_handle(store, selection.kind, &selection.id, handle);
        }
        Ok(())
    }

    /// Drag start. Requires a selection with an attached handle.
    pub fn begin_transform(&mut self) -> bool {
        if self.handle().is_none() {
            return false;
        }
        self.dragging = true;
        true
    }

    /// Drag end: commit the handle's transform
    pub fn transform_end(&mut self, store: &mut EntityStore, form: &mut PropertyForm) -> Result<(), EditorError> {
        self.dragging = false;
        let Some(selection) = self.selected() else {
            return Ok(());
        };
        let Some(handle) = selection.handle.as_ref() else {
            return Ok(());
        };

        let mut patch = EntityPatch::position(handle.position());
        if selection.kind.has_rotation() {
            patch = patch.with_rotation(handle.rotation().map(f64::to_degrees));
        }
        self.commit(store, form, &patch)
    }

    /// Abandon a drag without committing; the handle snaps back to the store
    pub fn cancel_transform(&mut self, store: &EntityStore) {
        self.dragging = false;
        if let SelectionState::Selected(selection) = &mut self.state {
            if let Some(handle) = selection.handle.as_mut() {
                sync_handle(store, selection.kind, &selection.id, handle);
            }
        }
    }

    /// First step of a delete; the selection must be active
    pub fn request_delete(&mut self) -> Result<&PendingDelete, EditorError> {
        let Some(selection) = self.selected() else {
            return Err(EditorError::LookupMiss("select an entity to delete".to_string()));
        };
        let pending = PendingDelete {
            kind: selection.kind,
            id: selection.id.clone(),
        };
        Ok(self.pending_delete.insert(pending))
    }

    /// Remove the pending entity and return to idle. Returns whether anything was removed.
    pub fn confirm_delete(&mut self, store: &mut EntityStore, form: &mut PropertyForm) -> bool {
        let Some(pending) = self.pending_delete.take() else {
            return false;
        };
        let removed = store.remove(pending.kind, &pending.id);
        if self.is_selected(pending.kind, &pending.id) {
            self.clear(form);
        }
        removed
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Re-read the selected entity after a bulk change to the store. The
    /// form and any attached handle take the reloaded values.
    pub fn reconcile(&mut self, store: &EntityStore, form: &mut PropertyForm) {
        let SelectionState::Selected(selection) = &mut self.state else {
            return;
        };
        if let Some(entity) = store.get(selection.kind, &selection.id) {
            form.load(Some(entity));
            if let Some(handle) = selection.handle.as_mut() {
                sync_handle(store, selection.kind, &selection.id, handle);
            }
        } else {
            debug!(kind = %selection.kind, id = %selection.id, "Selection vanished after reload");
            self.clear(form);
        }
    }
}

/// Move a handle to the entity's committed position and rotation
fn sync_handle<V: VisualHandle>(store: &EntityStore, kind: EntityKind, id: &str, handle: &mut V) {
    let Some(entity) = store.get(kind, id) else {
        return;
    };
    if let Some(position) = entity.position_f64() {
        handle.set_position(position);
    }
    if let Some(rotation) = entity.rotation_deg() {
        handle.set_rotation(rotation.map(f64::to_radians));
    }
}
