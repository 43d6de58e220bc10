//! Entity store: the authoritative copy of every annotation
//!
//! Holds one ordered collection per [`EntityKind`] plus the optional reference
//! model. All mutation goes through the methods here; each successful
//! mutation bumps [`EntityStore::revision`] so views can detect changes.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{Entity, EntityKind, EntityPatch, Field, KindDetail, Scalar};
use crate::error::{ImportError, ValidationError};
use crate::model::ReferenceModel;

/// One imported row, keyed by lower-case column name
pub type RawRecord = BTreeMap<String, String>;

/// Columns every table must provide
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "x", "y", "z"];

/// Parameters for [`EntityStore::add`]
#[derive(Debug, Clone, Default)]
pub struct AddRequest {
    /// Placement hint supplied by the caller (e.g. in front of the camera)
    pub position: [f64; 3],
    pub process: String,
}

#[derive(Debug, Default)]
pub struct EntityStore {
    weld_points: Vec<Entity>,
    locators: Vec<Entity>,
    pins: Vec<Entity>,
    model: Option<ReferenceModel>,
    revision: u64,
    model_revision: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic change counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn collection(&self, kind: EntityKind) -> &[Entity] {
        match kind {
            EntityKind::WeldPoint => &self.weld_points,
            EntityKind::Locator => &self.locators,
            EntityKind::Pin => &self.pins,
        }
    }

    fn collection_mut(&mut self, kind: EntityKind) -> &mut Vec<Entity> {
        match kind {
            EntityKind::WeldPoint => &mut self.weld_points,
            EntityKind::Locator => &mut self.locators,
            EntityKind::Pin => &mut self.pins,
        }
    }

    /// Every entity of every kind
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.weld_points
            .iter()
            .chain(self.locators.iter())
            .chain(self.pins.iter())
    }

    pub fn len(&self) -> usize {
        self.weld_points.len() + self.locators.len() + self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.collection(kind).iter().find(|e| e.id == id)
    }

    /// Whether `id` is used by any entity other than `except`
    pub fn id_in_use(&self, id: &str, except: Option<(EntityKind, &str)>) -> bool {
        self.iter().any(|e| {
            e.id == id
                && except.map_or(true, |(kind, own)| !(e.kind() == kind && e.id == own))
        })
    }

    /// Replace the collection for `kind` from imported rows.
    ///
    /// The whole load is rejected if a row lacks `id`, `x`, `y` or `z`, or if
    /// an id repeats within the rows or collides with another kind.
    pub fn load(&mut self, kind: EntityKind, records: &[RawRecord]) -> Result<usize, ImportError> {
        let entities = records
            .iter()
            .enumerate()
            .map(|(i, record)| entity_from_record(kind, i + 1, record))
            .collect::<Result<Vec<_>, _>>()?;
        self.replace(kind, entities)
    }

    /// Replace the collection for `kind` with already-built entities
    pub fn replace(&mut self, kind: EntityKind, entities: Vec<Entity>) -> Result<usize, ImportError> {
        let mut seen = HashSet::new();
        for entity in &entities {
            if !seen.insert(entity.id.as_str()) {
                return Err(ImportError::DuplicateId(entity.id.clone()));
            }
        }
        for other in EntityKind::ALL.into_iter().filter(|k| *k != kind) {
            if let Some(clash) = self
                .collection(other)
                .iter()
                .find(|e| seen.contains(e.id.as_str()))
            {
                return Err(ImportError::DuplicateId(clash.id.clone()));
            }
        }

        let count = entities.len();
        *self.collection_mut(kind) = entities;
        self.revision += 1;
        info!(kind = %kind, count, "Loaded collection");
        Ok(count)
    }

    /// Append a new entity with a fresh globally-unique id. Returns the id.
    pub fn add(&mut self, kind: EntityKind, request: AddRequest) -> String {
        let mut id = Uuid::new_v4().to_string();
        while self.id_in_use(&id, None) {
            id = Uuid::new_v4().to_string();
        }
        let entity = Entity::new(kind, id.clone(), request.position).with_process(request.process);
        self.collection_mut(kind).push(entity);
        self.revision += 1;
        debug!(kind = %kind, id = %id, "Added entity");
        id
    }

    /// Merge `patch` into the matching entity.
    ///
    /// Returns `Ok(false)` when no entity has that id. An empty or duplicate
    /// id is rejected and nothing is changed.
    pub fn update(
        &mut self,
        kind: EntityKind,
        id: &str,
        patch: &EntityPatch,
    ) -> Result<bool, ValidationError> {
        if self.get(kind, id).is_none() {
            return Ok(false);
        }
        patch.check_applicable(kind)?;
        if let Some(new_id) = &patch.id {
            let new_id = new_id.trim();
            if new_id.is_empty() {
                return Err(ValidationError::EmptyId);
            }
            if self.id_in_use(new_id, Some((kind, id))) {
                return Err(ValidationError::DuplicateId(new_id.to_string()));
            }
        }

        let Some(entity) = self.collection_mut(kind).iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        entity.apply(patch);
        self.revision += 1;
        debug!(kind = %kind, id = %id, "Updated entity");
        Ok(true)
    }

    /// Remove the matching entity; returns whether one was removed
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        let collection = self.collection_mut(kind);
        let before = collection.len();
        collection.retain(|e| e.id != id);
        let removed = collection.len() != before;
        if removed {
            self.revision += 1;
            info!(kind = %kind, id = %id, "Removed entity");
        }
        removed
    }

    /// Change counter for the reference model alone
    pub fn model_revision(&self) -> u64 {
        self.model_revision
    }

    pub fn model(&self) -> Option<&ReferenceModel> {
        self.model.as_ref()
    }

    /// Install a reference model. The previous one is dropped, which releases
    /// its transient resource.
    pub fn set_model(&mut self, model: ReferenceModel) {
        if let Some(previous) = self.model.replace(model) {
            info!(name = %previous.name, "Replacing reference model");
        }
        self.revision += 1;
        self.model_revision += 1;
    }

    pub fn clear_model(&mut self) {
        if self.model.take().is_some() {
            self.revision += 1;
            self.model_revision += 1;
        }
    }
}

/// Build an entity from one imported row (1-based `row` for messages)
pub fn entity_from_record(
    kind: EntityKind,
    row: usize,
    record: &RawRecord,
) -> Result<Entity, ImportError> {
    let value = |name: &str| record.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());
    let required = |field: Field| {
        value(field.name()).ok_or(ImportError::MissingField {
            kind,
            row,
            field: field.name(),
        })
    };

    let id = required(Field::Id)?.to_string();
    let position = [
        Scalar::parse(required(Field::X)?),
        Scalar::parse(required(Field::Y)?),
        Scalar::parse(required(Field::Z)?),
    ];
    let optional_number = |field: Field| value(field.name()).map(Scalar::parse).unwrap_or_default();
    let detail = match kind {
        EntityKind::WeldPoint => KindDetail::WeldPoint {
            gun: value("gun").map(str::to_string),
        },
        EntityKind::Locator => KindDetail::Locator {
            rotation: [
                optional_number(Field::Rx),
                optional_number(Field::Ry),
                optional_number(Field::Rz),
            ],
        },
        EntityKind::Pin => KindDetail::Pin {
            rotation: [
                optional_number(Field::Rx),
                optional_number(Field::Ry),
                optional_number(Field::Rz),
            ],
        },
    };

    Ok(Entity {
        id,
        process: value("process").unwrap_or_default().to_string(),
        position,
        notes: value("notes").map(str::to_string),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn store_with_welds() -> EntityStore {
        let mut store = EntityStore::new();
        store
            .load(
                EntityKind::WeldPoint,
                &[
                    record(&[("id", "W1"), ("process", "P1"), ("x", "1"), ("y", "2"), ("z", "3")]),
                    record(&[("id", "W2"), ("process", "P2"), ("x", "4"), ("y", "5"), ("z", "6")]),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_load_replaces_collection() {
        let mut store = store_with_welds();
        assert_eq!(store.collection(EntityKind::WeldPoint).len(), 2);

        store
            .load(
                EntityKind::WeldPoint,
                &[record(&[("id", "W9"), ("x", "0"), ("y", "0"), ("z", "0")])],
            )
            .unwrap();
        let ids: Vec<_> = store
            .collection(EntityKind::WeldPoint)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, ["W9"]);
    }

    #[test]
    fn test_load_rejects_missing_field_and_keeps_previous() {
        let mut store = store_with_welds();
        let revision = store.revision();
        let err = store
            .load(
                EntityKind::WeldPoint,
                &[
                    record(&[("id", "W3"), ("x", "1"), ("y", "1"), ("z", "1")]),
                    record(&[("id", "W4"), ("x", "1"), ("y", ""), ("z", "1")]),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            ImportError::MissingField {
                kind: EntityKind::WeldPoint,
                row: 2,
                field: "y"
            }
        );
        assert_eq!(store.collection(EntityKind::WeldPoint).len(), 2);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_load_rejects_cross_kind_duplicate() {
        let mut store = store_with_welds();
        let err = store
            .load(
                EntityKind::Pin,
                &[record(&[("id", "W1"), ("x", "0"), ("y", "0"), ("z", "0")])],
            )
            .unwrap_err();
        assert_eq!(err, ImportError::DuplicateId("W1".to_string()));
        assert!(store.collection(EntityKind::Pin).is_empty());
    }

    #[test]
    fn test_load_keeps_non_numeric_as_raw() {
        let mut store = EntityStore::new();
        store
            .load(
                EntityKind::Locator,
                &[record(&[("id", "L1"), ("x", "abc"), ("y", "2"), ("z", "3"), ("ry", "45")])],
            )
            .unwrap();
        let l1 = store.get(EntityKind::Locator, "L1").unwrap();
        assert_eq!(l1.position[0], Scalar::Raw("abc".to_string()));
        assert_eq!(l1.position_f64(), None);
        assert_eq!(l1.rotation_deg(), Some([0.0, 45.0, 0.0]));
    }

    #[test]
    fn test_add_generates_unique_ids_and_appends() {
        let mut store = store_with_welds();
        let a = store.add(
            EntityKind::Locator,
            AddRequest {
                position: [1.0, 1.0, 1.0],
                process: "P1".to_string(),
            },
        );
        let b = store.add(EntityKind::Locator, AddRequest::default());
        assert_ne!(a, b);
        let locators = store.collection(EntityKind::Locator);
        assert_eq!(locators.last().unwrap().id, b);
        assert_eq!(locators[0].process, "P1");
        assert_eq!(locators[0].rotation_deg(), Some([0.0; 3]));

        let mut ids: Vec<_> = store.iter().map(|e| e.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn test_update_rejects_duplicate_id() {
        let mut store = store_with_welds();
        let err = store
            .update(EntityKind::WeldPoint, "W2", &EntityPatch::default().with_id("W1"))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateId("W1".to_string()));
        assert!(store.get(EntityKind::WeldPoint, "W2").is_some());
    }

    #[test]
    fn test_update_rejects_empty_id_but_allows_own_id() {
        let mut store = store_with_welds();
        assert_eq!(
            store.update(EntityKind::WeldPoint, "W1", &EntityPatch::default().with_id("   ")),
            Err(ValidationError::EmptyId)
        );
        assert_eq!(
            store.update(EntityKind::WeldPoint, "W1", &EntityPatch::default().with_id("W1")),
            Ok(true)
        );
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut store = store_with_welds();
        let revision = store.revision();
        assert_eq!(
            store.update(EntityKind::Pin, "W1", &EntityPatch::position([9.0; 3])),
            Ok(false)
        );
        assert_eq!(store.revision(), revision);
        assert_eq!(store.get(EntityKind::WeldPoint, "W1").unwrap().position_f64(), Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_remove() {
        let mut store = store_with_welds();
        assert!(store.remove(EntityKind::WeldPoint, "W1"));
        assert!(!store.remove(EntityKind::WeldPoint, "W1"));
        assert_eq!(store.len(), 1);
    }
}
