//! Property form state
//!
//! Mirrors the selected entity: a committed snapshot plus the text currently
//! typed into each field. Widgets edit the staged text; a commit happens when
//! a field loses focus and its staged text differs from the snapshot.

use std::collections::BTreeMap;

use crate::entity::{Entity, EntityKind, Field};

#[derive(Debug, Clone, Default)]
pub struct PropertyForm {
    snapshot: Option<Entity>,
    staged: BTreeMap<Field, String>,
}

impl PropertyForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a committed snapshot, discarding anything staged
    pub fn load(&mut self, entity: Option<&Entity>) {
        self.snapshot = entity.cloned();
        self.staged.clear();
        if let Some(entity) = &self.snapshot {
            for field in entity.kind().fields() {
                if let Some(text) = entity.form_text(*field) {
                    self.staged.insert(*field, text);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.load(None);
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn snapshot(&self) -> Option<&Entity> {
        self.snapshot.as_ref()
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.snapshot.as_ref().map(Entity::kind)
    }

    /// Fields visible for the loaded kind, in display order
    pub fn fields(&self) -> &'static [Field] {
        self.kind().map(|k| k.fields()).unwrap_or(&[])
    }

    pub fn staged(&self, field: Field) -> Option<&str> {
        self.staged.get(&field).map(String::as_str)
    }

    /// Editable buffer for a widget; `None` if the field is not shown
    pub fn staged_mut(&mut self, field: Field) -> Option<&mut String> {
        self.staged.get_mut(&field)
    }

    /// Staged text that differs from the committed value, if any
    pub fn pending(&self, field: Field) -> Option<&str> {
        let snapshot = self.snapshot.as_ref()?;
        let staged = self.staged.get(&field)?;
        (!snapshot.field_matches(field, staged)).then_some(staged.as_str())
    }

    /// Restore one field's staged text from the snapshot
    pub fn revert(&mut self, field: Field) {
        if let Some(text) = self.snapshot.as_ref().and_then(|e| e.form_text(field)) {
            self.staged.insert(field, text);
        }
    }

    pub fn revert_all(&mut self) {
        let snapshot = self.snapshot.take();
        self.load(snapshot.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_formats_fields_for_kind() {
        let mut form = PropertyForm::new();
        let e = Entity::new(EntityKind::WeldPoint, "W1", [1.0, 2.5, -3.0]).with_process("P1");
        form.load(Some(&e));

        assert_eq!(form.kind(), Some(EntityKind::WeldPoint));
        assert_eq!(form.staged(Field::Y), Some("2.500"));
        assert_eq!(form.staged(Field::Gun), Some(""));
        assert_eq!(form.staged(Field::Rx), None);
        assert!(form.fields().contains(&Field::Gun));
    }

    #[test]
    fn test_pending_only_when_changed() {
        let mut form = PropertyForm::new();
        let e = Entity::new(EntityKind::Pin, "P1", [1.0, 0.0, 0.0]);
        form.load(Some(&e));
        assert_eq!(form.pending(Field::X), None);

        *form.staged_mut(Field::X).unwrap() = "1.0".to_string();
        assert_eq!(form.pending(Field::X), None);

        *form.staged_mut(Field::X).unwrap() = "10".to_string();
        assert_eq!(form.pending(Field::X), Some("10"));

        form.revert(Field::X);
        assert_eq!(form.staged(Field::X), Some("1.000"));
        assert_eq!(form.pending(Field::X), None);
    }

    #[test]
    fn test_clear() {
        let mut form = PropertyForm::new();
        form.load(Some(&Entity::new(EntityKind::Locator, "L1", [0.0; 3])));
        form.clear();
        assert!(form.is_empty());
        assert!(form.fields().is_empty());
        assert_eq!(form.staged_mut(Field::Id), None);
    }
}
