//! Entity types: weld points, locators and pins

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// The three annotation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    WeldPoint,
    Locator,
    Pin,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::WeldPoint, EntityKind::Locator, EntityKind::Pin];

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::WeldPoint => "Weld point",
            EntityKind::Locator => "Locator",
            EntityKind::Pin => "Pin",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::WeldPoint => "Weld points",
            EntityKind::Locator => "Locators",
            EntityKind::Pin => "Pins",
        }
    }

    /// Locators and pins carry an orientation, weld points are position-only
    pub fn has_rotation(&self) -> bool {
        matches!(self, EntityKind::Locator | EntityKind::Pin)
    }

    pub fn has_gun(&self) -> bool {
        matches!(self, EntityKind::WeldPoint)
    }

    /// Form fields for this kind, in display order
    pub fn fields(&self) -> &'static [Field] {
        match self {
            EntityKind::WeldPoint => &[
                Field::Id,
                Field::Process,
                Field::X,
                Field::Y,
                Field::Z,
                Field::Gun,
                Field::Notes,
            ],
            EntityKind::Locator | EntityKind::Pin => &[
                Field::Id,
                Field::Process,
                Field::X,
                Field::Y,
                Field::Z,
                Field::Rx,
                Field::Ry,
                Field::Rz,
                Field::Notes,
            ],
        }
    }

    pub fn supports(&self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Default file name for table export
    pub fn table_file_name(&self) -> &'static str {
        match self {
            EntityKind::WeldPoint => "weld_points.csv",
            EntityKind::Locator => "locators.csv",
            EntityKind::Pin => "pins.csv",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Editable attribute of an entity. The name doubles as the CSV column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Id,
    Process,
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
    Gun,
    Notes,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Process => "process",
            Field::X => "x",
            Field::Y => "y",
            Field::Z => "z",
            Field::Rx => "rx",
            Field::Ry => "ry",
            Field::Rz => "rz",
            Field::Gun => "gun",
            Field::Notes => "notes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name.trim().to_ascii_lowercase().as_str() {
            "id" => Field::Id,
            "process" => Field::Process,
            "x" => Field::X,
            "y" => Field::Y,
            "z" => Field::Z,
            "rx" => Field::Rx,
            "ry" => Field::Ry,
            "rz" => Field::Rz,
            "gun" => Field::Gun,
            "notes" => Field::Notes,
            _ => return None,
        };
        Some(field)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::X | Field::Y | Field::Z | Field::Rx | Field::Ry | Field::Rz
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A numeric cell. Imported text that does not parse is kept verbatim so it
/// round-trips on export and is only rejected when an edit is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Raw(String),
}

impl Scalar {
    /// Parse a cell, keeping unparseable text as [`Scalar::Raw`]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Scalar::Number(v),
            _ => Scalar::Raw(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) => Some(*v),
            Scalar::Raw(_) => None,
        }
    }

    /// Full-precision text used for export
    pub fn to_table_text(&self) -> String {
        match self {
            Scalar::Number(v) => v.to_string(),
            Scalar::Raw(s) => s.clone(),
        }
    }

    /// Three-decimal text used by the property form
    pub fn to_form_text(&self) -> String {
        match self {
            Scalar::Number(v) => format!("{:.3}", v),
            Scalar::Raw(s) => s.clone(),
        }
    }

    /// Validate for commit
    pub fn require_number(&self, field: Field) -> Result<f64, ValidationError> {
        match self {
            Scalar::Number(v) => Ok(*v),
            Scalar::Raw(s) => Err(ValidationError::InvalidNumber {
                field,
                value: s.clone(),
            }),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Number(0.0)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindDetail {
    WeldPoint { gun: Option<String> },
    /// Rotation in degrees (rx, ry, rz)
    Locator { rotation: [Scalar; 3] },
    /// Rotation in degrees (rx, ry, rz)
    Pin { rotation: [Scalar; 3] },
}

impl KindDetail {
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::WeldPoint => KindDetail::WeldPoint { gun: None },
            EntityKind::Locator => KindDetail::Locator {
                rotation: Default::default(),
            },
            EntityKind::Pin => KindDetail::Pin {
                rotation: Default::default(),
            },
        }
    }
}

/// One annotation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub process: String,
    pub position: [Scalar; 3],
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub detail: KindDetail,
}

impl Entity {
    pub fn new(kind: EntityKind, id: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            process: String::new(),
            position: position.map(Scalar::Number),
            notes: None,
            detail: KindDetail::empty(kind),
        }
    }

    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = process.into();
        self
    }

    pub fn with_rotation(mut self, degrees: [f64; 3]) -> Self {
        if let Some(rotation) = self.rotation_mut() {
            *rotation = degrees.map(Scalar::Number);
        }
        self
    }

    pub fn kind(&self) -> EntityKind {
        match self.detail {
            KindDetail::WeldPoint { .. } => EntityKind::WeldPoint,
            KindDetail::Locator { .. } => EntityKind::Locator,
            KindDetail::Pin { .. } => EntityKind::Pin,
        }
    }

    pub fn rotation(&self) -> Option<&[Scalar; 3]> {
        match &self.detail {
            KindDetail::Locator { rotation } | KindDetail::Pin { rotation } => Some(rotation),
            KindDetail::WeldPoint { .. } => None,
        }
    }

    fn rotation_mut(&mut self) -> Option<&mut [Scalar; 3]> {
        match &mut self.detail {
            KindDetail::Locator { rotation } | KindDetail::Pin { rotation } => Some(rotation),
            KindDetail::WeldPoint { .. } => None,
        }
    }

    pub fn gun(&self) -> Option<&str> {
        match &self.detail {
            KindDetail::WeldPoint { gun } => gun.as_deref(),
            _ => None,
        }
    }

    /// Position as numbers, `None` while any coordinate is non-numeric
    pub fn position_f64(&self) -> Option<[f64; 3]> {
        Some([
            self.position[0].as_f64()?,
            self.position[1].as_f64()?,
            self.position[2].as_f64()?,
        ])
    }

    /// Rotation in degrees for rotatable kinds; non-numeric components read as zero
    pub fn rotation_deg(&self) -> Option<[f64; 3]> {
        self.rotation()
            .map(|r| r.clone().map(|s| s.as_f64().unwrap_or(0.0)))
    }

    fn scalar(&self, field: Field) -> Option<&Scalar> {
        match field {
            Field::X => Some(&self.position[0]),
            Field::Y => Some(&self.position[1]),
            Field::Z => Some(&self.position[2]),
            Field::Rx => self.rotation().map(|r| &r[0]),
            Field::Ry => self.rotation().map(|r| &r[1]),
            Field::Rz => self.rotation().map(|r| &r[2]),
            _ => None,
        }
    }

    /// Text shown in the property form, `None` for fields the kind lacks
    pub fn form_text(&self, field: Field) -> Option<String> {
        if !self.kind().supports(field) {
            return None;
        }
        Some(match field {
            Field::Id => self.id.clone(),
            Field::Process => self.process.clone(),
            Field::Gun => self.gun().unwrap_or_default().to_string(),
            Field::Notes => self.notes.clone().unwrap_or_default(),
            numeric => self.scalar(numeric)?.to_form_text(),
        })
    }

    /// Text written to an exported table
    pub fn table_text(&self, field: Field) -> String {
        match field {
            Field::Id => self.id.clone(),
            Field::Process => self.process.clone(),
            Field::Gun => self.gun().unwrap_or_default().to_string(),
            Field::Notes => self.notes.clone().unwrap_or_default(),
            numeric => self
                .scalar(numeric)
                .map(Scalar::to_table_text)
                .unwrap_or_default(),
        }
    }

    /// Whether `value` (as typed in the form) equals the committed value.
    /// Numbers match when the text is exactly what the form displays for the
    /// committed value, or parses to the same number.
    pub fn field_matches(&self, field: Field, value: &str) -> bool {
        if field.is_numeric() {
            let Some(current) = self.scalar(field) else {
                return false;
            };
            current.to_form_text() == value || *current == Scalar::parse(value)
        } else {
            self.form_text(field).as_deref() == Some(value)
        }
    }

    /// Merge a validated patch. Fields the kind does not have are ignored.
    pub(crate) fn apply(&mut self, patch: &EntityPatch) {
        if let Some(id) = &patch.id {
            self.id = id.trim().to_string();
        }
        if let Some(process) = &patch.process {
            self.process = process.clone();
        }
        for (i, value) in patch.position.iter().enumerate() {
            if let Some(v) = value {
                self.position[i] = Scalar::Number(*v);
            }
        }
        if let Some(rotation) = self.rotation_mut() {
            for (i, value) in patch.rotation.iter().enumerate() {
                if let Some(v) = value {
                    rotation[i] = Scalar::Number(*v);
                }
            }
        }
        if let Some(notes) = &patch.notes {
            self.notes = non_empty(notes);
        }
        if let (Some(new_gun), KindDetail::WeldPoint { gun }) = (&patch.gun, &mut self.detail) {
            *gun = non_empty(new_gun);
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// A partial update. Numeric values are already parsed; use
/// [`EntityPatch::from_field_text`] to build one from form input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub id: Option<String>,
    pub process: Option<String>,
    pub position: [Option<f64>; 3],
    /// Degrees
    pub rotation: [Option<f64>; 3],
    pub gun: Option<String>,
    pub notes: Option<String>,
}

impl EntityPatch {
    pub fn position(position: [f64; 3]) -> Self {
        Self {
            position: position.map(Some),
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, degrees: [f64; 3]) -> Self {
        self.rotation = degrees.map(Some);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Single-field patch from form text. Numbers must parse.
    pub fn from_field_text(field: Field, text: &str) -> Result<Self, ValidationError> {
        let mut patch = Self::default();
        let number = || Scalar::parse(text).require_number(field);
        match field {
            Field::Id => patch.id = Some(text.to_string()),
            Field::Process => patch.process = Some(text.to_string()),
            Field::Gun => patch.gun = Some(text.to_string()),
            Field::Notes => patch.notes = Some(text.to_string()),
            Field::X => patch.position[0] = Some(number()?),
            Field::Y => patch.position[1] = Some(number()?),
            Field::Z => patch.position[2] = Some(number()?),
            Field::Rx => patch.rotation[0] = Some(number()?),
            Field::Ry => patch.rotation[1] = Some(number()?),
            Field::Rz => patch.rotation[2] = Some(number()?),
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn touches_transform(&self) -> bool {
        self.position.iter().any(Option::is_some) || self.rotation.iter().any(Option::is_some)
    }

    /// Reject fields that do not exist on `kind`
    pub fn check_applicable(&self, kind: EntityKind) -> Result<(), ValidationError> {
        if !kind.has_gun() && self.gun.is_some() {
            return Err(ValidationError::FieldNotApplicable {
                field: Field::Gun,
                kind,
            });
        }
        if !kind.has_rotation() {
            let fields = [Field::Rx, Field::Ry, Field::Rz];
            if let Some(i) = self.rotation.iter().position(Option::is_some) {
                return Err(ValidationError::FieldNotApplicable {
                    field: fields[i],
                    kind,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_parse_keeps_raw_text() {
        assert_eq!(Scalar::parse(" 1.5 "), Scalar::Number(1.5));
        assert_eq!(Scalar::parse("abc"), Scalar::Raw("abc".to_string()));
        assert_eq!(Scalar::parse("NaN"), Scalar::Raw("NaN".to_string()));
        assert_eq!(Scalar::Number(0.1 + 0.2).to_table_text(), (0.1f64 + 0.2).to_string());
        assert_eq!(Scalar::Number(1.23456).to_form_text(), "1.235");
    }

    #[test]
    fn test_kind_field_visibility() {
        assert!(EntityKind::WeldPoint.supports(Field::Gun));
        assert!(!EntityKind::WeldPoint.supports(Field::Rx));
        assert!(EntityKind::Locator.supports(Field::Rz));
        assert!(!EntityKind::Pin.supports(Field::Gun));
    }

    #[test]
    fn test_form_text_and_match() {
        let e = Entity::new(EntityKind::Locator, "L1", [1.0, 2.0, 3.0]).with_rotation([0.0, 90.0, 0.0]);
        assert_eq!(e.form_text(Field::X).as_deref(), Some("1.000"));
        assert_eq!(e.form_text(Field::Ry).as_deref(), Some("90.000"));
        assert_eq!(e.form_text(Field::Gun), None);
        assert!(e.field_matches(Field::X, "1.000"));
        assert!(e.field_matches(Field::X, "1"));
        assert!(!e.field_matches(Field::X, "1.5"));
        assert!(!e.field_matches(Field::X, "1.0004"));
        assert!(e.field_matches(Field::Id, "L1"));

        // Redisplayed text of a finer value is not an edit
        let fine = Entity::new(EntityKind::Pin, "P1", [1.23456, 0.0, 0.0]);
        assert!(fine.field_matches(Field::X, "1.235"));
        assert!(!fine.field_matches(Field::X, "1.2345"));
    }

    #[test]
    fn test_patch_from_field_text() {
        let patch = EntityPatch::from_field_text(Field::Y, "4.25").unwrap();
        assert_eq!(patch.position, [None, Some(4.25), None]);

        let err = EntityPatch::from_field_text(Field::Z, "twelve").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidNumber {
                field: Field::Z,
                value: "twelve".to_string()
            }
        );
    }

    #[test]
    fn test_apply_ignores_rotation_on_weld_point() {
        let mut e = Entity::new(EntityKind::WeldPoint, "W1", [0.0; 3]);
        let patch = EntityPatch::position([1.0, 2.0, 3.0]).with_rotation([10.0, 0.0, 0.0]);
        assert!(patch.check_applicable(EntityKind::WeldPoint).is_err());
        e.apply(&patch);
        assert_eq!(e.position_f64(), Some([1.0, 2.0, 3.0]));
        assert_eq!(e.rotation(), None);
    }

    #[test]
    fn test_apply_gun_and_notes() {
        let mut e = Entity::new(EntityKind::WeldPoint, "W1", [0.0; 3]);
        e.apply(&EntityPatch {
            gun: Some("G7".to_string()),
            notes: Some("check clamp".to_string()),
            ..Default::default()
        });
        assert_eq!(e.gun(), Some("G7"));
        assert_eq!(e.notes.as_deref(), Some("check clamp"));

        e.apply(&EntityPatch {
            notes: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(e.notes, None);
    }
}
