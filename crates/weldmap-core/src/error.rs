//! Error taxonomy for the editor core
//!
//! Every error here is handled at the boundary that detects it and turned into
//! a user-facing notice by [`crate::editor::Editor`]; none of them is fatal.

use thiserror::Error;

use crate::entity::{EntityKind, Field};

/// Bulk table import failures. The target collection is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("{kind} table is missing required column(s): {}", .columns.join(", "))]
    MissingColumns { kind: EntityKind, columns: Vec<String> },
    #[error("{kind} row {row} has no value for '{field}'")]
    MissingField {
        kind: EntityKind,
        row: usize,
        field: &'static str,
    },
    #[error("id '{0}' appears more than once")]
    DuplicateId(String),
    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        ImportError::Csv(e.to_string())
    }
}

/// A committed edit was rejected. The staged form value must be reverted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a number, got '{value}'")]
    InvalidNumber { field: Field, value: String },
    #[error("id must not be empty")]
    EmptyId,
    #[error("id '{0}' is already used by another entity")]
    DuplicateId(String),
    #[error("{field} does not apply to {kind}")]
    FieldNotApplicable { field: Field, kind: EntityKind },
}

/// Reference model loading failures. No state changes on error.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("unsupported model format '{0}' (expected .stl or .obj)")]
    UnsupportedFormat(String),
    #[error("failed to parse {format} model: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("model contains no triangles")]
    Empty,
}

/// Everything the editor can report back to the operator
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("{0}")]
    LookupMiss(String),
    #[error("cross-section service unreachable: {0}")]
    CollaboratorUnreachable(String),
    #[error("export failed: {0}")]
    Export(String),
}

impl EditorError {
    /// Short label used as a notice title
    pub fn category(&self) -> &'static str {
        match self {
            EditorError::Import(_) => "Import",
            EditorError::Validation(_) => "Validation",
            EditorError::Model(ModelError::UnsupportedFormat(_)) => "Unsupported format",
            EditorError::Model(_) => "Model",
            EditorError::LookupMiss(_) => "Not available",
            EditorError::CollaboratorUnreachable(_) => "Cross-section",
            EditorError::Export(_) => "Export",
        }
    }
}
