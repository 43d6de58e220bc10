//! Weldmap Core - entity model, selection sync and file formats
//!
//! This crate provides the rendering-free half of the Weldmap editor:
//! - Weld point, locator and pin records and the entity store
//! - Process filter and property form state
//! - Selection/sync controller driving visual handles through a trait
//! - CSV tables, STL/OBJ reference models and camera framing math
//! - Cross-section wire types and plane slicing geometry

pub mod config;
pub mod editor;
pub mod entity;
pub mod error;
pub mod filter;
pub mod form;
pub mod model;
pub mod section;
pub mod selection;
pub mod store;
pub mod table;
pub mod view;

pub use config::ViewerConfig;
pub use editor::{Editor, Notice, NoticeLevel};
pub use entity::{Entity, EntityKind, EntityPatch, Field, KindDetail, Scalar};
pub use error::{EditorError, ImportError, ModelError, ValidationError};
pub use filter::ProcessFilter;
pub use form::PropertyForm;
pub use model::{ModelFormat, ReferenceModel, TransientResource, TriangleMesh};
pub use section::{LocatorRecord, SectionError, SectionRequest, SectionResponse, SliceResult, SliceStatus};
pub use selection::{PendingDelete, Selection, SelectionController, SelectionState, VisualHandle};
pub use store::{AddRequest, EntityStore, RawRecord};
pub use view::{Bounds, CameraPose, ViewDirection};
