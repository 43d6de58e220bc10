//! Reference model loading (STL / OBJ)

use std::fmt;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::info;

use crate::error::ModelError;
use crate::view::Bounds;

/// Supported mesh formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Stl,
    Obj,
}

impl ModelFormat {
    /// Pick the format from a file name's extension (case-insensitive)
    pub fn from_file_name(name: &str) -> Result<Self, ModelError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "stl" => Ok(ModelFormat::Stl),
            "obj" => Ok(ModelFormat::Obj),
            _ => Err(ModelError::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelFormat::Stl => "STL",
            ModelFormat::Obj => "OBJ",
        }
    }
}

/// Indexed triangle mesh in model units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.positions.iter().map(|p| p.map(f64::from)))
    }

    /// Triangles as vertex triples
    pub fn triangles(&self) -> impl Iterator<Item = [[f64; 3]; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let vertex = |i: u32| self.positions.get(i as usize).map(|p| p.map(f64::from));
            Some([vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?])
        })
    }

    fn translate(&mut self, offset: [f64; 3]) {
        for p in &mut self.positions {
            for i in 0..3 {
                p[i] = (f64::from(p[i]) + offset[i]) as f32;
            }
        }
    }
}

/// Parse mesh bytes without centering
pub fn parse_mesh(format: ModelFormat, bytes: &[u8]) -> Result<TriangleMesh, ModelError> {
    let mesh = match format {
        ModelFormat::Stl => {
            let indexed = stl_io::read_stl(&mut Cursor::new(bytes)).map_err(|e| ModelError::Parse {
                format: format.label(),
                message: e.to_string(),
            })?;
            TriangleMesh {
                positions: indexed.vertices.iter().map(|v| [v[0], v[1], v[2]]).collect(),
                indices: indexed
                    .faces
                    .iter()
                    .flat_map(|f| f.vertices.map(|i| i as u32))
                    .collect(),
            }
        }
        ModelFormat::Obj => {
            let parsed = obj::ObjData::load_buf(BufReader::new(bytes)).map_err(|e| ModelError::Parse {
                format: format.label(),
                message: e.to_string(),
            })?;
            let mut indices = Vec::new();
            let polys = parsed
                .objects
                .iter()
                .flat_map(|o| o.groups.iter())
                .flat_map(|g| g.polys.iter());
            for poly in polys {
                // Fan out polygons around their first corner
                let corners: Vec<u32> = poly.0.iter().map(|t| t.0 as u32).collect();
                for pair in corners.get(1..).unwrap_or_default().windows(2) {
                    indices.extend_from_slice(&[corners[0], pair[0], pair[1]]);
                }
            }
            TriangleMesh {
                positions: parsed.position,
                indices,
            }
        }
    };
    if mesh.triangle_count() == 0 {
        return Err(ModelError::Empty);
    }
    Ok(mesh)
}

/// A resource tied to a loaded model (a browser object URL, a temp file)
/// whose release callback runs exactly once, when the owner is dropped.
pub struct TransientResource {
    label: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TransientResource {
    pub fn new(label: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A resource that needs no cleanup
    pub fn none(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            release: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for TransientResource {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            info!(resource = %self.label, "Releasing model resource");
            release();
        }
    }
}

impl fmt::Debug for TransientResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransientResource")
            .field("label", &self.label)
            .field("pending_release", &self.release.is_some())
            .finish()
    }
}

/// The loaded reference model, centered on the origin
#[derive(Debug)]
pub struct ReferenceModel {
    /// File name the model was loaded from; also identifies it to the
    /// cross-section service
    pub name: String,
    pub format: ModelFormat,
    pub mesh: TriangleMesh,
    /// Bounds after centering
    pub bounds: Bounds,
    /// Translation that was applied to center the mesh
    pub offset: [f64; 3],
    resource: TransientResource,
}

impl ReferenceModel {
    /// Parse and center a model. The format comes from `name`.
    pub fn load(name: &str, bytes: &[u8], resource: TransientResource) -> Result<Self, ModelError> {
        let format = ModelFormat::from_file_name(name)?;
        let mut mesh = parse_mesh(format, bytes)?;
        let raw_bounds = mesh.bounds().ok_or(ModelError::Empty)?;
        let offset = raw_bounds.center().map(|c| -c);
        mesh.translate(offset);

        info!(
            name = %name,
            format = format.label(),
            triangles = mesh.triangle_count(),
            "Loaded reference model"
        );
        Ok(Self {
            name: name.to_string(),
            format,
            bounds: raw_bounds.translated(offset),
            mesh,
            offset,
            resource,
        })
    }

    pub fn resource(&self) -> &TransientResource {
        &self.resource
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) const CUBE_OBJ: &str = "\
o cube
v 0 0 0
v 10 0 0
v 10 20 0
v 0 20 0
v 0 0 30
v 10 0 30
v 10 20 30
v 0 20 30
f 1 2 3
f 1 3 4
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 4 3 7
f 4 7 8
";

    const TRIANGLE_STL: &str = "\
solid tri
  facet normal 0 0 1
    outer loop
      vertex 2 2 2
      vertex 4 2 2
      vertex 2 6 2
    endloop
  endfacet
endsolid tri
";

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ModelFormat::from_file_name("part.STL").unwrap(), ModelFormat::Stl);
        assert_eq!(ModelFormat::from_file_name("a/b/part.obj").unwrap(), ModelFormat::Obj);
        assert!(matches!(
            ModelFormat::from_file_name("part.step"),
            Err(ModelError::UnsupportedFormat(_))
        ));
        assert!(ModelFormat::from_file_name("noext").is_err());
    }

    #[test]
    fn test_obj_is_centered() {
        let model = ReferenceModel::load("cube.obj", CUBE_OBJ.as_bytes(), TransientResource::none("cube")).unwrap();
        assert_eq!(model.mesh.triangle_count(), 8);
        assert_eq!(model.offset, [-5.0, -10.0, -15.0]);
        assert_eq!(model.bounds.center(), [0.0; 3]);
        assert_eq!(model.bounds.max, [5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_obj_polygons_are_fanned() {
        let quad = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0 0 1\nf 1 2 3 4\nf 1 2 5\n";
        let mesh = parse_mesh(ModelFormat::Obj, quad.as_bytes()).unwrap();
        assert_eq!(mesh.positions.len(), 5);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 0, 1, 4]);
    }

    #[test]
    fn test_ascii_stl_is_centered() {
        let model = ReferenceModel::load("tri.stl", TRIANGLE_STL.as_bytes(), TransientResource::none("tri")).unwrap();
        assert_eq!(model.mesh.triangle_count(), 1);
        assert_eq!(model.bounds.min, [-1.0, -2.0, 0.0]);
        assert_eq!(model.bounds.max, [1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_garbage_obj_is_empty() {
        let err = ReferenceModel::load("x.obj", b"# nothing here\n", TransientResource::none("x")).unwrap_err();
        assert!(matches!(err, ModelError::Empty));
    }

    #[test]
    fn test_resource_released_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let resource = TransientResource::new("blob:1", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let model = ReferenceModel::load("cube.obj", CUBE_OBJ.as_bytes(), resource).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(model);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
