//! Cross-section wire format and slicing geometry
//!
//! Shared by the viewer (which sends a locator to the slicing service) and
//! the service itself (which cuts the reference mesh with the locator plane).

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Field};
use crate::error::ValidationError;
use crate::model::TriangleMesh;

/// Locator as sent to the slicing service; rotation in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorRecord {
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub rx: f64,
    #[serde(default)]
    pub ry: f64,
    #[serde(default)]
    pub rz: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LocatorRecord {
    /// Build from an entity; every coordinate must be numeric
    pub fn from_entity(entity: &Entity) -> Result<Self, ValidationError> {
        let x = entity.position[0].require_number(Field::X)?;
        let y = entity.position[1].require_number(Field::Y)?;
        let z = entity.position[2].require_number(Field::Z)?;
        let [rx, ry, rz] = entity.rotation_deg().unwrap_or([0.0; 3]);
        Ok(Self {
            id: entity.id.clone(),
            x,
            y,
            z,
            rx,
            ry,
            rz,
            process: (!entity.process.is_empty()).then(|| entity.process.clone()),
            notes: entity.notes.clone().filter(|n| !n.is_empty()),
        })
    }

    pub fn origin(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn normal(&self) -> [f64; 3] {
        plane_normal(self.rx, self.ry)
    }
}

/// `POST /slice` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRequest {
    pub obj_file_path: String,
    pub locators: Vec<LocatorRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceStatus {
    Success,
    Error,
}

/// Outcome for one locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceResult {
    pub id: String,
    pub status: SliceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SliceResult {
    pub fn success(id: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SliceStatus::Success,
            image_path: Some(image_path.into()),
            message: None,
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SliceStatus::Error,
            image_path: None,
            message: Some(message.into()),
        }
    }
}

/// `200` body of `POST /slice`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResponse {
    pub message: String,
    pub obj_file_processed: String,
    pub num_locators_processed: usize,
    pub slice_results: Vec<SliceResult>,
}

/// Error body of `POST /slice`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Plane normal for a locator: +Z rotated by `ry` about Y, then by `rx`
/// about X (degrees). `rz` spins within the plane and does not matter.
pub fn plane_normal(rx_deg: f64, ry_deg: f64) -> [f64; 3] {
    let (sy, cy) = ry_deg.to_radians().sin_cos();
    let (sx, cx) = rx_deg.to_radians().sin_cos();
    // R_y * (0, 0, 1)
    let after_y = [sy, 0.0, cy];
    // R_x * after_y
    let n = [
        after_y[0],
        cx * after_y[1] - sx * after_y[2],
        sx * after_y[1] + cx * after_y[2],
    ];
    normalize(n).unwrap_or([0.0, 0.0, 1.0])
}

/// Image "up" direction when looking down the plane normal
pub fn camera_up(normal: [f64; 3]) -> [f64; 3] {
    const EPS: f64 = 1e-8;
    let near = |a: [f64; 3], b: [f64; 3]| (0..3).all(|i| (a[i] - b[i]).abs() < EPS);
    if near(normal, [0.0, 0.0, 1.0]) || near(normal, [0.0, 0.0, -1.0]) {
        return [0.0, 1.0, 0.0];
    }
    if near(normal, [0.0, 1.0, 0.0]) || near(normal, [0.0, -1.0, 0.0]) {
        return [0.0, 0.0, 1.0];
    }
    normalize(cross(normal, [0.0, 0.0, 1.0])).unwrap_or([0.0, 1.0, 0.0])
}

pub type Segment = [[f64; 3]; 2];

/// Intersect every triangle with the plane through `origin` with `normal`
pub fn slice_mesh(mesh: &TriangleMesh, origin: [f64; 3], normal: [f64; 3]) -> Vec<Segment> {
    let mut segments = Vec::new();
    for tri in mesh.triangles() {
        let d = tri.map(|v| dot(sub(v, origin), normal));
        let mut points = Vec::with_capacity(2);
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            if (d[i] < 0.0) != (d[j] < 0.0) {
                let t = d[i] / (d[i] - d[j]);
                points.push(lerp(tri[i], tri[j], t));
            }
        }
        if let [a, b] = points[..] {
            if a != b {
                segments.push([a, b]);
            }
        }
    }
    segments
}

/// Clip segments to the ball of `radius` around `center`, dropping those
/// entirely outside
pub fn clip_to_radius(segments: &[Segment], center: [f64; 3], radius: f64) -> Vec<Segment> {
    segments
        .iter()
        .filter_map(|&[a, b]| {
            // |a + t (b - a) - c|^2 <= r^2
            let ab = sub(b, a);
            let ac = sub(a, center);
            let qa = dot(ab, ab);
            let qb = 2.0 * dot(ab, ac);
            let qc = dot(ac, ac) - radius * radius;
            if qa == 0.0 {
                return (qc <= 0.0).then_some([a, b]);
            }
            let disc = qb * qb - 4.0 * qa * qc;
            if disc < 0.0 {
                return None;
            }
            let root = disc.sqrt();
            let t0 = ((-qb - root) / (2.0 * qa)).max(0.0);
            let t1 = ((-qb + root) / (2.0 * qa)).min(1.0);
            (t0 < t1).then(|| [lerp(a, b, t0), lerp(a, b, t1)])
        })
        .collect()
}

/// Project segments into the image plane: `u` to the right, `v` up,
/// both relative to `origin`
pub fn project(segments: &[Segment], origin: [f64; 3], normal: [f64; 3]) -> Vec<[[f64; 2]; 2]> {
    let up = camera_up(normal);
    let right = cross(up, normal);
    segments
        .iter()
        .map(|seg| {
            seg.map(|p| {
                let rel = sub(p, origin);
                [dot(rel, right), dot(rel, up)]
            })
        })
        .collect()
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn lerp(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    [0, 1, 2].map(|i| a[i] + (b[i] - a[i]) * t)
}

fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = dot(v, v).sqrt();
    (len > 0.0).then(|| v.map(|c| c / len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, Scalar};
    use crate::model::{parse_mesh, tests::CUBE_OBJ, ModelFormat};
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: [f64; 3], b: [f64; 3]) {
        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_plane_normal() {
        assert_vec_eq(plane_normal(0.0, 0.0), [0.0, 0.0, 1.0]);
        assert_vec_eq(plane_normal(0.0, 90.0), [1.0, 0.0, 0.0]);
        assert_vec_eq(plane_normal(90.0, 0.0), [0.0, -1.0, 0.0]);
        assert_vec_eq(plane_normal(-90.0, 0.0), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_camera_up() {
        assert_eq!(camera_up([0.0, 0.0, 1.0]), [0.0, 1.0, 0.0]);
        assert_eq!(camera_up([0.0, -1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_vec_eq(camera_up([1.0, 0.0, 0.0]), [0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_slice_cube_horizontally() {
        let mesh = parse_mesh(ModelFormat::Obj, CUBE_OBJ.as_bytes()).unwrap();
        let segments = slice_mesh(&mesh, [5.0, 10.0, 15.0], [0.0, 0.0, 1.0]);
        // Only the four side triangles cross z = 15
        assert_eq!(segments.len(), 4);
        for seg in &segments {
            assert_relative_eq!(seg[0][2], 15.0);
            assert_relative_eq!(seg[1][2], 15.0);
        }
    }

    #[test]
    fn test_clip_to_radius() {
        let segments = [
            [[-10.0, 0.0, 0.0], [10.0, 0.0, 0.0]],
            [[20.0, 20.0, 0.0], [30.0, 20.0, 0.0]],
            [[1.0, 1.0, 0.0], [2.0, 1.0, 0.0]],
        ];
        let clipped = clip_to_radius(&segments, [0.0; 3], 5.0);
        assert_eq!(clipped.len(), 2);
        assert_vec_eq(clipped[0][0], [-5.0, 0.0, 0.0]);
        assert_vec_eq(clipped[0][1], [5.0, 0.0, 0.0]);
        assert_eq!(clipped[1], segments[2]);
    }

    #[test]
    fn test_project_into_plane() {
        let projected = project(&[[[1.0, 2.0, 0.0], [3.0, 4.0, 0.0]]], [0.0; 3], [0.0, 0.0, 1.0]);
        // normal +Z: up is +Y, right is +X
        assert_eq!(projected, vec![[[1.0, 2.0], [3.0, 4.0]]]);
    }

    #[test]
    fn test_locator_record_requires_numbers() {
        let locator = Entity::new(EntityKind::Locator, "L1", [1.0, 2.0, 3.0]).with_rotation([0.0, 45.0, 0.0]);
        let record = LocatorRecord::from_entity(&locator).unwrap();
        assert_eq!(record.origin(), [1.0, 2.0, 3.0]);
        assert_eq!(record.ry, 45.0);

        assert_eq!(record.process, None);

        let mut broken = locator.clone();
        broken.position[1] = Scalar::Raw("?".to_string());
        assert!(LocatorRecord::from_entity(&broken).is_err());
    }

    #[test]
    fn test_locator_record_carries_process_and_notes() {
        let mut locator = Entity::new(EntityKind::Locator, "L1", [0.0; 3]).with_process("OP10");
        locator.notes = Some("datum A".to_string());
        let record = LocatorRecord::from_entity(&locator).unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["process"], "OP10");
        assert_eq!(json["notes"], "datum A");
        let back: LocatorRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_wire_format() {
        let body = r#"{"obj_file_path":"part.obj","locators":[{"id":"L1","x":1,"y":2,"z":3}]}"#;
        let req: SectionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.locators[0].rx, 0.0);

        let result = serde_json::to_value(SliceResult::success("L1", "slices/L1.png")).unwrap();
        assert_eq!(
            result,
            serde_json::json!({"id": "L1", "status": "success", "image_path": "slices/L1.png"})
        );
    }
}
