//! Camera framing math
//!
//! Z-up orbit camera: the eye sits at `target + distance * (cos(az) cos(el),
//! sin(az) cos(el), sin(el))`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Extra room around the framed volume
pub const FRAME_PADDING: f64 = 1.2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn from_point(p: [f64; 3]) -> Self {
        Self { min: p, max: p }
    }

    pub fn from_points<I: IntoIterator<Item = [f64; 3]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(iter.next()?);
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: [f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn union(mut self, other: Bounds) -> Self {
        self.include(other.min);
        self.include(other.max);
        self
    }

    pub fn center(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| (self.min[i] + self.max[i]) * 0.5)
    }

    pub fn size(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.max[i] - self.min[i])
    }

    /// Radius of the bounding sphere
    pub fn radius(&self) -> f64 {
        let [x, y, z] = self.size();
        (x * x + y * y + z * z).sqrt() * 0.5
    }

    pub fn translated(&self, offset: [f64; 3]) -> Self {
        Self {
            min: [0, 1, 2].map(|i| self.min[i] + offset[i]),
            max: [0, 1, 2].map(|i| self.max[i] + offset[i]),
        }
    }
}

/// Preset camera directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDirection {
    X,
    Y,
    Z,
    Isometric,
}

impl ViewDirection {
    pub const ALL: [ViewDirection; 4] = [
        ViewDirection::X,
        ViewDirection::Y,
        ViewDirection::Z,
        ViewDirection::Isometric,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ViewDirection::X => "X",
            ViewDirection::Y => "Y",
            ViewDirection::Z => "Z",
            ViewDirection::Isometric => "Iso",
        }
    }

    /// (azimuth, elevation) in radians
    pub fn angles(&self) -> (f64, f64) {
        match self {
            ViewDirection::X => (0.0, 0.0),
            ViewDirection::Y => (FRAC_PI_2, 0.0),
            // Looking straight down is singular for a Z-up look_at
            ViewDirection::Z => (-FRAC_PI_2, MAX_ELEVATION),
            ViewDirection::Isometric => (FRAC_PI_4, (1.0f64 / 2.0f64.sqrt()).atan()),
        }
    }
}

/// Elevation clamp shared with the interactive orbit
pub const MAX_ELEVATION: f64 = 1.5;

/// Orbit camera pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub target: [f64; 3],
    pub distance: f64,
    pub azimuth: f64,
    pub elevation: f64,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            target: [0.0; 3],
            distance: 1500.0,
            azimuth: -FRAC_PI_4,
            elevation: 0.5,
        }
    }
}

impl CameraPose {
    pub fn eye(&self) -> [f64; 3] {
        let (az, el) = (self.azimuth, self.elevation);
        [
            self.target[0] + self.distance * az.cos() * el.cos(),
            self.target[1] + self.distance * az.sin() * el.cos(),
            self.target[2] + self.distance * el.sin(),
        ]
    }
}

/// Frame `bounds` from `direction` with a perspective camera of vertical
/// field of view `fov_y` (radians). Falls back to the default pose when
/// there is nothing to frame.
pub fn frame(bounds: Option<Bounds>, direction: ViewDirection, fov_y: f64) -> CameraPose {
    let Some(bounds) = bounds else {
        return CameraPose::default();
    };
    let (azimuth, elevation) = direction.angles();
    let radius = bounds.radius().max(MIN_FRAME_RADIUS) * FRAME_PADDING;
    let distance = radius / (fov_y * 0.5).sin();
    CameraPose {
        target: bounds.center(),
        distance,
        azimuth,
        elevation,
    }
}

/// Keeps a single point from collapsing the camera onto it
pub const MIN_FRAME_RADIUS: f64 = 10.0;
