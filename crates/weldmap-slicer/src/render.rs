//! Section rendering
//!
//! A locator's plane is cut through the mesh, the cut is clipped to the
//! configured radius and drawn as red lines on white, looking down the
//! plane normal with the locator at the image center.

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use weldmap_core::section::{clip_to_radius, project, slice_mesh};
use weldmap_core::{LocatorRecord, TriangleMesh};

use crate::config::SlicingConfig;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const LINE_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
/// Stroke width in pixels
const LINE_WIDTH: i64 = 3;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("locator id {0:?} cannot be used as a file name")]
    InvalidId(String),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Image size and extent
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Half the image height, in model units
    pub radius: f64,
}

impl From<&SlicingConfig> for RenderSettings {
    fn from(config: &SlicingConfig) -> Self {
        Self {
            width: config.image_width,
            height: config.image_height,
            radius: config.radius,
        }
    }
}

/// File name for a locator's image. Characters outside `[A-Za-z0-9._-]`
/// become `_`; ids that would still escape the output directory are refused.
pub fn image_file_name(id: &str) -> Result<String, RenderError> {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        return Err(RenderError::InvalidId(id.to_string()));
    }
    Ok(format!("{}.png", stem))
}

/// Draw projected segments (`u` right, `v` up, origin at the image center)
pub fn draw_section(lines: &[[[f64; 2]; 2]], settings: RenderSettings) -> RgbImage {
    let mut image = RgbImage::from_pixel(settings.width, settings.height, BACKGROUND);
    if settings.radius <= 0.0 {
        return image;
    }

    let scale = f64::from(settings.height) / 2.0 / settings.radius;
    let cx = f64::from(settings.width) / 2.0;
    let cy = f64::from(settings.height) / 2.0;
    let to_pixel = |[u, v]: [f64; 2]| ((cx + u * scale).round() as i64, (cy - v * scale).round() as i64);

    for &[a, b] in lines {
        draw_line(&mut image, to_pixel(a), to_pixel(b));
    }
    image
}

/// Bresenham, stamping a square brush at each step
fn draw_line(image: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        stamp(image, x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn stamp(image: &mut RgbImage, x: i64, y: i64) {
    let half = LINE_WIDTH / 2;
    for py in (y - half)..=(y + half) {
        for px in (x - half)..=(x + half) {
            if px >= 0 && py >= 0 && px < i64::from(image.width()) && py < i64::from(image.height()) {
                image.put_pixel(px as u32, py as u32, LINE_COLOR);
            }
        }
    }
}

/// Cut, clip, draw and save one locator's section. Returns the written file.
pub fn render_locator(
    mesh: &TriangleMesh,
    locator: &LocatorRecord,
    settings: RenderSettings,
    output_dir: &Path,
) -> Result<PathBuf, RenderError> {
    let file_name = image_file_name(&locator.id)?;
    let origin = locator.origin();
    let normal = locator.normal();

    let segments = slice_mesh(mesh, origin, normal);
    let clipped = clip_to_radius(&segments, origin, settings.radius);
    debug!(
        locator = %locator.id,
        normal = ?normal,
        segments = segments.len(),
        in_radius = clipped.len(),
        "Sliced mesh"
    );

    let image = draw_section(&project(&clipped, origin, normal), settings);
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name);
    image.save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: RenderSettings = RenderSettings {
        width: 80,
        height: 60,
        radius: 30.0,
    };

    fn red_pixels(image: &RgbImage) -> usize {
        image.pixels().filter(|p| **p == LINE_COLOR).count()
    }

    #[test]
    fn test_file_name_sanitized() {
        assert_eq!(image_file_name("L-01").unwrap(), "L-01.png");
        assert_eq!(image_file_name("../etc/passwd").unwrap(), ".._etc_passwd.png");
        assert_eq!(image_file_name("a b").unwrap(), "a_b.png");
        assert!(image_file_name("").is_err());
        assert!(image_file_name("..").is_err());
    }

    #[test]
    fn test_empty_section_is_blank() {
        let image = draw_section(&[], SETTINGS);
        assert_eq!(image.dimensions(), (80, 60));
        assert_eq!(red_pixels(&image), 0);
    }

    #[test]
    fn test_horizontal_line_through_center() {
        // One unit per pixel: 60 px tall covers +-30
        let image = draw_section(&[[[-10.0, 0.0], [10.0, 0.0]]], SETTINGS);
        assert_eq!(*image.get_pixel(40, 30), LINE_COLOR);
        assert_eq!(*image.get_pixel(30, 30), LINE_COLOR);
        assert_eq!(*image.get_pixel(50, 30), LINE_COLOR);
        assert_eq!(*image.get_pixel(40, 10), BACKGROUND);
        assert_eq!(*image.get_pixel(55, 30), BACKGROUND);
    }

    #[test]
    fn test_up_is_up() {
        let image = draw_section(&[[[0.0, 20.0], [0.0, 25.0]]], SETTINGS);
        assert_eq!(*image.get_pixel(40, 8), LINE_COLOR);
        assert_eq!(*image.get_pixel(40, 52), BACKGROUND);
    }

    #[test]
    fn test_lines_off_canvas_are_clipped() {
        let image = draw_section(&[[[-500.0, 0.0], [500.0, 0.0]]], SETTINGS);
        assert_eq!(red_pixels(&image), 80 * LINE_WIDTH as usize);
    }
}
