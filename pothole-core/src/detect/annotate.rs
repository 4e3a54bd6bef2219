//! Detection overlay and image persistence.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PotholeError, Result};

/// Bounding box color.
const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 56, 56]);

/// Bounding box line width in pixels.
const LINE_WIDTH: u32 = 3;

const JPEG_QUALITY: u8 = 90;

/// How many suffixed names to try when a filename is already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A persisted annotated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub filename: String,
    pub path: PathBuf,
}

/// Filename embedding capture time and confidence, e.g.
/// `pothole_20251229_153000_0.85.jpg`.
pub fn image_filename(at: DateTime<Local>, confidence: f64) -> String {
    format!("pothole_{}_{confidence:.2}.jpg", at.format("%Y%m%d_%H%M%S"))
}

/// Draw a hollow rectangle for `bbox` (`[x1, y1, x2, y2]`), clamped to the
/// image bounds.
pub fn draw_box(image: &mut RgbImage, bbox: [f64; 4], color: Rgb<u8>, line_width: u32) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let clamp = |v: f64, max: u32| v.max(0.0).min(f64::from(max - 1)) as u32;
    let (x1, x2) = (clamp(bbox[0], width), clamp(bbox[2], width));
    let (y1, y2) = (clamp(bbox[1], height), clamp(bbox[3], height));
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));

    for t in 0..line_width {
        let (top_t, bottom_t) = ((top + t).min(bottom), bottom.saturating_sub(t).max(top));
        let (left_t, right_t) = ((left + t).min(right), right.saturating_sub(t).max(left));
        for x in left..=right {
            image.put_pixel(x, top_t, color);
            image.put_pixel(x, bottom_t, color);
        }
        for y in top..=bottom {
            image.put_pixel(left_t, y, color);
            image.put_pixel(right_t, y, color);
        }
    }
}

/// Draw the detection on `image` and write it as a JPEG into `dir`.
///
/// The image is fully written to a temporary file before it is renamed into
/// place, so a failure never leaves a partial image behind. An existing file
/// with the same name is never overwritten; a numeric suffix is added instead.
pub fn save_annotated(
    image: DynamicImage,
    bbox: [f64; 4],
    confidence: f64,
    dir: &Path,
) -> Result<SavedImage> {
    // JPEG has no alpha channel
    let mut rgb = image.to_rgb8();
    draw_box(&mut rgb, bbox, OVERLAY_COLOR, LINE_WIDTH);

    fs::create_dir_all(dir).map_err(|e| failure("cannot create images directory", e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| failure("cannot create image file", e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| failure("cannot encode image", e))?;
        writer
            .flush()
            .map_err(|e| failure("cannot write image", e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| failure("cannot write image", e))?;

    let base = image_filename(Local::now(), confidence);
    let stem = base.trim_end_matches(".jpg").to_string();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let filename = match attempt {
            0 => base.clone(),
            n => format!("{stem}_{n}.jpg"),
        };
        let path = dir.join(&filename);
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "Saved annotated image");
                return Ok(SavedImage { filename, path });
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(failure("cannot save image", e.error)),
        }
    }

    Err(PotholeError::DetectionFailure(format!(
        "no free filename for {base}"
    )))
}

fn failure(what: &str, e: impl std::fmt::Display) -> PotholeError {
    PotholeError::DetectionFailure(format!("{what}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_image_filename_format() {
        let at = Local.with_ymd_and_hms(2025, 12, 29, 15, 30, 0).unwrap();
        assert_eq!(image_filename(at, 0.849), "pothole_20251229_153000_0.85.jpg");
        assert_eq!(image_filename(at, 1.0), "pothole_20251229_153000_1.00.jpg");
    }

    #[test]
    fn test_draw_box_marks_edges_only() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        draw_box(&mut image, [2.0, 3.0, 15.0, 16.0], OVERLAY_COLOR, 1);

        assert_eq!(*image.get_pixel(2, 3), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(15, 16), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(8, 3), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(8, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_box_clamps_out_of_bounds() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        draw_box(&mut image, [-5.0, -5.0, 50.0, 50.0], OVERLAY_COLOR, LINE_WIDTH);

        assert_eq!(*image.get_pixel(0, 0), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(9, 9), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_save_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 10, 10])));

        let first = save_annotated(image.clone(), [0.0, 0.0, 4.0, 4.0], 0.7, dir.path()).unwrap();
        let base = first.filename.clone();
        let second = save_annotated(image, [0.0, 0.0, 4.0, 4.0], 0.7, dir.path()).unwrap();

        assert!(first.path.exists());
        assert!(second.path.exists());
        assert_ne!(first.path, second.path);
        assert!(base.ends_with("_0.70.jpg"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_saved_file_is_jpeg() {
        let dir = TempDir::new().unwrap();
        let image = DynamicImage::ImageRgba8(image::RgbaImage::new(6, 6));

        let saved = save_annotated(image, [1.0, 1.0, 4.0, 4.0], 0.9, dir.path()).unwrap();

        let bytes = fs::read(&saved.path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
