//! Pre-flight validation of a single conversion request.
//!
//! Blocking errors stop a conversion before any pixel is touched;
//! warnings describe expected but survivable fidelity loss and never
//! block anything.

use std::path::Path;

use super::format::ImageFormatKind;
use super::info::{inspect, ImageInfo};

/// Pixel count above which a large-image performance warning is emitted.
pub const LARGE_IMAGE_PIXELS: u64 = 50_000_000;

/// Outcome of validating one (input, target format) pair. Errors and
/// warnings accumulate in order during validation and are read-only for
/// the caller.
#[derive(Debug, Default)]
pub struct ValidationReport {
    errors: Vec<String>,
    warnings: Vec<String>,
    info: Option<ImageInfo>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn info(&self) -> Option<&ImageInfo> {
        self.info.as_ref()
    }

    fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Validate that `input` can be converted to the `target` format.
///
/// Pure with respect to the filesystem apart from reading the input;
/// nothing is written and nothing is logged.
pub fn validate_conversion(input: &Path, target: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !input.is_file() {
        report.add_error(format!("input file does not exist: {}", input.display()));
        return report;
    }

    let target_format = match ImageFormatKind::from_extension(target) {
        Ok(format) => format,
        Err(_) => {
            report.add_error(format!("unsupported target format: {target}"));
            return report;
        }
    };

    if !target_format.is_writable_on_runtime() {
        report.add_error(format!(
            "no {} encoder is available in this build",
            target_format.extension().to_uppercase()
        ));
        return report;
    }

    let info = match inspect(input) {
        Ok(info) => info,
        Err(e) => {
            report.add_error(format!("could not read image: {e}"));
            return report;
        }
    };

    if info.has_transparency && !target_format.supports_transparency() {
        report.add_warning(format!(
            "{} does not support transparency; pixels will be composited onto the background color",
            target_format.extension().to_uppercase()
        ));
    }

    if info.format.is_high_quality() && target_format.is_lossy() {
        report.add_warning(
            "converting a lossless format to a lossy one; quality degradation is possible",
        );
    }

    if info.pixel_count() > LARGE_IMAGE_PIXELS {
        report.add_warning(format!(
            "very large image ({} pixels); conversion may be slow",
            info.pixel_count()
        ));
    }

    report.info = Some(info);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_missing_input_is_blocking() {
        let report = validate_conversion(Path::new("/no/such/file.png"), "jpg");
        assert!(report.has_errors());
        assert!(report.info().is_none());
    }

    #[test]
    fn test_unknown_target_is_blocking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])).save(&path).unwrap();

        let report = validate_conversion(&path, "webp");
        assert!(report.has_errors());
        assert!(report.errors()[0].contains("webp"));
    }

    #[test]
    fn test_unreadable_source_is_blocking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let report = validate_conversion(&path, "jpg");
        assert!(report.has_errors());
    }

    #[test]
    fn test_lossless_to_lossy_warns_once() {
        // An opaque PNG to JPEG: exactly one warning (quality), no size
        // warning below the 50M pixel threshold, no errors.
        let dir = tempdir().unwrap();
        let path = dir.path().join("opaque.png");
        RgbImage::from_pixel(100, 100, Rgb([9, 9, 9])).save(&path).unwrap();

        let report = validate_conversion(&path, "jpg");
        assert!(!report.has_errors());
        assert_eq!(report.warnings().len(), 1);
        assert!(report.warnings()[0].contains("lossy"));
        assert!(report.info().is_some());
    }

    #[test]
    fn test_transparency_loss_warns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])).save(&path).unwrap();

        let report = validate_conversion(&path, "bmp");
        assert!(!report.has_errors());
        assert!(report
            .warnings()
            .iter()
            .any(|w| w.contains("transparency")));
    }

    #[test]
    fn test_transparency_kept_no_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])).save(&path).unwrap();

        let report = validate_conversion(&path, "gif");
        assert!(!report.has_errors());
        assert!(report
            .warnings()
            .iter()
            .all(|w| !w.contains("transparency")));
    }

    #[test]
    fn test_target_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])).save(&path).unwrap();

        let report = validate_conversion(&path, "TIFF");
        assert!(!report.has_errors());
    }
}
