//! Read-only image introspection, for reporting and pre-flight validation.

use std::fmt;
use std::fs;
use std::path::Path;

use image::{ColorType, DynamicImage};

use super::format::ImageFormatKind;
use super::{decode_image, wbmp};
use crate::error::ConvertError;
use crate::utils::format_file_size;

/// Snapshot of one image file. Created on demand, never mutated.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub file_name: String,
    pub format: ImageFormatKind,
    pub width: u32,
    pub height: u32,
    pub color_model: String,
    pub has_transparency: bool,
    pub file_size: u64,
    pub compression: String,
}

impl ImageInfo {
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }

    /// Decode memory estimate (4 bytes per pixel) and the resulting
    /// disk-to-memory compression ratio.
    pub fn estimated_memory(&self) -> u64 {
        self.pixel_count() * 4
    }

    pub fn compression_ratio(&self) -> u64 {
        if self.file_size == 0 {
            0
        } else {
            self.estimated_memory() / self.file_size
        }
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.file_name)?;
        writeln!(
            f,
            "Format: {} ({})",
            self.format.description(),
            self.format.mime_type()
        )?;
        writeln!(f, "Dimensions: {} x {} pixels", self.width, self.height)?;
        writeln!(f, "Total pixels: {}", self.pixel_count())?;
        writeln!(f, "Aspect ratio: {:.2}:1", self.aspect_ratio())?;
        writeln!(f, "Color model: {}", self.color_model)?;
        writeln!(
            f,
            "Transparency: {}",
            if self.has_transparency { "yes" } else { "no" }
        )?;
        writeln!(f, "File size: {}", format_file_size(self.file_size))?;
        writeln!(f, "Compression: {}", self.compression)?;
        writeln!(
            f,
            "Estimated decode memory: {} ({}:1 vs disk)",
            format_file_size(self.estimated_memory()),
            self.compression_ratio()
        )
    }
}

/// Inspect a file on disk: resolve its format from the extension, decode
/// it, and capture the derived snapshot.
pub fn inspect(path: &Path) -> Result<ImageInfo, ConvertError> {
    let metadata = fs::metadata(path)
        .map_err(|_| ConvertError::InputNotFound(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(ConvertError::InputNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let format = ImageFormatKind::from_extension(extension)?;
    if !format.is_readable_on_runtime() {
        return Err(ConvertError::UnsupportedFormat(format!(
            "no {} decoder is available in this build",
            format.extension().to_uppercase()
        )));
    }

    let img = decode_image(path)?;

    Ok(ImageInfo {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        format,
        width: img.width(),
        height: img.height(),
        color_model: color_model_description(&img, format, path),
        has_transparency: img.color().has_alpha(),
        file_size: metadata.len(),
        compression: format.compression_description().to_string(),
    })
}

/// Human description of the stored color model.
///
/// The decoder expands palette formats to direct color in memory, so GIF
/// reports the container's model, and WBMP streams are recognized by
/// their header rather than the expanded grayscale buffer.
fn color_model_description(img: &DynamicImage, format: ImageFormatKind, path: &Path) -> String {
    if format == ImageFormatKind::Gif {
        return "indexed (palette, 8-bit)".to_string();
    }
    if format == ImageFormatKind::Wbmp {
        if let Ok(bytes) = fs::read(path) {
            if wbmp::sniff(&bytes) {
                return "binary (1-bit)".to_string();
            }
        }
    }

    let base = match img.color() {
        ColorType::L8 => "grayscale (8-bit)",
        ColorType::La8 => "grayscale (8-bit, alpha channel)",
        ColorType::Rgb8 => "RGB (24-bit)",
        ColorType::Rgba8 => "RGBA (32-bit, alpha channel)",
        ColorType::L16 => "grayscale (16-bit)",
        ColorType::La16 => "grayscale (16-bit, alpha channel)",
        ColorType::Rgb16 => "RGB (48-bit)",
        ColorType::Rgba16 => "RGBA (64-bit, alpha channel)",
        ColorType::Rgb32F => "RGB (float)",
        ColorType::Rgba32F => "RGBA (float, alpha channel)",
        _ => "custom",
    };
    base.to_string()
}

/// Binary-detection helper for WBMP introspection tests.
#[cfg(test)]
pub(crate) fn is_binary_raster(img: &DynamicImage) -> bool {
    let gray = img.to_luma8();
    gray.pixels().all(|p| p[0] == 0 || p[0] == 255)
}
