//! Format-aware conversion engine: capability registry, normalization,
//! encoding dispatch, per-file orchestration and batch coordination.

pub mod batch;
pub mod encode;
pub mod format;
pub mod info;
pub mod normalize;
pub mod validate;
pub mod wbmp;

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageReader, Rgb};

use crate::error::ConvertError;
use crate::report::Reporter;
use format::ImageFormatKind;
use normalize::normalize;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Settings for one batch run. Built once, read-only afterwards; the
/// numeric fields are clamped on every write so they are always in range
/// no matter what the caller passes.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    quality: f32,
    png_compression: u8,
    preserve_quality: bool,
    background: Rgb<u8>,
    optimize_for_size: bool,
    preserve_metadata: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: 0.85,
            png_compression: 6,
            preserve_quality: false,
            background: WHITE,
            optimize_for_size: false,
            preserve_metadata: false,
        }
    }
}

impl ConversionConfig {
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Clamped to [0.0, 1.0].
    pub fn set_quality(&mut self, quality: f32) {
        self.quality = quality.clamp(0.0, 1.0);
    }

    pub fn png_compression(&self) -> u8 {
        self.png_compression
    }

    /// Clamped to [0, 9]; takes a signed value so out-of-range callers
    /// (including negative ones) are folded into range instead of failing.
    pub fn set_png_compression(&mut self, level: i32) {
        self.png_compression = level.clamp(0, 9) as u8;
    }

    pub fn preserve_quality(&self) -> bool {
        self.preserve_quality
    }

    pub fn set_preserve_quality(&mut self, preserve: bool) {
        self.preserve_quality = preserve;
    }

    pub fn background(&self) -> Rgb<u8> {
        self.background
    }

    pub fn set_background(&mut self, background: Rgb<u8>) {
        self.background = background;
    }

    pub fn optimize_for_size(&self) -> bool {
        self.optimize_for_size
    }

    pub fn set_optimize_for_size(&mut self, optimize: bool) {
        self.optimize_for_size = optimize;
    }

    /// Accepted for configuration completeness; metadata preservation is
    /// out of scope and the flag is never acted on.
    pub fn preserve_metadata(&self) -> bool {
        self.preserve_metadata
    }

    pub fn set_preserve_metadata(&mut self, preserve: bool) {
        self.preserve_metadata = preserve;
    }
}

/// Decode a source file into an in-memory raster.
///
/// Prefers content sniffing over the file extension: WBMP streams are
/// recognized by their own header (the upstream codecs do not know the
/// format), everything else goes through the guessing reader. When no
/// decoder registers interest in the content, falls back to the generic
/// extension-driven path as a best effort.
pub fn decode_image(path: &Path) -> Result<DynamicImage, ConvertError> {
    let decode_err = |reason: String| ConvertError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| decode_err(e.to_string()))?;

    if wbmp::sniff(&bytes) {
        return wbmp::decode(&mut Cursor::new(&bytes))
            .map(DynamicImage::ImageLuma8)
            .map_err(|e| decode_err(e.to_string()));
    }

    let reader = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;

    if reader.format().is_some() {
        return reader.decode().map_err(|e| decode_err(e.to_string()));
    }

    let fallback = ImageReader::open(path).map_err(|e| decode_err(e.to_string()))?;
    fallback.decode().map_err(|e| decode_err(e.to_string()))
}

/// Single-file conversion pipeline: validate, decode, normalize, encode.
///
/// Holds the run's configuration and the injected reporter; one instance
/// serves a whole batch, but each call owns its decode buffer alone.
pub struct Converter<'a> {
    config: ConversionConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> Converter<'a> {
    pub fn new(config: ConversionConfig, reporter: &'a dyn Reporter) -> Self {
        Self { config, reporter }
    }

    #[allow(dead_code)]
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert `input` to `output`, resolving the target format from an
    /// extension string first.
    #[allow(dead_code)]
    pub fn convert(&self, input: &Path, output: &Path, target: &str) -> Result<(), ConvertError> {
        let format = ImageFormatKind::from_extension(target)?;
        self.convert_file(input, output, format)
    }

    /// Convert one file. Any failure is reported and returned; nothing is
    /// thrown past this boundary and no partial output file survives.
    pub fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        target: ImageFormatKind,
    ) -> Result<(), ConvertError> {
        match self.run_pipeline(input, output, target) {
            Ok(()) => {
                self.reporter.info(&format!(
                    "converted {} -> {} [{}]",
                    input.display(),
                    output.display(),
                    target.mime_type()
                ));
                Ok(())
            }
            Err(e) => {
                self.reporter
                    .error(&format!("conversion failed for {}: {e}", input.display()));
                Err(e)
            }
        }
    }

    fn run_pipeline(
        &self,
        input: &Path,
        output: &Path,
        target: ImageFormatKind,
    ) -> Result<(), ConvertError> {
        if !input.is_file() {
            return Err(ConvertError::InputNotFound(input.to_path_buf()));
        }

        // Encoder availability is checked before any decoding work so the
        // failure message names the format instead of leaking codec noise.
        if !target.is_writable_on_runtime() {
            return Err(ConvertError::UnsupportedFormat(format!(
                "no {} encoder is available in this build",
                target.extension().to_uppercase()
            )));
        }

        let img = decode_image(input)?;
        self.reporter.verbose(&format!(
            "decoded {} ({}x{}, {:?})",
            input.display(),
            img.width(),
            img.height(),
            img.color()
        ));

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConvertError::OutputPath {
                    path: output.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
        }

        let normalized = normalize(img, target, &self.config);
        debug_assert!(
            normalized.satisfies(target),
            "normalization broke the {target} constraints"
        );

        encode::encode_image(&normalized, output, target, &self.config, self.reporter)
    }
}
