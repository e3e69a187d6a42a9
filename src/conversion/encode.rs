//! Per-format encoding parameter selection and the encode call itself.
//!
//! Every path encodes into an in-memory buffer first and writes the file
//! in one shot; a failed write removes the partial output so no
//! half-written file survives an error.

use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tiff::encoder::colortype;
use tiff::encoder::compression::{Deflate, Lzw, Packbits};
use tiff::encoder::{TiffEncoder, TiffValue};

use super::format::ImageFormatKind;
use super::normalize::{flatten_alpha, has_alpha, IndexedImage, NormalizedImage};
use super::wbmp;
use super::ConversionConfig;
use crate::error::ConvertError;
use crate::report::Reporter;

/// TIFF compression schemes this build can produce, in preference order
/// after LZW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffScheme {
    Lzw,
    Deflate,
    Packbits,
    Uncompressed,
}

pub const TIFF_AVAILABLE_SCHEMES: [TiffScheme; 4] = [
    TiffScheme::Lzw,
    TiffScheme::Deflate,
    TiffScheme::Packbits,
    TiffScheme::Uncompressed,
];

/// LZW when the runtime offers it, otherwise the first available scheme.
pub fn select_tiff_scheme() -> TiffScheme {
    if TIFF_AVAILABLE_SCHEMES.contains(&TiffScheme::Lzw) {
        TiffScheme::Lzw
    } else {
        TIFF_AVAILABLE_SCHEMES[0]
    }
}

/// The quality actually sent to lossy encoders: `preserve_quality`
/// overrides the configured value with maximum fidelity.
pub fn effective_quality(config: &ConversionConfig) -> f32 {
    if config.preserve_quality() {
        1.0
    } else {
        config.quality()
    }
}

/// Map the [0.0, 1.0] quality to the JPEG encoder's 1-100 knob.
fn jpeg_quality_value(config: &ConversionConfig) -> u8 {
    (effective_quality(config) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Map the user-facing 0-9 compression level (more = smaller) onto the
/// encoder's tiers. The scale is inverted first (`1.0 - level/9.0`)
/// because PNG's quality convention runs opposite to the level knob.
fn png_compression_type(config: &ConversionConfig) -> CompressionType {
    let inverted = 1.0 - f32::from(config.png_compression()) / 9.0;
    if inverted > 0.7 {
        CompressionType::Fast
    } else if inverted > 0.3 {
        CompressionType::Default
    } else {
        CompressionType::Best
    }
}

/// Encode a normalized raster to `output` in the target format.
///
/// Checks runtime encoder availability before anything else; a missing
/// codec is a blocking [`ConvertError::UnsupportedFormat`], never a panic
/// from the codec layer.
pub fn encode_image(
    normalized: &NormalizedImage,
    output: &Path,
    target: ImageFormatKind,
    config: &ConversionConfig,
    reporter: &dyn Reporter,
) -> Result<(), ConvertError> {
    if !target.is_writable_on_runtime() {
        return Err(ConvertError::UnsupportedFormat(format!(
            "no {} encoder is available in this build",
            target.extension().to_uppercase()
        )));
    }

    let bytes = match (target, normalized) {
        (ImageFormatKind::Jpg | ImageFormatKind::Jpeg, NormalizedImage::Direct(img)) => {
            encode_jpeg(img, config).map_err(|e| encode_error(target, output, e))?
        }
        (ImageFormatKind::Png, NormalizedImage::Direct(img)) => {
            encode_png(img, config).map_err(|e| encode_error(target, output, e))?
        }
        (ImageFormatKind::Bmp, NormalizedImage::Direct(img)) => {
            encode_bmp(img, config, reporter).map_err(|e| encode_error(target, output, e))?
        }
        (ImageFormatKind::Gif, NormalizedImage::Indexed(indexed)) => {
            encode_gif(indexed, reporter).map_err(|e| encode_error(target, output, e))?
        }
        (ImageFormatKind::Tiff | ImageFormatKind::Tif, NormalizedImage::Direct(img)) => {
            encode_tiff(img, config, reporter).map_err(|e| encode_error(target, output, e))?
        }
        (ImageFormatKind::Wbmp, NormalizedImage::Binary(binary)) => {
            encode_wbmp(binary, reporter).map_err(|e| encode_error(target, output, e))?
        }
        (target, other) => {
            debug_assert!(
                false,
                "normalized raster {other:?} does not match target {target}"
            );
            return Err(encode_error(
                target,
                output,
                format!("normalized raster does not match target {target}"),
            ));
        }
    };

    write_output(output, &bytes, target)
}

fn encode_error(
    target: ImageFormatKind,
    output: &Path,
    reason: impl ToString,
) -> ConvertError {
    ConvertError::Encode {
        format: target.extension(),
        path: output.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// One-shot write; a failed write removes whatever partial file was left.
fn write_output(output: &Path, bytes: &[u8], target: ImageFormatKind) -> Result<(), ConvertError> {
    if let Err(e) = fs::write(output, bytes) {
        let _ = fs::remove_file(output);
        return Err(encode_error(target, output, e));
    }
    Ok(())
}

fn encode_jpeg(img: &DynamicImage, config: &ConversionConfig) -> Result<Vec<u8>, String> {
    let mut cursor = Cursor::new(Vec::new());
    let quality = jpeg_quality_value(config);

    // The JPEG encoder accepts grayscale and RGB; everything else narrows
    // to RGB (alpha is already gone by the time we get here).
    let holder;
    let img = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        other => {
            holder = DynamicImage::ImageRgb8(other.to_rgb8());
            &holder
        }
    };

    img.write_with_encoder(JpegEncoder::new_with_quality(&mut cursor, quality))
        .map_err(|e| e.to_string())?;
    Ok(cursor.into_inner())
}

fn encode_png(img: &DynamicImage, config: &ConversionConfig) -> Result<Vec<u8>, String> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_with_encoder(PngEncoder::new_with_quality(
        &mut cursor,
        png_compression_type(config),
        FilterType::Adaptive,
    ))
    .map_err(|e| e.to_string())?;
    Ok(cursor.into_inner())
}

fn encode_bmp(
    img: &DynamicImage,
    config: &ConversionConfig,
    reporter: &dyn Reporter,
) -> Result<Vec<u8>, String> {
    // BMP never carries alpha. Normalization removes it upstream; if a
    // raster with an alpha channel still arrives, composite as a final guard.
    let rgb = if has_alpha(img) {
        reporter.warn("alpha channel reached the BMP encoder, compositing onto background");
        flatten_alpha(img, config.background())
    } else {
        img.to_rgb8()
    };

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut cursor, ImageFormat::Bmp)
        .map_err(|e| e.to_string())?;
    Ok(cursor.into_inner())
}

fn encode_gif(indexed: &IndexedImage, reporter: &dyn Reporter) -> Result<Vec<u8>, String> {
    match encode_gif_indexed(indexed) {
        Ok(bytes) => Ok(bytes),
        Err(primary) => {
            // Generic encoder fallback, no explicit parameters.
            reporter.warn(&format!(
                "indexed GIF encoder failed ({primary}), falling back to generic encoder"
            ));
            let mut cursor = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(indexed.to_rgb_image())
                .write_to(&mut cursor, ImageFormat::Gif)
                .map_err(|e| e.to_string())?;
            Ok(cursor.into_inner())
        }
    }
}

fn encode_gif_indexed(indexed: &IndexedImage) -> Result<Vec<u8>, String> {
    if indexed.width > u16::MAX as u32 || indexed.height > u16::MAX as u32 {
        return Err(format!(
            "dimensions {}x{} exceed the GIF limit of 65535",
            indexed.width, indexed.height
        ));
    }

    let mut palette_flat = Vec::with_capacity(indexed.palette.len() * 3);
    for rgb in &indexed.palette {
        palette_flat.extend_from_slice(rgb);
    }

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = gif::Encoder::new(
            &mut cursor,
            indexed.width as u16,
            indexed.height as u16,
            &[],
        )
        .map_err(|e| e.to_string())?;

        let frame = gif::Frame {
            width: indexed.width as u16,
            height: indexed.height as u16,
            buffer: Cow::Borrowed(indexed.indices.as_slice()),
            palette: Some(palette_flat),
            ..gif::Frame::default()
        };
        encoder.write_frame(&frame).map_err(|e| e.to_string())?;
    }
    Ok(cursor.into_inner())
}

fn encode_tiff(
    img: &DynamicImage,
    config: &ConversionConfig,
    reporter: &dyn Reporter,
) -> Result<Vec<u8>, String> {
    let scheme = select_tiff_scheme();
    if !config.preserve_quality() && config.quality() < 1.0 {
        // The scalar quality knob only affects lossy-in-TIFF codecs, which
        // this encoder does not produce; the selected schemes are lossless.
        reporter.verbose(&format!(
            "TIFF quality {:.2} requested; {scheme:?} is lossless and ignores it",
            config.quality()
        ));
    }

    let mut cursor = Cursor::new(Vec::new());
    let result = match img {
        DynamicImage::ImageLuma8(gray) => write_tiff_frame::<colortype::Gray8>(
            &mut cursor,
            img.width(),
            img.height(),
            gray.as_raw(),
            scheme,
        ),
        DynamicImage::ImageLuma16(gray) => write_tiff_frame::<colortype::Gray16>(
            &mut cursor,
            img.width(),
            img.height(),
            gray.as_raw(),
            scheme,
        ),
        DynamicImage::ImageRgb16(rgb) => write_tiff_frame::<colortype::RGB16>(
            &mut cursor,
            img.width(),
            img.height(),
            rgb.as_raw(),
            scheme,
        ),
        DynamicImage::ImageRgba16(rgba) => write_tiff_frame::<colortype::RGBA16>(
            &mut cursor,
            img.width(),
            img.height(),
            rgba.as_raw(),
            scheme,
        ),
        other if has_alpha(other) => {
            let rgba = other.to_rgba8();
            write_tiff_frame::<colortype::RGBA8>(
                &mut cursor,
                rgba.width(),
                rgba.height(),
                rgba.as_raw(),
                scheme,
            )
        }
        other => {
            let rgb = other.to_rgb8();
            write_tiff_frame::<colortype::RGB8>(
                &mut cursor,
                rgb.width(),
                rgb.height(),
                rgb.as_raw(),
                scheme,
            )
        }
    };
    result.map_err(|e| e.to_string())?;
    Ok(cursor.into_inner())
}

fn write_tiff_frame<C: colortype::ColorType>(
    cursor: &mut Cursor<Vec<u8>>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    scheme: TiffScheme,
) -> tiff::TiffResult<()>
where
    [C::Inner]: TiffValue,
{
    let mut encoder = TiffEncoder::new(cursor)?;
    match scheme {
        TiffScheme::Lzw => {
            encoder.write_image_with_compression::<C, _>(width, height, Lzw, data)
        }
        TiffScheme::Deflate => encoder.write_image_with_compression::<C, _>(
            width,
            height,
            Deflate::default(),
            data,
        ),
        TiffScheme::Packbits => {
            encoder.write_image_with_compression::<C, _>(width, height, Packbits, data)
        }
        TiffScheme::Uncompressed => encoder.write_image::<C>(width, height, data),
    }
}

fn encode_wbmp(binary: &image::GrayImage, reporter: &dyn Reporter) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    match wbmp::encode_binary(&mut buffer, binary) {
        Ok(()) => Ok(buffer),
        Err(primary) => {
            // Documented fallback: retry with the grayscale (non-binary)
            // representation, thresholded at write time.
            reporter.warn(&format!(
                "binary WBMP write failed ({primary}), retrying with grayscale representation"
            ));
            buffer.clear();
            wbmp::encode_gray(&mut buffer, binary).map_err(|e| e.to_string())?;
            Ok(buffer)
        }
    }
}
