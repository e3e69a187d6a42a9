//! Color and transparency normalization.
//!
//! Bridges the gap between what a decoded image contains and what the
//! target format can represent: alpha removal for opaque-only formats,
//! palette quantization for GIF, binarization for WBMP, and optional
//! pixel-type narrowing when optimizing lossless output for size.

use std::collections::HashMap;

use color_quant::NeuQuant;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use super::format::ImageFormatKind;
use super::wbmp::BINARY_THRESHOLD;
use super::ConversionConfig;

/// NeuQuant sampling factor: 1 samples every pixel (best quality), 30 is
/// fastest. 10 is the quantizer's own recommended balance.
const QUANTIZER_SAMPLE_FACTOR: i32 = 10;

/// A raster in a form some target format can represent directly.
#[derive(Debug)]
pub enum NormalizedImage {
    /// Pixel data the encoder can take as-is.
    Direct(DynamicImage),
    /// Palette plus per-pixel indices, for GIF.
    Indexed(IndexedImage),
    /// Strictly black-and-white raster (every pixel 0 or 255), for WBMP.
    Binary(GrayImage),
}

/// Indexed-color raster: at most 256 palette entries, one index per pixel.
#[derive(Debug)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<[u8; 3]>,
    pub indices: Vec<u8>,
}

impl IndexedImage {
    /// Expand back to direct color, for encoders without an indexed path.
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width, self.height);
        for (i, pixel) in img.pixels_mut().enumerate() {
            let rgb = self.palette[self.indices[i] as usize];
            *pixel = Rgb(rgb);
        }
        img
    }
}

impl NormalizedImage {
    /// Whether this raster satisfies the target's color-model and
    /// transparency constraints. Normalization guarantees it; the encoder
    /// re-checks as a programmer-error guard.
    pub fn satisfies(&self, target: ImageFormatKind) -> bool {
        match self {
            Self::Direct(img) => {
                !target.requires_color_reduction()
                    && (target.supports_transparency() || !has_alpha(img))
            }
            Self::Indexed(_) => target == ImageFormatKind::Gif,
            Self::Binary(img) => {
                target == ImageFormatKind::Wbmp
                    && img.pixels().all(|p| p[0] == 0 || p[0] == 255)
            }
        }
    }
}

/// Transform a decoded image to satisfy `target`'s constraints.
///
/// Steps run in order, each conditional:
/// 1. composite onto the configured background when the target cannot
///    carry the source's alpha channel;
/// 2. reduce the color model for GIF (indexed) and WBMP (binary);
/// 3. when `optimize_for_size` is set and the target is not lossy, narrow
///    the in-memory pixel type to the cheapest one the format needs.
pub fn normalize(
    img: DynamicImage,
    target: ImageFormatKind,
    config: &ConversionConfig,
) -> NormalizedImage {
    let mut current = img;

    if !target.supports_transparency() && has_alpha(&current) {
        current = DynamicImage::ImageRgb8(flatten_alpha(&current, config.background()));
    }

    if target.requires_color_reduction() {
        return match target {
            ImageFormatKind::Gif => NormalizedImage::Indexed(quantize_indexed(&current)),
            ImageFormatKind::Wbmp => NormalizedImage::Binary(binarize(&current)),
            _ => unreachable!("only GIF and WBMP require color reduction"),
        };
    }

    if config.optimize_for_size() && !target.is_lossy() {
        current = optimal_pixel_type(current, target);
    }

    NormalizedImage::Direct(current)
}

pub fn has_alpha(img: &DynamicImage) -> bool {
    img.color().has_alpha()
}

/// Composite onto an opaque canvas: `out = a * src + (1 - a) * background`
/// per channel. The only place transparency data is lost.
pub fn flatten_alpha(img: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flat = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as f32 / 255.0;
        let mut out = [0u8; 3];
        for c in 0..3 {
            let blended =
                alpha * pixel[c] as f32 + (1.0 - alpha) * background[c] as f32;
            out[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
        flat.put_pixel(x, y, Rgb(out));
    }

    flat
}

/// Quantize to an indexed-color raster of at most 256 entries.
///
/// Images that already fit a 256-color palette are mapped exactly, with no
/// quantization loss; wider gamuts go through NeuQuant (the same quantizer
/// the `image` crate's GIF encoder uses).
pub fn quantize_indexed(img: &DynamicImage) -> IndexedImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    if let Some(indexed) = exact_palette(&rgba) {
        return indexed;
    }

    let quantizer = NeuQuant::new(QUANTIZER_SAMPLE_FACTOR, 256, rgba.as_raw());
    let palette: Vec<[u8; 3]> = quantizer
        .color_map_rgb()
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();
    let indices = rgba
        .pixels()
        .map(|p| quantizer.index_of(&p.0) as u8)
        .collect();

    IndexedImage {
        width,
        height,
        palette,
        indices,
    }
}

fn exact_palette(rgba: &image::RgbaImage) -> Option<IndexedImage> {
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    let mut palette = Vec::new();
    let mut indices = Vec::with_capacity((rgba.width() * rgba.height()) as usize);

    for pixel in rgba.pixels() {
        let rgb = [pixel[0], pixel[1], pixel[2]];
        let index = match lookup.get(&rgb) {
            Some(&i) => i,
            None => {
                if palette.len() == 256 {
                    return None;
                }
                let i = palette.len() as u8;
                palette.push(rgb);
                lookup.insert(rgb, i);
                i
            }
        };
        indices.push(index);
    }

    Some(IndexedImage {
        width: rgba.width(),
        height: rgba.height(),
        palette,
        indices,
    })
}

/// Convert to 8-bit grayscale with the standard Rec.601 luminance weights.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let r = pixel[0] as f32;
        let g = pixel[1] as f32;
        let b = pixel[2] as f32;
        let luma = (0.299 * r + 0.587 * g + 0.114 * b) as u8;
        gray.put_pixel(x, y, Luma([luma]));
    }

    gray
}

/// Grayscale then fixed midpoint threshold, per the WBMP contract.
pub fn binarize(img: &DynamicImage) -> GrayImage {
    let mut gray = to_grayscale(img);
    for pixel in gray.pixels_mut() {
        pixel[0] = if pixel[0] >= BINARY_THRESHOLD { 255 } else { 0 };
    }
    gray
}

/// Narrow the in-memory raster to the cheapest pixel type the target
/// needs, so the encoder is not handed a wider buffer than the file can
/// hold. TIFF keeps whatever it was given; lossy formats never get here.
fn optimal_pixel_type(img: DynamicImage, target: ImageFormatKind) -> DynamicImage {
    match target {
        ImageFormatKind::Jpg | ImageFormatKind::Jpeg | ImageFormatKind::Bmp => {
            match img {
                DynamicImage::ImageRgb8(_) => img,
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            }
        }
        ImageFormatKind::Png => {
            if has_alpha(&img) {
                match img {
                    DynamicImage::ImageRgba8(_) => img,
                    other => DynamicImage::ImageRgba8(other.to_rgba8()),
                }
            } else {
                match img {
                    DynamicImage::ImageRgb8(_) => img,
                    other => DynamicImage::ImageRgb8(other.to_rgb8()),
                }
            }
        }
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn transparent_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 0])))
    }

    fn default_config() -> ConversionConfig {
        ConversionConfig::default()
    }

    #[test]
    fn test_flatten_fully_transparent_becomes_background() {
        let background = Rgb([200, 100, 50]);
        let flat = flatten_alpha(&transparent_image(4, 4), background);
        for pixel in flat.pixels() {
            assert_eq!(*pixel, background);
        }
    }

    #[test]
    fn test_flatten_opaque_pixels_unchanged() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            2,
            Rgba([10, 20, 30, 255]),
        ));
        let flat = flatten_alpha(&img, WHITE);
        for pixel in flat.pixels() {
            assert_eq!(*pixel, Rgb([10, 20, 30]));
        }
    }

    #[test]
    fn test_flatten_blends_partial_alpha() {
        // Half-transparent black over white lands in the middle.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            1,
            1,
            Rgba([0, 0, 0, 128]),
        ));
        let flat = flatten_alpha(&img, WHITE);
        let value = flat.get_pixel(0, 0)[0];
        assert!((126..=129).contains(&value), "got {value}");
    }

    #[test]
    fn test_normalize_strips_alpha_for_opaque_targets() {
        for target in [ImageFormatKind::Jpg, ImageFormatKind::Bmp] {
            let normalized =
                normalize(transparent_image(3, 3), target, &default_config());
            match normalized {
                NormalizedImage::Direct(img) => assert!(!has_alpha(&img)),
                other => panic!("expected direct raster, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_normalize_keeps_alpha_for_png() {
        let normalized = normalize(
            transparent_image(3, 3),
            ImageFormatKind::Png,
            &default_config(),
        );
        match normalized {
            NormalizedImage::Direct(img) => assert!(has_alpha(&img)),
            other => panic!("expected direct raster, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_gif_yields_indexed() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, _| {
            if x < 4 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        }));
        let normalized = normalize(img, ImageFormatKind::Gif, &default_config());
        match normalized {
            NormalizedImage::Indexed(indexed) => {
                assert_eq!(indexed.palette.len(), 2);
                assert_eq!(indexed.indices.len(), 64);
                let restored = indexed.to_rgb_image();
                assert_eq!(*restored.get_pixel(0, 0), Rgb([255, 0, 0]));
                assert_eq!(*restored.get_pixel(7, 0), Rgb([0, 0, 255]));
            }
            other => panic!("expected indexed raster, got {other:?}"),
        }
    }

    #[test]
    fn test_quantize_wide_gamut_stays_within_256_colors() {
        // 4096 distinct colors forces the NeuQuant path.
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }));
        let indexed = quantize_indexed(&img);
        assert!(indexed.palette.len() <= 256);
        assert_eq!(indexed.indices.len(), 64 * 64);
    }

    #[test]
    fn test_normalize_wbmp_yields_strict_binary() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, y| {
            Rgb([(x * 16) as u8, (y * 16) as u8, 128])
        }));
        let normalized = normalize(img, ImageFormatKind::Wbmp, &default_config());
        match normalized {
            NormalizedImage::Binary(binary) => {
                for pixel in binary.pixels() {
                    assert!(pixel[0] == 0 || pixel[0] == 255);
                }
            }
            other => panic!("expected binary raster, got {other:?}"),
        }
    }

    #[test]
    fn test_binarize_threshold_midpoint() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(2, 1, |x, _| {
            Luma([if x == 0 { 127 } else { 128 }])
        }));
        let binary = binarize(&img);
        assert_eq!(binary.get_pixel(0, 0)[0], 0);
        assert_eq!(binary.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_grayscale_uses_luminance_weights() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0])));
        let gray = to_grayscale(&img);
        // 0.299 * 255 = 76.2
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn test_optimize_for_size_narrows_png_without_alpha() {
        let mut config = default_config();
        config.set_optimize_for_size(true);

        let wide = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            2,
            Rgba([1, 2, 3, 255]),
        ));
        // Opaque alpha channel: PNG keeps RGBA only when transparency survives.
        let normalized = normalize(wide, ImageFormatKind::Png, &config);
        match normalized {
            NormalizedImage::Direct(DynamicImage::ImageRgba8(_)) => {}
            other => panic!("expected rgba raster kept, got {other:?}"),
        }

        let opaque = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        let normalized = normalize(opaque, ImageFormatKind::Png, &config);
        assert!(matches!(
            normalized,
            NormalizedImage::Direct(DynamicImage::ImageRgb8(_))
        ));
    }

    #[test]
    fn test_satisfies_guards() {
        let direct = NormalizedImage::Direct(transparent_image(1, 1));
        assert!(!direct.satisfies(ImageFormatKind::Bmp));
        assert!(direct.satisfies(ImageFormatKind::Png));

        let binary = NormalizedImage::Binary(GrayImage::from_pixel(1, 1, Luma([255])));
        assert!(binary.satisfies(ImageFormatKind::Wbmp));
        assert!(!binary.satisfies(ImageFormatKind::Gif));
    }
}
