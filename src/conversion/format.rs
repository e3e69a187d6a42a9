use image::ImageFormat;
use strum_macros::EnumIter;

use crate::error::ConvertError;

/// Closed enumeration of the formats the converter knows about.
///
/// Each variant carries static capability metadata; the set is fixed at
/// compile time and there is no open registration. `Jpg`/`Jpeg` and
/// `Tiff`/`Tif` are distinct entries because they resolve from distinct
/// extensions, but they share capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ImageFormatKind {
    Png,
    Jpg,
    Jpeg,
    Bmp,
    Gif,
    Tiff,
    Tif,
    Wbmp,
}

impl ImageFormatKind {
    /// Resolve a format from a file extension, case-insensitive.
    pub fn from_extension(extension: &str) -> Result<Self, ConvertError> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" => Ok(Self::Jpg),
            "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "gif" => Ok(Self::Gif),
            "tiff" => Ok(Self::Tiff),
            "tif" => Ok(Self::Tif),
            "wbmp" => Ok(Self::Wbmp),
            other => Err(ConvertError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Canonical file extension, lowercase, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Tif => "tif",
            Self::Wbmp => "wbmp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Tiff | Self::Tif => "image/tiff",
            Self::Wbmp => "image/vnd.wap.wbmp",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Png => "Portable Network Graphics",
            Self::Jpg | Self::Jpeg => "JPEG",
            Self::Bmp => "Windows Bitmap",
            Self::Gif => "Graphics Interchange Format",
            Self::Tiff | Self::Tif => "Tagged Image File Format",
            Self::Wbmp => "Wireless Bitmap",
        }
    }

    /// Whether encoded files can carry an alpha channel.
    pub fn supports_transparency(&self) -> bool {
        matches!(self, Self::Png | Self::Gif | Self::Tiff | Self::Tif)
    }

    /// Whether the encoder exposes a lossy quality knob.
    pub fn supports_quality(&self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg | Self::Tiff | Self::Tif)
    }

    /// True only for the JPEG family.
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg)
    }

    /// Formats whose encoders need a reduced color model (indexed for GIF,
    /// binary for WBMP).
    pub fn requires_color_reduction(&self) -> bool {
        matches!(self, Self::Gif | Self::Wbmp)
    }

    /// Lossless, full-fidelity formats. Converting one of these to a lossy
    /// target is worth an advisory warning.
    pub fn is_high_quality(&self) -> bool {
        matches!(self, Self::Png | Self::Tiff | Self::Tif | Self::Bmp)
    }

    /// Compression scheme the container uses, for introspection output.
    pub fn compression_description(&self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "JPEG (lossy)",
            Self::Png => "Deflate (lossless)",
            Self::Gif => "LZW (lossless)",
            Self::Tiff | Self::Tif => "Variable (LZW/Deflate/None)",
            Self::Bmp => "Uncompressed",
            Self::Wbmp => "Uncompressed",
        }
    }

    /// The `image` crate format backing this kind, if the codec lives there.
    /// WBMP has no upstream codec; it is handled by [`crate::conversion::wbmp`].
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            Self::Png => Some(ImageFormat::Png),
            Self::Jpg | Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Bmp => Some(ImageFormat::Bmp),
            Self::Gif => Some(ImageFormat::Gif),
            Self::Tiff | Self::Tif => Some(ImageFormat::Tiff),
            Self::Wbmp => None,
        }
    }

    /// Whether an encoder for this format is present in the running build.
    ///
    /// Knowing a format is not the same as being able to write it: codec
    /// support in the `image` crate is feature-gated, so this must be
    /// checked before any encode attempt. The WBMP codec is built in and
    /// always available.
    pub fn is_writable_on_runtime(&self) -> bool {
        match self.image_format() {
            Some(format) => format.writing_enabled(),
            None => true,
        }
    }

    /// Whether a decoder for this format is present in the running build.
    pub fn is_readable_on_runtime(&self) -> bool {
        match self.image_format() {
            Some(format) => format.reading_enabled(),
            None => true,
        }
    }

    /// All extensions accepted as batch inputs.
    pub fn input_extensions() -> &'static [&'static str] {
        &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "wbmp"]
    }
}

impl std::fmt::Display for ImageFormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
