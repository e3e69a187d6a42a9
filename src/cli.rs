use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use anyhow::Result;

use crate::utils::parse_hex_color;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TargetFormat {
    /// Portable Network Graphics (lossless, transparency)
    #[value(name = "png")]
    Png,
    /// JPEG (lossy, adjustable quality)
    #[value(name = "jpg")]
    Jpg,
    /// JPEG, long extension
    #[value(name = "jpeg")]
    Jpeg,
    /// Windows Bitmap (uncompressed, no transparency)
    #[value(name = "bmp")]
    Bmp,
    /// Graphics Interchange Format (256 colors, transparency)
    #[value(name = "gif")]
    Gif,
    /// Tagged Image File Format (lossless, optional compression)
    #[value(name = "tiff")]
    Tiff,
    /// Tagged Image File Format, short extension
    #[value(name = "tif")]
    Tif,
    /// Wireless Bitmap (1-bit monochrome)
    #[value(name = "wbmp")]
    Wbmp,
}

#[derive(Parser, Debug)]
#[command(
    name = "imgforge",
    about = "Batch raster image converter with format-aware normalization",
    long_about = "
ImgForge - Batch Image Converter

Converts images between PNG, JPEG, BMP, GIF, TIFF and WBMP, adapting color
model and transparency to whatever the target format can represent: alpha
channels are composited onto a configurable background for opaque-only
formats, GIF output is palette-quantized, and WBMP output is binarized.

Key Features:
• Capability-aware conversion (transparency, quality, color reduction)
• Sequential batch processing with per-file error isolation
• Pre-flight validation with advisory warnings
• Directory structure preservation for recursive runs
• Per-format statistics and detailed image introspection

Example Usage:
  # Convert a folder of images to JPEG at quality 0.9
  imgforge -i ~/Photos -o ~/converted -f jpg -q 0.9

  # Recursive conversion keeping the directory layout
  imgforge -i ~/Photos -o ~/converted -f png --recursive --preserve-structure

  # Convert only PNG and TIFF sources to GIF
  imgforge -i ~/scans -o ~/gifs -f gif --filter-format png,tiff

  # Maximum-compression PNG output, overwriting previous results
  imgforge -i ~/Photos -o ~/small -f png --png-compression 9 --overwrite

  # Composite transparency onto black instead of white
  imgforge -i ~/logos -o ~/flat -f bmp --background '#000000'

  # Inspect images without converting anything
  imgforge -i ~/Photos --info

  # Show the format capability table
  imgforge --list-formats

  # Dry run: discovery, validation and planned paths only
  imgforge -i ~/Photos -o ~/converted -f wbmp --dry-run --verbose"
)]
pub struct Args {
    /// Input directories or single image files (can be specified multiple times)
    #[arg(
        short = 'i',
        long = "input",
        required_unless_present = "list_formats",
        value_name = "DIR|FILE"
    )]
    pub input_paths: Vec<PathBuf>,

    /// Output directory for converted images
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Target format
    #[arg(short = 'f', long = "format", required_unless_present_any = ["list_formats", "info"])]
    pub format: Option<TargetFormat>,

    /// Quality for lossy output, 0.0-1.0 (out-of-range values are clamped)
    #[arg(short = 'q', long = "quality", default_value = "0.85", value_name = "Q")]
    pub quality: f32,

    /// PNG compression level, 0-9 (more = smaller; clamped)
    #[arg(long = "png-compression", default_value = "6", value_name = "LEVEL")]
    pub png_compression: i32,

    /// Ignore the quality setting and request maximum fidelity
    #[arg(long = "preserve-quality")]
    pub preserve_quality: bool,

    /// Background color used when removing transparency (hex RGB, e.g. #FFFFFF)
    #[arg(long = "background", default_value = "#FFFFFF", value_name = "COLOR")]
    pub background: String,

    /// Re-encode lossless output in the narrowest pixel type the format needs
    #[arg(long = "optimize-size")]
    pub optimize_size: bool,

    /// Accepted for compatibility; metadata is never copied to outputs
    #[arg(long = "preserve-metadata", hide = true)]
    pub preserve_metadata: bool,

    /// Search input directories recursively
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Mirror the input directory structure under the output directory
    /// (only meaningful with --recursive)
    #[arg(long = "preserve-structure")]
    pub preserve_structure: bool,

    /// Replace existing output files
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Comma-separated list of source formats to convert (e.g. "png,tiff")
    #[arg(long = "filter-format", value_name = "LIST")]
    pub filter_format: Option<String>,

    /// Show per-format statistics of the discovered inputs before converting
    #[arg(long = "stats")]
    pub stats: bool,

    /// Show detailed information about the input images and exit
    #[arg(long = "info")]
    pub info: bool,

    /// List supported formats and their capabilities, then exit
    #[arg(long = "list-formats")]
    pub list_formats: bool,

    /// Discover and validate without writing any files
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Emit machine-readable JSON lines instead of styled output
    #[arg(long = "json-progress")]
    pub json_progress: bool,
}

impl Args {
    /// Source-format filter as a lowercase extension list.
    pub fn filter_formats(&self) -> Option<Vec<String>> {
        self.filter_format.as_ref().map(|list| {
            list.split(',')
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect()
        })
    }
}

/// Validate command line arguments
pub fn validate_inputs(args: &Args) -> Result<()> {
    for input_path in &args.input_paths {
        if !input_path.exists() {
            return Err(anyhow::anyhow!(
                "Input path does not exist: {}",
                input_path.display()
            ));
        }
        if !input_path.is_dir() && !input_path.is_file() {
            return Err(anyhow::anyhow!(
                "Input path is neither a file nor a directory: {}",
                input_path.display()
            ));
        }
    }

    if parse_hex_color(&args.background).is_none() {
        return Err(anyhow::anyhow!(
            "Invalid background color format: '{}'. Expected hex format like #RRGGBB",
            args.background
        ));
    }

    if let Some(filter) = args.filter_formats() {
        if filter.is_empty() {
            return Err(anyhow::anyhow!("No valid formats in --filter-format"));
        }
    }

    if args.preserve_structure && !args.recursive {
        return Err(anyhow::anyhow!(
            "--preserve-structure only makes sense together with --recursive"
        ));
    }

    Ok(())
}
