use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use image::Rgb;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::conversion::format::ImageFormatKind;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Format a byte count in a human-readable way, coarser precision for
/// larger magnitudes.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else if size < 10.0 {
        format!("{:.2} {}", size, UNITS[unit])
    } else if size < 100.0 {
        format!("{:.1} {}", size, UNITS[unit])
    } else {
        format!("{:.0} {}", size, UNITS[unit])
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext)
    } else {
        false
    }
}

/// Discover candidate image files under the given roots.
///
/// Roots may be single files or directories; directories are walked to
/// depth 1 unless `recursive` is set. Only files with a known input
/// extension qualify, narrowed further by `filter` when given. The result
/// is sorted so processing order is stable.
pub fn find_image_files(
    roots: &[PathBuf],
    recursive: bool,
    filter: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let known: Vec<String> = ImageFormatKind::input_extensions()
        .iter()
        .map(|e| e.to_string())
        .collect();

    let accepted = |path: &Path| {
        has_valid_extension(path, &known)
            && filter.map_or(true, |wanted| has_valid_extension(path, wanted))
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            if accepted(root) {
                files.push(root.clone());
            }
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(if recursive { 10 } else { 1 });

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && accepted(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Flat output path: `{output_root}/{stem}.{extension}`.
pub fn generate_output_path(input: &Path, output_root: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    output_root.join(format!("{}.{}", stem, extension.to_lowercase()))
}

/// Output path that mirrors the input's directory structure relative to
/// `input_root` under the output root. Falls back to the flat layout when
/// the input is not below `input_root`.
pub fn generate_output_path_with_structure(
    input: &Path,
    input_root: &Path,
    output_root: &Path,
    extension: &str,
) -> PathBuf {
    match input.strip_prefix(input_root) {
        Ok(relative) => {
            let mut path = output_root.join(relative);
            path.set_extension(extension.to_lowercase());
            path
        }
        Err(_) => generate_output_path(input, output_root, extension),
    }
}

/// Parse a `#RGB` or `#RRGGBB` hex color.
pub fn parse_hex_color(color: &str) -> Option<Rgb<u8>> {
    let hex = color.strip_prefix('#')?;
    match hex.len() {
        3 => {
            let mut channels = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                channels[i] = v * 16 + v;
            }
            Some(Rgb(channels))
        }
        6 => {
            let mut channels = [0u8; 3];
            for (i, channel) in channels.iter_mut().enumerate() {
                *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
            }
            Some(Rgb(channels))
        }
        _ => None,
    }
}

/// Per-extension distribution of discovered inputs, for the pre-run
/// statistics table.
#[derive(Debug, Clone)]
pub struct FormatStats {
    pub extension: String,
    pub count: usize,
    pub total_size: u64,
}

pub fn collect_format_stats(files: &[PathBuf]) -> Vec<FormatStats> {
    let mut by_extension: HashMap<String, FormatStats> = HashMap::new();

    for file in files {
        let Some(extension) = get_file_extension(file) else {
            continue;
        };
        let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        let entry = by_extension
            .entry(extension.clone())
            .or_insert_with(|| FormatStats {
                extension,
                count: 0,
                total_size: 0,
            });
        entry.count += 1;
        entry.total_size += size;
    }

    let mut stats: Vec<FormatStats> = by_extension.into_values().collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then(a.extension.cmp(&b.extension)));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_file_size(50 * 1024 * 1024), "50.0 MB");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FFFFFF"), Some(Rgb([255, 255, 255])));
        assert_eq!(parse_hex_color("#000000"), Some(Rgb([0, 0, 0])));
        assert_eq!(parse_hex_color("#ff8000"), Some(Rgb([255, 128, 0])));
        assert_eq!(parse_hex_color("#f80"), Some(Rgb([255, 136, 0])));

        assert_eq!(parse_hex_color("FFFFFF"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn test_generate_output_path() {
        let out = generate_output_path(
            Path::new("/photos/summer/beach.PNG"),
            Path::new("/converted"),
            "JPG",
        );
        assert_eq!(out, PathBuf::from("/converted/beach.jpg"));
    }

    #[test]
    fn test_generate_output_path_with_structure() {
        let out = generate_output_path_with_structure(
            Path::new("/photos/trips/rome/forum.png"),
            Path::new("/photos"),
            Path::new("/converted"),
            "gif",
        );
        assert_eq!(out, PathBuf::from("/converted/trips/rome/forum.gif"));

        // Not below the input root: flat fallback.
        let out = generate_output_path_with_structure(
            Path::new("/elsewhere/pic.png"),
            Path::new("/photos"),
            Path::new("/converted"),
            "gif",
        );
        assert_eq!(out, PathBuf::from("/converted/pic.gif"));
    }

    #[test]
    fn test_find_image_files_depth_and_filter() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(sub.join("c.gif"), b"x").unwrap();

        let roots = vec![dir.path().to_path_buf()];

        let flat = find_image_files(&roots, false, None).unwrap();
        assert_eq!(flat.len(), 2);

        let recursive = find_image_files(&roots, true, None).unwrap();
        assert_eq!(recursive.len(), 3);

        let filter = vec!["png".to_string()];
        let filtered = find_image_files(&roots, true, Some(&filter)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].ends_with("a.png"));
    }

    #[test]
    fn test_find_image_files_accepts_single_file_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("single.png");
        fs::write(&file, b"x").unwrap();

        let found = find_image_files(&[file.clone()], false, None).unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn test_collect_format_stats() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        let c = dir.path().join("c.jpg");
        fs::write(&a, vec![0u8; 100]).unwrap();
        fs::write(&b, vec![0u8; 50]).unwrap();
        fs::write(&c, vec![0u8; 10]).unwrap();

        let stats = collect_format_stats(&[a, b, c]);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].extension, "png");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].total_size, 150);
        assert_eq!(stats[1].extension, "jpg");
    }
}
