//! Sequential batch coordination and aggregate statistics.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::format::ImageFormatKind;
use super::validate::validate_conversion;
use super::{ConversionConfig, Converter};
use crate::error::ConvertError;
use crate::report::Reporter;
use crate::utils::{generate_output_path, generate_output_path_with_structure};

/// Outcome of one batch item. The output path is present only on success.
#[derive(Debug, Clone)]
pub struct ConversionRecord {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub duration: Duration,
    pub error: Option<String>,
}

impl ConversionRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered record sequence for a whole run; statistics are computed from
/// the records on demand.
#[derive(Debug, Default)]
pub struct BatchReport {
    records: Vec<ConversionRecord>,
}

impl BatchReport {
    pub fn push(&mut self, record: ConversionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.total_count() - self.success_count()
    }

    /// Percentage of successful records; 0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.total_count() as f64 * 100.0
        }
    }

    /// Wall-clock time summed over successful records only.
    pub fn total_duration(&self) -> Duration {
        self.records
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.duration)
            .sum()
    }

    pub fn average_duration(&self) -> Duration {
        let successes = self.success_count();
        if successes == 0 {
            Duration::ZERO
        } else {
            self.total_duration() / successes as u32
        }
    }
}

/// Glue-level knobs for a batch run: output naming and clobber policy.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Mirror each input's directory structure under the output root.
    pub preserve_structure: bool,
    /// Base the relative structure on this root (required when
    /// `preserve_structure` is set and inputs come from a directory walk).
    pub input_root: Option<PathBuf>,
    /// Replace existing output files instead of recording a failure.
    pub overwrite: bool,
}

/// Resolve where one input's converted file will land.
pub fn plan_output_path(
    input: &Path,
    output_root: &Path,
    target: ImageFormatKind,
    options: &BatchOptions,
) -> PathBuf {
    match (&options.input_root, options.preserve_structure) {
        (Some(root), true) => {
            generate_output_path_with_structure(input, root, output_root, target.extension())
        }
        _ => generate_output_path(input, output_root, target.extension()),
    }
}

/// Run a whole batch sequentially, best-effort: a failing file becomes a
/// failed record and the run continues. The only fatal condition is an
/// output root that cannot be prepared, detected before the first item.
#[allow(dead_code)]
pub fn run_batch(
    inputs: &[PathBuf],
    output_root: &Path,
    target: ImageFormatKind,
    config: ConversionConfig,
    options: &BatchOptions,
    reporter: &dyn Reporter,
) -> Result<BatchReport, ConvertError> {
    run_batch_with_progress(inputs, output_root, target, config, options, reporter, |_, _| {})
}

/// Same as [`run_batch`] with a per-item callback for progress surfaces.
/// The callback receives the 1-based item count and the finished record.
#[allow(clippy::too_many_arguments)]
pub fn run_batch_with_progress<F>(
    inputs: &[PathBuf],
    output_root: &Path,
    target: ImageFormatKind,
    config: ConversionConfig,
    options: &BatchOptions,
    reporter: &dyn Reporter,
    mut progress: F,
) -> Result<BatchReport, ConvertError>
where
    F: FnMut(usize, &ConversionRecord),
{
    fs::create_dir_all(output_root).map_err(|e| ConvertError::OutputPath {
        path: output_root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let converter = Converter::new(config, reporter);
    let mut report = BatchReport::default();

    for (index, input) in inputs.iter().enumerate() {
        let started = Instant::now();
        let output = plan_output_path(input, output_root, target, options);

        let record = if output.exists() && !options.overwrite {
            ConversionRecord {
                input: input.clone(),
                output: None,
                duration: started.elapsed(),
                error: Some(format!(
                    "output file already exists: {} (pass --overwrite to replace it)",
                    output.display()
                )),
            }
        } else {
            convert_one(&converter, input, &output, target, reporter, started)
        };

        progress(index + 1, &record);
        report.push(record);
    }

    Ok(report)
}

fn convert_one(
    converter: &Converter<'_>,
    input: &Path,
    output: &Path,
    target: ImageFormatKind,
    reporter: &dyn Reporter,
    started: Instant,
) -> ConversionRecord {
    // Pre-flight gate: blocking findings skip the conversion entirely,
    // advisory findings are surfaced and the conversion proceeds.
    let validation = validate_conversion(input, target.extension());
    for warning in validation.warnings() {
        reporter.warn(&format!("{}: {warning}", input.display()));
    }
    if validation.has_errors() {
        return ConversionRecord {
            input: input.to_path_buf(),
            output: None,
            duration: started.elapsed(),
            error: Some(validation.errors().join("; ")),
        };
    }

    match converter.convert_file(input, output, target) {
        Ok(()) => ConversionRecord {
            input: input.to_path_buf(),
            output: Some(output.to_path_buf()),
            duration: started.elapsed(),
            error: None,
        },
        Err(e) => ConversionRecord {
            input: input.to_path_buf(),
            output: None,
            duration: started.elapsed(),
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(path: &Path) {
        RgbImage::from_pixel(4, 4, Rgb([50, 60, 70])).save(path).unwrap();
    }

    #[test]
    fn test_batch_counts_and_success_rate() {
        // 10 inputs, 3 of them unreadable garbage.
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let mut inputs = Vec::new();
        for i in 0..10 {
            let path = dir.path().join(format!("img{i}.png"));
            if i < 3 {
                fs::write(&path, b"not an image at all").unwrap();
            } else {
                write_png(&path);
            }
            inputs.push(path);
        }

        let reporter = MemoryReporter::new();
        let report = run_batch(
            &inputs,
            &out,
            ImageFormatKind::Bmp,
            ConversionConfig::default(),
            &BatchOptions::default(),
            &reporter,
        )
        .unwrap();

        assert_eq!(report.total_count(), 10);
        assert_eq!(report.failure_count(), 3);
        assert_eq!(report.success_count(), 7);
        assert!((report.success_rate() - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_batch_rate_is_zero() {
        let report = BatchReport::default();
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.average_duration(), Duration::ZERO);
    }

    #[test]
    fn test_record_order_matches_input_order() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let names = ["zeta.png", "alpha.png", "mid.png"];
        let inputs: Vec<PathBuf> = names
            .iter()
            .map(|n| {
                let p = dir.path().join(n);
                write_png(&p);
                p
            })
            .collect();

        let reporter = MemoryReporter::new();
        let report = run_batch(
            &inputs,
            &out,
            ImageFormatKind::Jpg,
            ConversionConfig::default(),
            &BatchOptions::default(),
            &reporter,
        )
        .unwrap();

        for (record, input) in report.records().iter().zip(&inputs) {
            assert_eq!(&record.input, input);
        }
    }

    #[test]
    fn test_overwrite_policy() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let input = dir.path().join("a.png");
        write_png(&input);
        let inputs = vec![input];

        let reporter = MemoryReporter::new();
        let first = run_batch(
            &inputs,
            &out,
            ImageFormatKind::Bmp,
            ConversionConfig::default(),
            &BatchOptions::default(),
            &reporter,
        )
        .unwrap();
        assert_eq!(first.success_count(), 1);

        // Second run refuses to clobber.
        let second = run_batch(
            &inputs,
            &out,
            ImageFormatKind::Bmp,
            ConversionConfig::default(),
            &BatchOptions::default(),
            &reporter,
        )
        .unwrap();
        assert_eq!(second.failure_count(), 1);
        assert!(second.records()[0]
            .error
            .as_deref()
            .unwrap()
            .contains("already exists"));

        let third = run_batch(
            &inputs,
            &out,
            ImageFormatKind::Bmp,
            ConversionConfig::default(),
            &BatchOptions {
                overwrite: true,
                ..BatchOptions::default()
            },
            &reporter,
        )
        .unwrap();
        assert_eq!(third.success_count(), 1);
    }

    #[test]
    fn test_preserve_structure_mirrors_subdirectories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        let nested = root.join("trips/rome");
        fs::create_dir_all(&nested).unwrap();
        let input = nested.join("forum.png");
        write_png(&input);
        let out = dir.path().join("out");

        let options = BatchOptions {
            preserve_structure: true,
            input_root: Some(root.clone()),
            overwrite: false,
        };
        let reporter = MemoryReporter::new();
        let report = run_batch(
            &[input],
            &out,
            ImageFormatKind::Jpg,
            ConversionConfig::default(),
            &options,
            &reporter,
        )
        .unwrap();

        assert_eq!(report.success_count(), 1);
        assert!(out.join("trips/rome/forum.jpg").is_file());
    }

    #[test]
    fn test_unpreparable_output_root_is_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();

        let err = run_batch(
            &[],
            &blocker.join("out"),
            ImageFormatKind::Png,
            ConversionConfig::default(),
            &BatchOptions::default(),
            &MemoryReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::OutputPath { .. }));
    }

    #[test]
    fn test_progress_callback_sees_every_item() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs: Vec<PathBuf> = (0..3)
            .map(|i| {
                let p = dir.path().join(format!("{i}.png"));
                write_png(&p);
                p
            })
            .collect();

        let mut seen = Vec::new();
        let reporter = MemoryReporter::new();
        run_batch_with_progress(
            &inputs,
            &out,
            ImageFormatKind::Png,
            ConversionConfig::default(),
            &BatchOptions::default(),
            &reporter,
            |count, record| seen.push((count, record.is_success())),
        )
        .unwrap();

        assert_eq!(seen, vec![(1, true), (2, true), (3, true)]);
    }

    #[test]
    fn test_total_duration_counts_successes_only() {
        let mut report = BatchReport::default();
        report.push(ConversionRecord {
            input: PathBuf::from("a"),
            output: Some(PathBuf::from("a.png")),
            duration: Duration::from_millis(100),
            error: None,
        });
        report.push(ConversionRecord {
            input: PathBuf::from("b"),
            output: None,
            duration: Duration::from_millis(900),
            error: Some("broken".into()),
        });

        assert_eq!(report.total_duration(), Duration::from_millis(100));
        assert_eq!(report.average_duration(), Duration::from_millis(100));
    }
}
