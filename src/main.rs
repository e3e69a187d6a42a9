use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use prettytable::{row, Table};
use std::path::PathBuf;
use std::time::Instant;
use strum::IntoEnumIterator;

mod cli;
mod conversion;
mod error;
mod json_output;
mod report;
mod utils;

use cli::{validate_inputs, Args, TargetFormat};
use conversion::batch::{plan_output_path, run_batch_with_progress, BatchOptions, BatchReport};
use conversion::format::ImageFormatKind;
use conversion::info::inspect;
use conversion::validate::validate_conversion;
use conversion::ConversionConfig;
use json_output::JsonMessage;
use report::{ConsoleReporter, NullReporter, Reporter};
use utils::{
    collect_format_stats, create_progress_bar, find_image_files, format_duration,
    format_file_size, parse_hex_color,
};

impl From<TargetFormat> for ImageFormatKind {
    fn from(format: TargetFormat) -> Self {
        match format {
            TargetFormat::Png => ImageFormatKind::Png,
            TargetFormat::Jpg => ImageFormatKind::Jpg,
            TargetFormat::Jpeg => ImageFormatKind::Jpeg,
            TargetFormat::Bmp => ImageFormatKind::Bmp,
            TargetFormat::Gif => ImageFormatKind::Gif,
            TargetFormat::Tiff => ImageFormatKind::Tiff,
            TargetFormat::Tif => ImageFormatKind::Tif,
            TargetFormat::Wbmp => ImageFormatKind::Wbmp,
        }
    }
}

/// Print the capability table for every known format.
fn handle_list_formats() {
    let mut table = Table::new();
    table.add_row(row![
        b => "Format", "MIME type", "Transparency", "Quality knob", "Type", "Description"
    ]);
    for kind in ImageFormatKind::iter() {
        table.add_row(row![
            kind.extension().to_uppercase(),
            kind.mime_type(),
            if kind.supports_transparency() { "yes" } else { "no" },
            if kind.supports_quality() { "yes" } else { "no" },
            if kind.is_lossy() { "lossy" } else { "lossless" },
            kind.description(),
        ]);
    }
    table.printstd();
}

/// Print detailed introspection for every discovered input.
fn handle_info(files: &[PathBuf]) {
    println!("{}", style("Image information:").bold());
    println!();
    for file in files {
        match inspect(file) {
            Ok(info) => {
                println!("{}", style(format!("• {}", info.file_name)).cyan());
                for line in info.to_string().lines() {
                    println!("   {}", line);
                }
            }
            Err(e) => {
                println!(
                    "{} {}: {}",
                    style("[WARNING]").yellow().bold(),
                    file.display(),
                    e
                );
            }
        }
        println!();
    }
}

fn print_format_stats(files: &[PathBuf]) {
    let stats = collect_format_stats(files);
    let total_size: u64 = stats.iter().map(|s| s.total_size).sum();

    let mut table = Table::new();
    table.add_row(row![b => "Format", "Files", "Share", "Total size"]);
    for entry in &stats {
        let share = entry.count as f64 * 100.0 / files.len() as f64;
        table.add_row(row![
            entry.extension.to_uppercase(),
            entry.count,
            format!("{:.1}%", share),
            format_file_size(entry.total_size),
        ]);
    }
    table.printstd();
    println!(
        "Total: {} in {} files",
        format_file_size(total_size),
        files.len()
    );
    println!();
}

/// Dry run: plan every output path and run pre-flight validation, writing
/// nothing.
fn handle_dry_run(
    files: &[PathBuf],
    output_dir: &PathBuf,
    target: ImageFormatKind,
    options: &BatchOptions,
) {
    println!(
        "{}",
        style("Dry run: no files will be written").bold().yellow()
    );
    println!();

    for file in files {
        let planned = plan_output_path(file, output_dir, target, options);
        let validation = validate_conversion(file, target.extension());

        if validation.has_errors() {
            println!(
                "{} {} -> {}",
                style("✗").red().bold(),
                file.display(),
                validation.errors().join("; ")
            );
            continue;
        }

        println!(
            "{} {} -> {}",
            style("✓").green(),
            file.display(),
            planned.display()
        );
        for warning in validation.warnings() {
            println!("    {} {}", style("warning:").yellow(), warning);
        }
    }
}

fn print_summary(report: &BatchReport, elapsed: std::time::Duration) {
    println!();
    println!("{}", style("Batch conversion result:").bold());
    println!("  Total: {} files", report.total_count());
    println!(
        "  Succeeded: {} ({:.1}%)",
        style(report.success_count()).green(),
        report.success_rate()
    );
    println!("  Failed: {}", style(report.failure_count()).red());
    println!(
        "  Conversion time: {} (wall clock {})",
        format_duration(report.total_duration()),
        format_duration(elapsed)
    );
    if report.success_count() > 0 {
        println!(
            "  Average: {} per image",
            format_duration(report.average_duration())
        );
    }

    for record in report.records().iter().filter(|r| !r.is_success()) {
        println!(
            "    {} {}: {}",
            style("✗").red(),
            record.input.display(),
            record.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let args = Args::parse();

    if args.list_formats {
        handle_list_formats();
        return Ok(());
    }

    if !args.json_progress {
        println!("{}", style("ImgForge - Batch Image Converter").bold().blue());
        println!();
    }

    validate_inputs(&args)?;

    let filter = args.filter_formats();
    let files = find_image_files(&args.input_paths, args.recursive, filter.as_deref())
        .context("Failed to scan input paths")?;

    if files.is_empty() {
        println!(
            "{} No image files found in the given inputs{}",
            style("✗").red().bold(),
            if filter.is_some() {
                " (with the requested format filter)"
            } else {
                ""
            }
        );
        return Ok(());
    }

    if args.info {
        handle_info(&files);
        return Ok(());
    }

    if args.stats && !args.json_progress {
        print_format_stats(&files);
    }

    let target: ImageFormatKind = args
        .format
        .context("a target format is required; pass -f/--format")?
        .into();

    let mut config = ConversionConfig::default();
    config.set_quality(args.quality);
    config.set_png_compression(args.png_compression);
    config.set_preserve_quality(args.preserve_quality);
    config.set_background(
        parse_hex_color(&args.background).context("invalid background color")?,
    );
    config.set_optimize_for_size(args.optimize_size);
    config.set_preserve_metadata(args.preserve_metadata);

    // Structure preservation mirrors paths relative to the first input
    // directory; lone-file inputs always land flat in the output root.
    let input_root = args.input_paths.iter().find(|p| p.is_dir()).cloned();
    let options = BatchOptions {
        preserve_structure: args.preserve_structure,
        input_root,
        overwrite: args.overwrite,
    };

    if args.dry_run {
        handle_dry_run(&files, &args.output_dir, target, &options);
        return Ok(());
    }

    if !args.json_progress {
        println!(
            "Converting {} files to {} into {}",
            style(files.len()).bold(),
            style(target.extension().to_uppercase()).bold(),
            args.output_dir.display()
        );
        println!();
    }

    let console_reporter;
    let null_reporter;
    let reporter: &dyn Reporter = if args.json_progress {
        null_reporter = NullReporter;
        &null_reporter
    } else {
        console_reporter = ConsoleReporter::new(args.verbose);
        &console_reporter
    };

    let progress_bar = if args.json_progress {
        None
    } else {
        Some(create_progress_bar(files.len() as u64))
    };

    let total = files.len();
    let json_progress = args.json_progress;
    let report = run_batch_with_progress(
        &files,
        &args.output_dir,
        target,
        config,
        &options,
        reporter,
        |count, record| {
            if let Some(pb) = &progress_bar {
                pb.inc(1);
                if let Some(name) = record.input.file_name().and_then(|n| n.to_str()) {
                    pb.set_message(name.to_string());
                }
            }
            if json_progress {
                JsonMessage::progress(count, total, record.input.display().to_string());
                match (&record.output, &record.error) {
                    (Some(output), None) => JsonMessage::file_completed(
                        &record.input,
                        output,
                        record.duration.as_millis(),
                    ),
                    (_, Some(error)) => JsonMessage::file_failed(&record.input, error.clone()),
                    _ => {}
                }
            }
        },
    )?;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    let elapsed = start_time.elapsed();
    if args.json_progress {
        JsonMessage::summary(
            report.total_count(),
            report.success_count(),
            report.failure_count(),
            report.success_rate(),
            elapsed.as_secs_f64(),
        );
    } else {
        print_summary(&report, elapsed);
    }

    if report.total_count() > 0 && report.success_count() == 0 {
        anyhow::bail!("all {} conversions failed", report.total_count());
    }

    Ok(())
}
