//! Batch processing command for multiple drawing files.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use drex_core::{ExtractionOutcome, PdfDocument, ReportBuilder};

use super::process::{self, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Skip OCR and use only native text extraction
    #[arg(long)]
    text_only: bool,

    /// OCR language passed to tesseract
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    outcome: Option<ExtractionOutcome>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = process::load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching drawings found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} drawings to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} drawings")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let file_start = Instant::now();
        let result = process_single_file(&path, &config, &args);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                results.push(FileResult {
                    path: path.clone(),
                    outcome: Some(outcome),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let message = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), message);
                    results.push(FileResult {
                        path: path.clone(),
                        outcome: None,
                        error: Some(message),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), message);
                    anyhow::bail!("Processing failed: {}", message);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let builder = ReportBuilder::new(&config.report);
    let successful: Vec<_> = results.iter().filter(|r| r.outcome.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    for result in &successful {
        let (Some(outcome), Some(output_dir)) = (&result.outcome, &args.output_dir) else {
            continue;
        };
        let output_name = result
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("drawing");

        let extension = match args.format {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        };
        let output_path = output_dir.join(format!("{}.{}", output_name, extension));

        let content = match args.format {
            OutputFormat::Json => {
                let record = builder.record(result.path.display().to_string(), outcome);
                serde_json::to_string_pretty(&record)?
            }
            OutputFormat::Csv => process::format_csv(outcome)?,
            OutputFormat::Text => builder.plain_text(outcome),
        };

        fs::write(&output_path, content)?;
        debug!("Wrote output to {}", output_path.display());
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} drawings in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed drawings:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &PathBuf,
    config: &drex_core::DrexConfig,
    args: &BatchArgs,
) -> anyhow::Result<ExtractionOutcome> {
    let document = PdfDocument::open(path)?;
    Ok(process::extract(
        &document,
        config,
        &args.lang,
        args.text_only,
    ))
}

fn write_summary(path: &PathBuf, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "parameters",
        "text_candidates",
        "ocr_candidates",
        "dropped",
        "page_failures",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(outcome) = &result.outcome {
            wtr.write_record([
                filename,
                "success",
                &outcome.merged.len().to_string(),
                &outcome.stats.text_candidates.to_string(),
                &outcome.stats.ocr_candidates.to_string(),
                &outcome.stats.dropped_candidates().to_string(),
                &outcome.stats.page_failures.len().to_string(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
