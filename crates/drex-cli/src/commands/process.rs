//! Process command - extract parameters from a single drawing file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use drex_core::{
    DocumentKind, DrawingDocument, DrexConfig, ExtractionOutcome, ParameterMerger, PdfDocument,
    ReportBuilder,
};

use crate::ocr::TesseractOcr;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input drawing (PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip OCR and use only native text extraction
    #[arg(long)]
    text_only: bool,

    /// OCR language passed to tesseract
    #[arg(long, default_value = "eng")]
    lang: String,

    /// Dump the document's raw extracted text and exit
    #[arg(long)]
    dump_text: bool,

    /// Show drop statistics after extraction
    #[arg(long)]
    show_stats: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON export record
    Json,
    /// One CSV row per merged parameter
    Csv,
    /// Grouped plain-text report
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    info!("Processing drawing: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    pb.set_message("Opening drawing...");
    pb.set_position(10);
    let document = PdfDocument::open(&args.input)?;
    debug!("drawing has {} pages", document.page_count());

    if args.dump_text {
        pb.finish_and_clear();
        println!("{}", document.full_text()?);
        return Ok(());
    }

    pb.set_message("Classifying drawing...");
    pb.set_position(20);
    match document.kind() {
        DocumentKind::Scanned if args.text_only => {
            warn!("drawing appears to be scanned; --text-only will find little");
        }
        DocumentKind::Empty => {
            warn!("drawing has neither extractable text nor raster content");
        }
        _ => {}
    }

    pb.set_message("Extracting parameters...");
    pb.set_position(40);
    let outcome = extract(&document, &config, &args.lang, args.text_only);

    pb.set_message("Formatting report...");
    pb.set_position(90);
    let builder = ReportBuilder::new(&config.report);
    let rendered = match args.format {
        OutputFormat::Json => {
            let record = builder.record(args.input.display().to_string(), &outcome);
            serde_json::to_string_pretty(&record)?
        }
        OutputFormat::Csv => format_csv(&outcome)?,
        OutputFormat::Text => builder.plain_text(&outcome),
    };
    pb.finish_with_message("Done");

    if let Some(output_path) = &args.output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", rendered);
    }

    if args.show_stats {
        print_stats(&outcome);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn load_config(config_path: Option<&str>) -> anyhow::Result<DrexConfig> {
    Ok(match config_path {
        Some(path) => DrexConfig::from_file(std::path::Path::new(path))?,
        None => DrexConfig::default(),
    })
}

pub fn extract<D: DrawingDocument>(
    document: &D,
    config: &DrexConfig,
    lang: &str,
    text_only: bool,
) -> ExtractionOutcome {
    let merger = ParameterMerger::new(config.clone());
    if text_only {
        merger.extract_text_only(document)
    } else {
        let engine = TesseractOcr::new().with_language(lang);
        merger.extract(document, &engine)
    }
}

pub fn format_csv(outcome: &ExtractionOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["key", "name", "value", "unit", "page", "confidence"])?;
    for (key, p) in outcome.merged.iter() {
        wtr.write_record([
            key.to_string(),
            p.name.clone(),
            p.value.to_string(),
            p.unit.clone().unwrap_or_default(),
            p.page_number.to_string(),
            format!("{:.2}", p.confidence),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn print_stats(outcome: &ExtractionOutcome) {
    let stats = &outcome.stats;
    println!();
    println!(
        "{} {} merged parameters ({} text, {} OCR candidates)",
        style("ℹ").blue(),
        outcome.merged.len(),
        stats.text_candidates,
        stats.ocr_candidates
    );
    println!(
        "{} {} dropped: {} superseded by text, {} near-duplicates, {} duplicate keys, {} shadowed",
        style("ℹ").blue(),
        stats.dropped_candidates(),
        stats.superseded_ocr,
        stats.near_duplicates,
        stats.duplicate_keys,
        stats.shadowed_text
    );
    if stats.match_failures > 0 {
        println!(
            "{} {} candidates could not be parsed",
            style("⚠").yellow(),
            stats.match_failures
        );
    }
    for failure in &stats.page_failures {
        println!(
            "{} page {} ({:?} channel): {}",
            style("⚠").yellow(),
            failure.page,
            failure.channel,
            failure.reason
        );
    }
    println!(
        "{} Processing time: {}ms",
        style("ℹ").blue(),
        outcome.processing_time_ms
    );
}
