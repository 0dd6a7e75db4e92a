//! Patterns command - inspect the extraction pattern catalog.

use clap::Args;
use console::style;

use drex_core::PatternCatalog;

/// Arguments for the patterns command.
#[derive(Args)]
pub struct PatternsArgs {
    /// Show the regexes for one kind instead of the kind summary
    #[arg(long)]
    kind: Option<String>,
}

pub async fn run(args: PatternsArgs) -> anyhow::Result<()> {
    match args.kind {
        Some(kind) => show_kind(&kind),
        None => list_kinds(),
    }
}

fn list_kinds() -> anyhow::Result<()> {
    println!("{}", style("Supported parameter kinds:").bold());
    for kind in PatternCatalog::kinds() {
        println!(
            "  {:<16} {} patterns",
            kind.name,
            kind.patterns.len()
        );
    }
    println!(
        "  {:<16} 1 compound pattern (yields dimensions_length + dimensions_width)",
        PatternCatalog::DIMENSIONS_KIND
    );
    Ok(())
}

fn show_kind(kind: &str) -> anyhow::Result<()> {
    if kind == PatternCatalog::DIMENSIONS_KIND {
        println!("{}", style(kind).bold());
        println!("  {}", PatternCatalog::dimensions().as_str());
        return Ok(());
    }

    let Some(patterns) = PatternCatalog::patterns_for(kind) else {
        anyhow::bail!(
            "Unknown parameter kind: {}. Run `drex patterns` for the full list.",
            kind
        );
    };

    println!("{}", style(kind).bold());
    for pattern in patterns {
        println!("  {}", pattern.as_str());
    }
    Ok(())
}
