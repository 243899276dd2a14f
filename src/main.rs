use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use opensci_hotfix::{fixed_destination, FileOutcome, PatchEngine, PatchReport};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "opensci-hotfix")]
#[command(about = "Patch open-sci model files for transformers 5.x compatibility", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the model directory to patch
    #[arg(long)]
    src_dir: PathBuf,

    /// Show a unified diff of every patched file
    #[arg(short, long)]
    diff: bool,

    /// Emit the report as JSON instead of human-readable lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.json {
        println!(
            "Copying '{}' -> '{}' ...",
            cli.src_dir.display(),
            fixed_destination(&cli.src_dir).display()
        );
    }

    let report = PatchEngine::new().run(&cli.src_dir)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for file in &report.files {
        match file.outcome {
            FileOutcome::Patched => {
                println!("  {}", format!("Patched: {}", file.name).green());
            }
            FileOutcome::Skipped => {
                println!(
                    "  {}",
                    format!("Skipped (nothing to fix): {}", file.name).dimmed()
                );
            }
        }
    }

    if cli.diff {
        show_diffs(&cli.src_dir, &report)?;
    }

    println!(
        "Done. {} file(s) patched. Fixed model at '{}'.",
        report.patched_count(),
        report.fixed_dir.display()
    );

    Ok(())
}

/// The source directory is never mutated, so the pre-patch text is still
/// there to diff against.
fn show_diffs(src_dir: &Path, report: &PatchReport) -> Result<()> {
    for file in report
        .files
        .iter()
        .filter(|f| f.outcome == FileOutcome::Patched)
    {
        let original = fs::read_to_string(src_dir.join(&file.name))?;
        let patched = fs::read_to_string(report.fixed_dir.join(&file.name))?;
        display_diff(&file.name, &original, &patched);
    }
    Ok(())
}

/// Helper: show unified diff between original and patched content
fn display_diff(name: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", name).dimmed());
    println!("{}", format!("+++ {} (patched)", name).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
