use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pubsync_core::pipeline::{run_apply, run_fetch};
use pubsync_core::PipelineConfig;

#[derive(Parser)]
#[command(name = "pubsync", about = "Reconcile the publication corpus with PubMed", version)]
struct Cli {
    /// Path to the pipeline configuration file.
    #[arg(long, default_value = "pubsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search PubMed for each team member and write the review file.
    Fetch,
    /// Merge approved review entries into the corpus and regenerate it.
    Apply,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Fetch => {
            let summary = run_fetch(&config).await.context("fetch phase failed")?;
            println!(
                "found {} candidate(s): {} new, {} enhancement(s)",
                summary.found, summary.new, summary.enhance
            );
            for error in &summary.errors {
                println!("  search error: {error}");
            }
            println!("review file written to {}", summary.review_path.display());
        }
        Command::Apply => {
            let summary = run_apply(&config).context("apply phase failed")?;
            println!(
                "applied {} approved candidate(s): {} enhanced, {} added",
                summary.approved, summary.enhanced, summary.added
            );
            if summary.rejected > 0 {
                println!("  {} rejected (ignored)", summary.rejected);
            }
            if summary.pending > 0 {
                println!("  {} still pending, left out of this run", summary.pending);
            }
            if summary.skipped_missing_target > 0 {
                println!(
                    "  {} enhancement(s) skipped: target record no longer exists",
                    summary.skipped_missing_target
                );
            }
            println!("corpus rewritten at {}", summary.corpus_path.display());
            println!("backup saved to {}", summary.backup_path.display());
        }
    }

    Ok(())
}
