//! Elliptic CLI - prepare the Elliptic dataset and preview it

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use elliptic_forensics::{ArtifactPaths, DatasetConfig, EllipticStore, StoreState};

#[derive(Parser)]
#[command(name = "elliptic")]
#[command(author, version, about = "Prepare the Elliptic transaction dataset", long_about = None)]
struct Cli {
    /// Dataset root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Ignore cached artifacts and rebuild from the raw files
    #[arg(short, long)]
    force_rebuild: bool,

    /// Processed features destination (only used together with --labels-out)
    #[arg(long)]
    features_out: Option<PathBuf>,

    /// Processed labels destination (only used together with --features-out)
    #[arg(long)]
    labels_out: Option<PathBuf>,

    /// Number of rows to preview
    #[arg(long, default_value = "5")]
    rows: usize,

    /// Print the dataset summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = match cli.root {
        Some(root) => DatasetConfig::with_root(root),
        None => DatasetConfig::default(),
    };
    if cli.features_out.is_some() != cli.labels_out.is_some() {
        tracing::warn!("Both --features-out and --labels-out are required; using defaults");
    }
    config.store = ArtifactPaths::from_overrides(cli.features_out, cli.labels_out);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Preparing Elliptic dataset...");

    let store = EllipticStore::new(config.clone(), cli.force_rebuild)
        .with_context(|| format!("Failed to prepare dataset under {:?}", config.root))?;

    pb.finish_and_clear();

    let data = store.get_data();
    let summary = data.summary();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let source = match store.state() {
        StoreState::LoadedFromCache => "loaded from cache".green(),
        StoreState::Rebuilt => "rebuilt".yellow(),
    };
    println!(
        "{} {} ({:?})",
        "Dataset".cyan().bold(),
        source,
        store.features_path()
    );
    println!();

    println!("{}", "Head of features".yellow().bold());
    println!("{}", data.features().head(Some(cli.rows)));
    println!();

    println!("{}", "Head of labels".yellow().bold());
    println!(
        "{}",
        data.labels_frame(&config.columns.label)?.head(Some(cli.rows))
    );
    println!();

    println!(
        "{}: {} rows, {} feature columns, {} licit, {} illicit",
        "Summary".green(),
        summary.rows,
        summary.feature_columns,
        summary.licit,
        summary.illicit
    );

    Ok(())
}
