/// Curtain - scene player presentation tools
use clap::{Parser, Subcommand};
use curtain_cli::{check, prefetch, summarize, CliSettings};
use curtain_core::{PresentationConfig, ScenePlan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "curtain")]
#[command(about = "Check, plan and prefetch Curtain presentations", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./curtain.toml when present)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every scene media reference is in the manifest
    Check {
        /// Presentation file (.json or .toml)
        presentation: PathBuf,
    },
    /// Show what each scene prefetches and displays
    Plan {
        /// Presentation file (.json or .toml)
        presentation: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Download every scene's assets in order, like the player's background sequence
    Prefetch {
        /// Presentation file (.json or .toml)
        presentation: PathBuf,
        /// Asset server base URL
        #[arg(short, long)]
        base_url: Option<String>,
        /// Per-request timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = CliSettings::load(cli.settings.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Check { presentation } => run_check(&presentation),
        Commands::Plan { presentation, json } => run_plan(&presentation, json),
        Commands::Prefetch {
            presentation,
            base_url,
            timeout,
        } => {
            if let Some(base_url) = base_url {
                settings.base_url = base_url;
            }
            if timeout.is_some() {
                settings.request_timeout_secs = timeout;
            }
            settings.validate()?;
            run_prefetch(&presentation, &settings).await
        }
    }
}

fn load_plan(path: &Path) -> anyhow::Result<ScenePlan> {
    let config = PresentationConfig::load(path)?;
    tracing::debug!(path = %path.display(), scenes = config.scene_count(), "Presentation loaded");
    Ok(ScenePlan::new(Arc::new(config)))
}

fn run_check(path: &Path) -> anyhow::Result<ExitCode> {
    let report = check(&load_plan(path)?);

    println!("{} scenes, {} asset groups", report.scenes, report.groups);
    if report.is_clean() {
        println!("All scene media references resolve");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Unresolved references:");
    for reference in &report.unresolved {
        println!("  scene {}: {}", reference.scene, reference.name);
    }
    Ok(ExitCode::FAILURE)
}

fn run_plan(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let summary = summarize(&load_plan(path)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(ExitCode::SUCCESS);
    }

    for scene in &summary {
        println!("Scene {} ({:?})", scene.scene, scene.kind);
        if let Some(video) = &scene.video {
            println!("  video: {}", video);
        }
        if let Some(background) = &scene.background {
            println!("  background: {}", background);
        }
        for resource in &scene.resources {
            println!("  prefetch: {}", resource);
        }
        for option in &scene.icons {
            match &option.icon {
                Some(icon) => println!("  option {:?}: {} ({:?})", option.option, icon.path, icon.source),
                None => println!("  option {:?}: no icon", option.option),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_prefetch(path: &Path, settings: &CliSettings) -> anyhow::Result<ExitCode> {
    let outcome = prefetch(load_plan(path)?, settings).await?;
    let report = &outcome.report;

    println!(
        "Prefetched scenes {:?}: {} assets, {} bytes",
        report.completed, outcome.cached_assets, outcome.cached_bytes
    );
    match report.aborted_at {
        None => Ok(ExitCode::SUCCESS),
        Some(scene) => {
            println!(
                "Sequence abandoned at scene {}: {}",
                scene,
                report.failure.as_deref().unwrap_or("unknown error")
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
