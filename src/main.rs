use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use palm_predictor::cache::{AssetCache, DirFetcher, ASSET_MANIFEST, CACHE_NAME};
use palm_predictor::detection::{HandDetector, LandmarkEngine};
use palm_predictor::pipeline::{PalmScanner, ScanOutcome};
use palm_predictor::ScanConfig;

#[derive(Parser)]
#[command(name = "palm-predictor")]
#[command(about = "Read a palm photo: detect the hand, overlay palm lines, tell a fortune")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a hand photo and print a palm reading
    Read {
        /// Path to the hand photo
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Directory holding hand-landmark.rten (defaults to the cache dir)
        #[arg(long, value_name = "DIR")]
        model_dir: Option<PathBuf>,

        /// Where to save the annotated photo
        #[arg(long, value_name = "FILE", default_value = "palm-reading.png")]
        out: PathBuf,

        /// Abort detection after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Manage the offline asset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Install the asset manifest from a local site directory
    Install {
        /// Directory containing the site files (index.html, app.js, ...)
        #[arg(long, value_name = "DIR")]
        site: PathBuf,

        #[arg(long, value_name = "FILE", default_value = "palm-predictor-cache.db")]
        db: PathBuf,
    },
    /// Show what is installed in the current cache version
    Status {
        #[arg(long, value_name = "FILE", default_value = "palm-predictor-cache.db")]
        db: PathBuf,
    },
    /// Remove the current cache version and its assets
    Clear {
        #[arg(long, value_name = "FILE", default_value = "palm-predictor-cache.db")]
        db: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Read {
            image_path,
            model_dir,
            out,
            timeout_secs,
        } => read_palm(image_path, model_dir, out, timeout_secs).await,
        Command::Cache { action } => match action {
            CacheAction::Install { site, db } => cache_install(site, db).await,
            CacheAction::Status { db } => cache_status(db).await,
            CacheAction::Clear { db } => cache_clear(db).await,
        },
    }
}

async fn read_palm(
    image_path: PathBuf,
    model_dir: Option<PathBuf>,
    out: PathBuf,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let config = ScanConfig {
        detect_timeout: Duration::from_secs(timeout_secs),
        model_dir: model_dir.clone(),
        ..ScanConfig::default()
    };
    let score_threshold = config.score_threshold;

    let scanner = PalmScanner::new(config);

    println!("Loading hand landmark model...");
    scanner
        .initialize(move || {
            let engine = LandmarkEngine::load(model_dir.as_deref())?
                .with_score_threshold(score_threshold);
            Ok(Arc::new(engine) as Arc<dyn HandDetector>)
        })
        .await?;

    println!("Scanning hand structure...");
    let outcome = scanner.scan_path(&image_path).await?;

    match outcome {
        ScanOutcome::Reading {
            canvas, prediction, ..
        } => {
            canvas
                .save(&out)
                .with_context(|| format!("Failed to save annotated photo to {:?}", out))?;
            println!("\nYour palm reading:\n  {}", prediction);
            println!("\nAnnotated photo saved to {:?}", out);
        }
        ScanOutcome::NoHand { advice } => {
            println!("\n{}", advice);
        }
    }

    Ok(())
}

async fn cache_install(site: PathBuf, db: PathBuf) -> anyhow::Result<()> {
    let mut cache = AssetCache::open(&db, CACHE_NAME).await?;
    let fetcher = DirFetcher::new(&site);
    cache.install(&ASSET_MANIFEST, &fetcher).await?;
    let purged = cache.activate().await?;

    println!("Installed {} assets into '{}'", ASSET_MANIFEST.len(), CACHE_NAME);
    for name in purged {
        println!("Purged stale cache '{}'", name);
    }
    Ok(())
}

async fn cache_status(db: PathBuf) -> anyhow::Result<()> {
    let cache = AssetCache::open(&db, CACHE_NAME).await?;
    let urls = cache.installed_urls().await?;

    if urls.is_empty() {
        println!("Cache '{}' is not installed.", CACHE_NAME);
    } else {
        println!("Cache '{}' ({:?}):", CACHE_NAME, cache.lifecycle());
        for url in urls {
            println!("  {}", url);
        }
    }
    Ok(())
}

async fn cache_clear(db: PathBuf) -> anyhow::Result<()> {
    let mut cache = AssetCache::open(&db, CACHE_NAME).await?;
    cache.clear().await?;
    println!("Cleared cache '{}'.", CACHE_NAME);
    Ok(())
}
