use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thumbnail_loader::{
    Displayed, ImageLoader, LoadOutcome, LoaderConfig, MemoryTarget, Placeholder, TargetSize,
    decode::{probe_dimensions, subsample_factor},
    locator::Locator,
    resolver::{EmbeddedBundle, FsContentResolver, HttpFetcher, ResourceResolver},
    utils::human_format::{format_bytes, format_kib},
};

#[derive(Parser)]
#[command(name = "thumbnail-loader")]
#[command(version)]
#[command(about = "Load, downsample and cache images the way a scrolling list would")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "thumbnail-loader.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Worker pool size (overrides config file)
    #[arg(short = 'w', long, value_name = "N")]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load each locator into its own headless target and report the result
    Fetch {
        /// Image locators (content://, file://, resource://, http(s):// or a path)
        #[arg(required = true)]
        locators: Vec<String>,

        /// Target width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// How long to wait for all results
        #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },
    /// Print native dimensions and the subsample factor for a target size
    Probe {
        locator: String,

        #[arg(long, default_value_t = 100)]
        width: u32,

        #[arg(long, default_value_t = 100)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("thumbnail_loader={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = LoaderConfig::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    if let Some(workers) = cli.workers {
        config.workers.pool_size = workers;
    }

    match cli.command {
        Command::Fetch {
            locators,
            width,
            height,
            timeout,
        } => fetch(config, &locators, width, height, timeout),
        Command::Probe {
            locator,
            width,
            height,
        } => probe(config, &locator, width, height),
    }
}

fn fetch(
    config: LoaderConfig,
    locators: &[String],
    width: Option<u32>,
    height: Option<u32>,
    timeout: Duration,
) -> Result<()> {
    info!("Starting thumbnail loader v{}", env!("CARGO_PKG_VERSION"));
    let (loader, delivery) = ImageLoader::start(config)?;

    let targets: Vec<(String, Arc<MemoryTarget>)> = locators
        .iter()
        .map(|locator| (locator.clone(), MemoryTarget::new()))
        .collect();

    let mut waiting = 0u64;
    for (locator, target) in &targets {
        let outcome = loader.load_into(target, Some(locator), &Placeholder::Blank, width, height);
        if outcome == LoadOutcome::Scheduled {
            waiting += 1;
        }
    }

    // Pump completions until every scheduled load either delivered or failed
    let deadline = Instant::now() + timeout;
    while loader.stats().outstanding() > 0 || delivery.run_pending() > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!("Timed out with {} loads outstanding", loader.stats().outstanding());
            break;
        }
        delivery.run_next(remaining.min(Duration::from_millis(50)));
    }
    delivery.run_pending();

    let mut failed = 0usize;
    for (locator, target) in &targets {
        match target.current() {
            Displayed::Image { image, .. } => println!(
                "{locator}: {}x{} (factor {}, {})",
                image.width(),
                image.height(),
                image.sample_factor(),
                format_bytes(image.byte_size())
            ),
            _ => {
                failed += 1;
                println!("{locator}: placeholder");
            }
        }
    }

    let stats = loader.stats();
    let cache = loader.cache_stats();
    info!(
        "Scheduled {} ({} waited on), applied {}, failed {}, cache {} / {} in {} entries",
        stats.scheduled,
        waiting,
        stats.applied,
        stats.failed,
        format_kib(cache.weight_kib),
        format_kib(cache.capacity_kib),
        cache.entries
    );

    if failed > 0 {
        bail!("{failed} of {} images could not be loaded", targets.len());
    }
    Ok(())
}

fn probe(config: LoaderConfig, raw: &str, width: u32, height: u32) -> Result<()> {
    let locator = Locator::parse(Some(raw)).context("Locator is empty")?;
    let resolver = ResourceResolver::new(
        Arc::new(FsContentResolver::new(config.content.roots.clone())),
        Arc::new(EmbeddedBundle::new()),
        HttpFetcher::new(&config.network)?,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let bytes = runtime
        .block_on(resolver.resolve(&locator))?
        .with_context(|| format!("Unsupported locator scheme: {raw}"))?;

    let (native_width, native_height) = probe_dimensions(&bytes, locator.as_str())?;
    let target = TargetSize::new(width, height);
    let factor = subsample_factor(native_width, native_height, target);

    println!(
        "{locator}: native {native_width}x{native_height}, target {}x{}, factor {factor} -> {}x{}",
        target.width,
        target.height,
        native_width / factor,
        native_height / factor
    );
    Ok(())
}
