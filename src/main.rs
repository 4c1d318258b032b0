use clap::{Parser, Subcommand};
use photo_shrink::imaging::RustBackend;
use photo_shrink::{config, output, process};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "photo-shrink")]
#[command(about = "Batch photo-library compressor")]
#[command(long_about = "\
Batch photo-library compressor

Walks a photo library, re-encodes every image over the size budget at
decreasing JPEG quality, and routes results by GPS metadata:

  processed-photos/
  ├── report.csv                # One row per attempted image
  ├── trip/IMG_0042.jpg         # Geotagged photos keep the library layout
  ├── missing-locations/        # Photos without GPS tags
  │   └── scans/old-print.jpg
  └── problem-photos/           # Partial encodes of images that hit the
      └── huge/pano.jpg         #   per-image time budget (originals stay
                                #   in the library folders above)

Per image: skip re-encoding when the file is already under budget; otherwise
step quality down from 95 until the budget or the quality floor is reached,
carrying EXIF metadata across. A per-image wall-clock timeout keeps one
pathological file from stalling the batch.

Run 'photo-shrink gen-config' to generate a documented settings file.")]
#[command(version = version_string())]
struct Cli {
    /// Photo library to read (never modified)
    #[arg(long, default_value = "photos", global = true)]
    input: PathBuf,

    /// Output directory for the processed library
    #[arg(long, default_value = "processed-photos", global = true)]
    output: PathBuf,

    /// TOML settings file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Flag overrides for the settings surface.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Per-image size budget in MB
    #[arg(long)]
    target_size_mb: Option<f64>,

    /// JPEG quality floor (1-100)
    #[arg(long)]
    min_quality: Option<u8>,

    /// Quality decrease per attempt
    #[arg(long)]
    quality_step: Option<u8>,

    /// Quality of the first attempt (1-100)
    #[arg(long)]
    start_quality: Option<u8>,

    /// Per-image compression budget in seconds
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Process images one at a time instead of across a worker pool
    #[arg(long)]
    sequential: bool,

    /// Worker pool size (default: all cores, capped at core count)
    #[arg(long)]
    workers: Option<usize>,

    /// Only process the first N images of the sorted scan (test runs)
    #[arg(long)]
    sample: Option<usize>,

    /// Delete the output directory before running
    #[arg(long)]
    clean: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress and route the whole library
    Run(RunArgs),
    /// Inventory the library (GPS coverage, sizes) without writing anything
    Check {
        /// Only inspect the first N images of the sorted scan
        #[arg(long)]
        sample: Option<usize>,
    },
    /// Print a stock settings file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let mut settings = config::Settings::load(cli.config.as_deref())?;
            apply_overrides(&mut settings, &args);

            if args.clean && cli.output.exists() {
                std::fs::remove_dir_all(&cli.output)?;
            }

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{line}");
                    }
                }
            });
            let summary = process::run(&settings, &cli.input, &cli.output, Some(tx))?;
            printer.join().unwrap();

            println!();
            output::print_run_summary(&summary);
        }
        Command::Check { sample } => {
            let mut settings = config::Settings::load(cli.config.as_deref())?;
            if sample.is_some() {
                settings.sample = sample;
            }
            let inventory = process::inspect(&RustBackend::new(), &settings, &cli.input)?;
            output::print_check_output(&inventory);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn apply_overrides(settings: &mut config::Settings, args: &RunArgs) {
    if let Some(v) = args.target_size_mb {
        settings.target_size_mb = v;
    }
    if let Some(v) = args.min_quality {
        settings.min_quality = v;
    }
    if let Some(v) = args.quality_step {
        settings.quality_step = v;
    }
    if let Some(v) = args.start_quality {
        settings.start_quality = v;
    }
    if let Some(v) = args.timeout_secs {
        settings.timeout_secs = v;
    }
    if args.sequential {
        settings.parallel = false;
    }
    if args.workers.is_some() {
        settings.max_workers = args.workers;
    }
    if args.sample.is_some() {
        settings.sample = args.sample;
    }
}
