use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::log::LevelFilter;
use console::style;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use dsp_init::{get_frame_limits, get_interval, get_split_ratio, get_working_dir};
use dsp_init::{initialize_configuration, initialize_logger, load_default_configuration, Config};
use dsp_modes::Modes;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(clap::Args, Debug)]
pub struct Verbosity {
    #[arg(short = 'v', long, action = clap::ArgAction::Count, display_order = 99)]
    pub verbose: u8,

    #[arg(short = 'q', long, action = clap::ArgAction::Count, display_order = 100)]
    pub quiet: u8,
}
impl Verbosity {
    pub fn log_level_filter(&self) -> LevelFilter {
        if self.quiet > 0 {
            LevelFilter::Warn
        } else {
            match self.verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

#[derive(Args, Debug)]
struct SamplerOptions {
    /// Directory scanned for videos, or a single video file
    #[arg(short = 'i', long, help = "Video directory or single video (default: current directory)")]
    input: Option<String>,
    /// Directory receiving one frame folder per video
    #[arg(short = 'o', long, help = "Directory for the frame folders (default: next to the videos) \n")]
    output: Option<String>,

    /// Seconds between retained frames
    #[arg(short = 't', long, help = "Seconds between retained frames", value_parser = clap::value_parser!(f64))]
    interval: Option<f64>,
    /// Frames below which a video is reported as insufficient
    #[arg(short = 'n', long = "min-frames", help = "Minimum frames per video", value_parser = clap::value_parser!(u32))]
    min_frames: Option<u32>,
    /// Hard cap on frames per video
    #[arg(short = 'm', long = "max-frames", help = "Maximum frames per video", value_parser = clap::value_parser!(u32))]
    max_frames: Option<u32>,
    /// Video suffix matched case-sensitively, without the dot
    #[arg(short = 'e', long, help = "Video extension to pick up")]
    extension: Option<String>,
    /// Image format of the extracted frames
    #[arg(short = 'f', long, help = "Frame image format \n")]
    format: Option<String>,
}

#[derive(Args, Debug)]
struct MergerOptions {
    /// Labeled trees to merge
    #[arg(
        short = 'i',
        long = "input",
        help = "Source trees to merge",
        num_args = 1..,
        default_values = ["train", "val"]
    )]
    inputs: Vec<String>,
    /// Destination tree
    #[arg(short = 'o', long, help = "Destination tree \n", default_value = "train_val")]
    output: String,
}

#[derive(Args, Debug)]
struct SplitterOptions {
    /// Labeled tree whose class directories get split
    #[arg(short = 'i', long, help = "Dataset root (default: current directory)")]
    input: Option<String>,
    /// Share of every class copied to the first destination
    #[arg(short = 'r', long, help = "Split ratio, strictly between 0 and 1", value_parser = clap::value_parser!(f64))]
    ratio: Option<f64>,
    /// Seed for a reproducible shuffle
    #[arg(short = 's', long, help = "Shuffle seed", value_parser = clap::value_parser!(u64))]
    seed: Option<u64>,
    #[arg(long, help = "First destination name", default_value = "train_val")]
    first: String,
    #[arg(long, help = "Second destination name", default_value = "test")]
    second: String,
    /// Image suffix matched case-insensitively
    #[arg(short = 'e', long, help = "Image extension to collect \n")]
    extension: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Dataset preparation: video frame sampling, tree merging and ratio splitting",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Initialize configuration
    Init,
    /// Sampler: Extract frames at a fixed interval from every video
    Sampler(SamplerOptions),
    /// Merger: Merge labeled trees with collision-free file names
    Merger(MergerOptions),
    /// Splitter: Split every class of a labeled tree by ratio
    Splitter(SplitterOptions),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity_level = cli.verbose.log_level_filter();
    initialize_logger(verbosity_level).context("Failed to initialize logger")?;
    debug!(
        "{} {:?}",
        style("Logger initialized with verbosity:").cyan(),
        verbosity_level
    );

    let config = load_default_configuration().context("Failed to load default configuration")?;
    debug!("{}", style("Default configuration loaded").green());

    match &cli.mode {
        Mode::Init => {
            debug!("{}", style("Initializing configuration...").yellow());
            initialize_configuration().context("Failed to initialize configuration")?;
            return Ok(());
        }
        Mode::Sampler(options) => {
            debug!("{}", style(format!("Running in {} mode", Modes::Sampler)).blue());
            run_sampler(options, &config)?;
        }
        Mode::Merger(options) => {
            debug!("{}", style(format!("Running in {} mode", Modes::Merger)).blue());
            run_merger(options, &config)?;
        }
        Mode::Splitter(options) => {
            debug!("{}", style(format!("Running in {} mode", Modes::Splitter)).blue());
            run_splitter(options, &config)?;
        }
    }

    debug!(
        "{}",
        style("Main function execution completed successfully").green()
    );
    Ok(())
}

fn run_sampler(options: &SamplerOptions, config: &Config) -> Result<()> {
    let input = get_working_dir(options.input.clone()).context("Failed to resolve input")?;

    let interval = get_interval(options.interval, config).context("Failed to resolve interval")?;
    let limits = get_frame_limits(options.min_frames, options.max_frames, config)
        .context("Failed to resolve frame limits")?;
    let sampling_config =
        dsp_sampler::SamplingConfig::new(interval, limits.min_frames, limits.max_frames)?;
    let extension = options
        .extension
        .clone()
        .unwrap_or_else(|| config.video_extension.clone());
    let frame_format = options
        .format
        .clone()
        .unwrap_or_else(|| config.frame_format.clone());
    dsp_sampler::frame_image_format(&frame_format)?;
    debug!("Sampling configuration: {:?}", sampling_config);

    let (videos, default_output) = if input.is_file() {
        let parent = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        (vec![input.clone()], parent)
    } else if input.is_dir() {
        (dsp_sampler::discover_videos(&input, &extension)?, input.clone())
    } else {
        return Err(anyhow!("Input does not exist: {:?}", input));
    };
    let working_dir = options
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or(default_output);

    if videos.is_empty() {
        warn!("No .{} videos found in {:?}", extension, input);
        return Ok(());
    }
    info!(
        "Sampling {} videos every {} s ({}-{} frames) into {:?}",
        videos.len(),
        interval,
        limits.min_frames,
        limits.max_frames,
        working_dir
    );

    let running = ctrlc_flag()?;
    let report = dsp_sampler::run_batch(
        &videos,
        &working_dir,
        &sampling_config,
        &frame_format,
        &running,
    )
    .context("An error occurred during frame sampling")?;

    info!(
        "{} sufficient, {} insufficient, {} failed, {} frames written",
        style(report.sufficient()).green(),
        style(report.insufficient()).yellow(),
        style(report.failed()).red(),
        report.total_frames()
    );
    if report.interrupted {
        warn!("Sampling was interrupted");
    }
    Ok(())
}

fn run_merger(options: &MergerOptions, config: &Config) -> Result<()> {
    let sources: Vec<PathBuf> = options.inputs.iter().map(PathBuf::from).collect();
    debug!("Merging {:?} into {:?}", sources, options.output);

    let merger = dsp_merger::TreeMerger::new(
        sources,
        PathBuf::from(&options.output),
        &config.image_extension,
    )
    .context("Failed to initialize tree merger")?;
    let report = merger.merge().context("Failed to merge trees")?;

    info!(
        "Merged {} files across {} classes into {:?}",
        report.copied,
        report.classes.len(),
        merger.destination()
    );
    Ok(())
}

fn run_splitter(options: &SplitterOptions, config: &Config) -> Result<()> {
    let root = get_working_dir(options.input.clone()).context("Failed to resolve dataset root")?;
    let ratio = get_split_ratio(options.ratio, config).context("Failed to resolve split ratio")?;

    let split_config = dsp_splitter::SplitConfig {
        ratio,
        first_dir: options.first.clone(),
        second_dir: options.second.clone(),
        image_extension: options
            .extension
            .clone()
            .unwrap_or_else(|| config.image_extension.clone()),
        seed: options.seed.or(config.split_seed),
    };
    debug!("Split configuration: {:?}", split_config);

    let splitter = dsp_splitter::RatioSplitter::new(root, split_config.clone())
        .context("Failed to initialize splitter")?;
    let report = splitter.split().context("Failed to split dataset")?;

    info!(
        "{} images to {}, {} images to {}",
        report.first_total(),
        split_config.first_dir,
        report.second_total(),
        split_config.second_dir
    );
    Ok(())
}

/// Flag cleared by Ctrl+C; long running modes poll it between units of work.
fn ctrlc_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, finishing the current frame...");
        running_clone.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;
    Ok(running)
}
