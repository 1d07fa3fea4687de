use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use spectral_core::background::SigmaClip;
use spectral_core::color::{demosaic, CfaPattern};
use spectral_core::histogram::signal_histogram;
use spectral_core::orientation::OrientationMethod;
use spectral_core::pipeline::{extract_batch, ExtractionConfig, ExtractionResult, WindowConfig};
use spectral_core::profile::{spectrum_profiles, total_profile, Reduction};
use spectral_core::stack::{ColorMode, ColorPlaneStack};
use tracing::warn;

use crate::summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum PatternArg {
    Rggb,
    Grbg,
    Gbrg,
    Bggr,
    /// No color filter array
    Mono,
}

impl PatternArg {
    fn color_mode(self) -> ColorMode {
        match self {
            Self::Rggb => ColorMode::BayerRGGB,
            Self::Grbg => ColorMode::BayerGRBG,
            Self::Gbrg => ColorMode::BayerGBRG,
            Self::Bggr => ColorMode::BayerBGGR,
            Self::Mono => ColorMode::Mono,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Second-order image moments
    Moments,
    /// Binarize, then SVD of the foreground coordinates
    Svd,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReductionArg {
    Max,
    Mean,
}

impl From<ReductionArg> for Reduction {
    fn from(arg: ReductionArg) -> Self {
        match arg {
            ReductionArg::Max => Reduction::Max,
            ReductionArg::Mean => Reduction::Mean,
        }
    }
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Input mosaic images (grayscale, 8 or 16 bit)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Extraction config file (TOML), overrides the tuning flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Color filter array layout of the sensor
    #[arg(long, value_enum, default_value = "rggb")]
    pub pattern: PatternArg,

    /// Sigma threshold for background clipping
    #[arg(long, default_value = "3.0")]
    pub sigma: f64,

    /// Separate lower sigma threshold; a large value clips only bright outliers
    #[arg(long)]
    pub sigma_lower: Option<f64>,

    /// Signal cut as background mean + clipping * stddev
    #[arg(long, default_value = "10.0")]
    pub clipping: f64,

    /// Keep the full dispersion axis instead of cropping it
    #[arg(long)]
    pub dont_cut: bool,

    /// Extra pixels around the detected window
    #[arg(long, default_value = "0")]
    pub padding: usize,

    /// Orientation estimation method
    #[arg(long, value_enum, default_value = "moments")]
    pub method: MethodArg,

    /// How the CSV spectra collapse the slit axis
    #[arg(long, value_enum, default_value = "max")]
    pub reduction: ReductionArg,

    /// Write per-channel spectrum profiles as CSV into this directory
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write per-channel signal histograms as CSV into this directory
    #[arg(long)]
    pub histogram: Option<PathBuf>,

    /// Number of histogram bins
    #[arg(long, default_value = "100")]
    pub bins: usize,
}

pub fn run(args: &ExtractArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid extraction config")?
    } else {
        build_config_from_args(args)
    };
    config.validate()?;

    let mode = args.pattern.color_mode();
    let reduction = Reduction::from(args.reduction);
    summary::print_extraction_summary(&config, mode, reduction, args.files.len());

    let pb = if args.files.len() > 1 {
        let pb = ProgressBar::new(args.files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:12} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    pb.set_message("Loading");
    let mut stacks = Vec::with_capacity(args.files.len());
    for path in &args.files {
        stacks.push(load_stack(path, mode)?);
        pb.inc(1);
    }

    pb.set_message("Extracting");
    let results = extract_batch(&stacks, &config);
    pb.finish_and_clear();

    let mut failures = 0usize;
    for ((path, stack), result) in args.files.iter().zip(&stacks).zip(&results) {
        match result {
            Ok(result) => {
                let mut saved = Vec::new();
                if let Some(ref dir) = args.csv {
                    saved.push(write_spectrum_csv(dir, path, result, reduction)?);
                }
                if let Some(ref dir) = args.histogram {
                    saved.push(write_histogram_csv(
                        dir,
                        path,
                        stack,
                        result,
                        config.clipping_factor,
                        args.bins,
                    )?);
                }
                summary::print_result(path, result, &saved);
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Extraction failed");
                summary::print_failure(path, err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed", args.files.len());
    }
    Ok(())
}

fn build_config_from_args(args: &ExtractArgs) -> ExtractionConfig {
    let orientation = match args.method {
        MethodArg::Moments => OrientationMethod::Moments,
        MethodArg::Svd => OrientationMethod::BinarizeSvd,
    };

    let sigma = match args.sigma_lower {
        Some(lower) => SigmaClip::Asymmetric {
            lower,
            upper: args.sigma,
        },
        None => SigmaClip::Symmetric { sigma: args.sigma },
    };

    ExtractionConfig {
        sigma,
        clipping_factor: args.clipping,
        orientation,
        window: WindowConfig {
            cut_spectrum: !args.dont_cut,
            border_padding: args.padding,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Load a grayscale mosaic, normalized to [0, 1].
fn load_mosaic(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();

    Ok(Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
    }))
}

fn load_stack(path: &Path, mode: ColorMode) -> Result<ColorPlaneStack> {
    let raw = load_mosaic(path)?;
    let stack = match CfaPattern::from_color_mode(mode) {
        Some(pattern) => demosaic(&raw, &pattern, "RGB"),
        None => ColorPlaneStack::mono(raw),
    };
    stack.with_context(|| format!("Cannot build color planes for {}", path.display()))
}

/// Write `<stem>_spectrum.csv` with one column per channel plus their total.
fn write_spectrum_csv(
    dir: &Path,
    source: &Path,
    result: &ExtractionResult,
    reduction: Reduction,
) -> Result<PathBuf> {
    let path = output_path(dir, source, "spectrum")?;
    let spectra = spectrum_profiles(&result.stack, reduction);
    let total = total_profile(&spectra);

    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["column".to_string()];
    header.extend(result.stack.channels().iter().map(|c| c.to_string()));
    header.push("total".to_string());
    wtr.write_record(&header)?;

    for (i, sum) in total.iter().enumerate() {
        let mut record = vec![(result.roi.min_col + i).to_string()];
        record.extend(spectra.iter().map(|spectrum| spectrum[i].to_string()));
        record.push(sum.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    Ok(path)
}

/// Write `<stem>_histogram.csv`, one row per channel and bin.
fn write_histogram_csv(
    dir: &Path,
    source: &Path,
    stack: &ColorPlaneStack,
    result: &ExtractionResult,
    factor: f64,
    bins: usize,
) -> Result<PathBuf> {
    let path = output_path(dir, source, "histogram")?;
    let histograms = signal_histogram(stack, &result.background, factor, bins)?;

    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(["channel", "lower", "upper", "count"])?;

    for (channel, hist) in stack.channels().iter().zip(&histograms) {
        for (edges, count) in hist.edges.windows(2).zip(&hist.counts) {
            wtr.write_record([
                channel.to_string(),
                edges[0].to_string(),
                edges[1].to_string(),
                count.to_string(),
            ])?;
        }
    }
    wtr.flush()?;

    Ok(path)
}

fn output_path(dir: &Path, source: &Path, suffix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spectrum");
    Ok(dir.join(format!("{stem}_{suffix}.csv")))
}
