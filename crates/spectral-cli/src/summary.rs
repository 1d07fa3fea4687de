use std::path::{Path, PathBuf};

use console::Style;
use spectral_core::background::BackgroundStats;
use spectral_core::error::SpectralError;
use spectral_core::pipeline::{ExtractionConfig, ExtractionResult};
use spectral_core::profile::Reduction;
use spectral_core::stack::ColorMode;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red().bold(),
        }
    }
}

pub fn print_extraction_summary(
    config: &ExtractionConfig,
    mode: ColorMode,
    reduction: Reduction,
    files: usize,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Spectrum Extraction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Files"),
        s.value.apply_to(files)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Sensor"),
        s.method.apply_to(mode)
    );
    println!();

    // Background
    println!("  {}", s.header.apply_to("Background"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Clip"),
        s.value.apply_to(config.sigma)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Iterations"),
        s.value.apply_to(config.max_iterations)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Signal cut"),
        s.value.apply_to(format!("mean + {}\u{03c3}", config.clipping_factor))
    );
    println!();

    // Orientation
    println!("  {}", s.header.apply_to("Orientation"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(config.orientation)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Tolerance"),
        s.value.apply_to(format!("{}\u{00b0}", config.angle_tolerance_deg))
    );
    println!();

    // Window
    println!("  {}", s.header.apply_to("Window"));
    if config.window.cut_spectrum {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Channels"),
            s.method.apply_to(config.window.channel_combine)
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Columns"),
            s.disabled.apply_to("full width")
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Padding"),
        s.value.apply_to(format!("{} px", config.window.border_padding))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Profile"),
        s.method.apply_to(reduction)
    );
    println!();
}

pub fn print_result(path: &Path, result: &ExtractionResult, saved: &[PathBuf]) {
    let s = Styles::new();

    println!("  {}", s.path.apply_to(path.display()));
    let per_channel: Vec<String> = result
        .per_channel_angles
        .iter()
        .zip(result.stack.channels())
        .map(|(angle, channel)| format!("{channel} {angle}"))
        .collect();
    println!(
        "    {:<12}{}  {}",
        s.label.apply_to("Angle"),
        s.value.apply_to(result.angle),
        s.label.apply_to(format!("({})", per_channel.join(", ")))
    );
    let roi = result.roi;
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!(
            "rows {}..={}, cols {}..={} ({}x{})",
            roi.min_row,
            roi.max_row,
            roi.min_col,
            roi.max_col,
            roi.cols(),
            roi.rows()
        ))
    );
    print_background(&s, "Background", &result.background);
    print_background(&s, "De-rotated", &result.derotated_background);
    for saved in saved {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Saved"),
            s.path.apply_to(saved.display())
        );
    }
    println!();
}

fn print_background(s: &Styles, label: &str, stats: &[BackgroundStats]) {
    println!(
        "    {:<12}{}",
        s.label.apply_to(label),
        s.value.apply_to(format_background(stats))
    );
}

/// `mean±stddev` per channel.
fn format_background(stats: &[BackgroundStats]) -> String {
    stats
        .iter()
        .map(|b| format!("{:.4}\u{00b1}{:.4}", b.mean, b.stddev))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn print_failure(path: &Path, err: &SpectralError) {
    let s = Styles::new();
    println!("  {}", s.path.apply_to(path.display()));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Failed"),
        s.error.apply_to(err)
    );
    println!();
}
