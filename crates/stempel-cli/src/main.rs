// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stempel: bulk document watermarking from the command line.
//
// Entry point. Initialises logging, resolves the configuration (defaults,
// optional JSON file, environment, then flags) and runs the engine.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use stempel_core::human_errors::humanize_error;
use stempel_core::{
    FailurePolicy, HorizontalAlignment, PaperSize, RgbaColor, SourceKind, StempelError,
    WatermarkConfig, WatermarkMode,
};
use stempel_engine::{
    BatchReport, BuiltinRenderer, CancellationToken, CommandRenderer, DocumentRenderer,
    FontResolver, TileCache, WatermarkSession, collect_inputs,
};

use services::cache_dir::tile_cache_dir;

#[derive(Parser, Debug)]
#[command(name = "stempel")]
#[command(version, about = "Stamp text or image watermarks onto every page of a batch of documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark every supported document in the input directory
    Run(RunArgs),
    /// Render the watermark tile to a PNG without touching any document
    Tile(TileArgs),
    /// Print the effective configuration as JSON
    Config(WatermarkArgs),
    /// Delete cached text tiles
    PurgeCache,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    watermark: WatermarkArgs,

    /// Directory holding the documents to watermark
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving the watermarked PDFs
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// External renderer for Markdown and HTML, e.g. "pandoc {input} -o {output}"
    #[arg(long)]
    renderer_command: Option<String>,
}

#[derive(Args, Debug)]
struct TileArgs {
    #[command(flatten)]
    watermark: WatermarkArgs,

    /// Where to write the tile
    #[arg(long, default_value = "tile.png")]
    out: PathBuf,
}

/// Settings shared by every subcommand that builds a watermark.
#[derive(Args, Debug)]
struct WatermarkArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watermark text
    #[arg(long, conflicts_with = "image")]
    text: Option<String>,

    /// Watermark image (PNG or JPEG) instead of text
    #[arg(long)]
    image: Option<PathBuf>,

    /// Do not append today's date to the text
    #[arg(long)]
    no_date: bool,

    /// Placement mode: grid or insert
    #[arg(long)]
    mode: Option<WatermarkMode>,

    /// Tile opacity, 0.0 to 1.0
    #[arg(long)]
    opacity: Option<f32>,

    /// Counter-clockwise tile rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f32>,

    /// Tile scale multiplier
    #[arg(long)]
    scale: Option<f32>,

    /// Tiles across the page
    #[arg(long)]
    horizontal: Option<u32>,

    /// Tiles down the page
    #[arg(long)]
    vertical: Option<u32>,

    /// Insert-mode anchor, as a fraction of page width
    #[arg(long)]
    insert_x: Option<f32>,

    /// Insert-mode anchor, as a fraction of page height
    #[arg(long)]
    insert_y: Option<f32>,

    /// Insert-mode alignment: left, center or right
    #[arg(long)]
    align: Option<HorizontalAlignment>,

    /// Font size in points
    #[arg(long)]
    font_size: Option<f32>,

    /// Transparent padding around the text, in points
    #[arg(long)]
    padding: Option<u32>,

    /// Text colour as r,g,b,a
    #[arg(long)]
    color: Option<RgbaColor>,

    /// Font file that takes precedence over the system candidates
    #[arg(long)]
    font: Option<PathBuf>,

    /// Directory holding a ready-made watermark image, used when no font loads
    #[arg(long)]
    watermark_dir: Option<PathBuf>,

    /// Overlay resolution in dots per inch
    #[arg(long)]
    dpi: Option<f32>,

    /// Fail a whole document when any page cannot be watermarked
    #[arg(long)]
    strict: bool,

    /// Always re-render the text tile
    #[arg(long)]
    no_cache: bool,
}

impl WatermarkArgs {
    /// Defaults, then the config file, then the environment, then flags.
    fn resolve(&self) -> Result<WatermarkConfig, StempelError> {
        let mut config = match &self.config {
            Some(path) => WatermarkConfig::load(path)?,
            None => WatermarkConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(text) = &self.text {
            config.source = SourceKind::Text;
            config.text = text.clone();
        }
        if let Some(image) = &self.image {
            config.source = SourceKind::Image;
            config.image = Some(image.clone());
        }
        if self.no_date {
            config.add_date = false;
        }
        if let Some(mode) = self.mode {
            config.watermark_type = mode;
        }
        if let Some(opacity) = self.opacity {
            config.opacity = opacity;
        }
        if let Some(angle) = self.angle {
            config.angle = angle;
        }
        if let Some(scale) = self.scale {
            config.image_scale = scale;
        }
        if let Some(horizontal) = self.horizontal {
            config.horizontal_boxes = horizontal;
        }
        if let Some(vertical) = self.vertical {
            config.vertical_boxes = vertical;
        }
        if let Some(x) = self.insert_x {
            config.insert_x = x;
        }
        if let Some(y) = self.insert_y {
            config.insert_y = y;
        }
        if let Some(align) = self.align {
            config.horizontal_alignment = align;
        }
        if let Some(size) = self.font_size {
            config.font_size = size;
        }
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
        if let Some(color) = self.color {
            config.text_color = color;
        }
        if let Some(font) = &self.font {
            config.font_override = Some(font.clone());
        }
        if let Some(dir) = &self.watermark_dir {
            config.watermark_dir = dir.clone();
        }
        if let Some(dpi) = self.dpi {
            config.render_dpi = dpi;
        }
        if self.strict {
            config.failure_policy = FailurePolicy::Strict;
        }
        if self.no_cache {
            config.cache_tiles = false;
        }

        config.validate()?;
        Ok(config)
    }

    fn session(&self) -> Result<(WatermarkConfig, WatermarkSession), StempelError> {
        let config = self.resolve()?;
        let fonts = FontResolver::with_default_candidates(config.font_override.clone());
        let cache = config
            .cache_tiles
            .then(|| TileCache::new(tile_cache_dir()));
        let session = WatermarkSession::from_config(&config, &fonts, cache)?;
        Ok((config, session))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Command::Run(args) => run(args),
        Command::Tile(args) => tile(args),
        Command::Config(args) => print_config(args),
        Command::PurgeCache => purge_cache(),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "stempel failed");
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RunArgs) -> Result<ExitCode, StempelError> {
    let (config, session) = args.watermark.session()?;
    let input_dir = args.input.clone().unwrap_or_else(|| config.input_dir.clone());
    let output_dir = args.output.clone().unwrap_or_else(|| config.output_dir.clone());

    let builtin = BuiltinRenderer::new(PaperSize::default());
    let renderer: Box<dyn DocumentRenderer> = match &args.renderer_command {
        Some(template) => Box::new(CommandRenderer::from_template(template, builtin)?),
        None => Box::new(builtin),
    };

    let inputs = collect_inputs(&input_dir)?;
    tracing::info!(
        input_dir = %input_dir.display(),
        files = inputs.len(),
        "Starting batch"
    );
    if inputs.is_empty() {
        println!("No supported documents in {}", input_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    let report = session.orchestrator(renderer).run(
        &inputs,
        &output_dir,
        session.tile(),
        session.params(),
        &CancellationToken::new(),
    )?;
    print_report(&report);

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        let name = outcome.input.display();
        match (&outcome.result, &outcome.output) {
            (Ok(summary), Some(output)) if summary.failed_pages.is_empty() => {
                println!("ok    {} -> {} ({} pages)", name, output.display(), summary.pages);
            }
            (Ok(summary), output) => {
                let pages: Vec<String> =
                    summary.failed_pages.iter().map(|p| p.to_string()).collect();
                println!(
                    "warn  {} -> {} ({} pages, not watermarked: {})",
                    name,
                    output.as_ref().map(|o| o.display().to_string()).unwrap_or_default(),
                    summary.pages,
                    pages.join(", ")
                );
            }
            (Err(err), _) => {
                let human = humanize_error(err);
                println!("fail  {}: {}", name, human.message);
                println!("      {}", human.suggestion);
            }
        }
    }
    println!(
        "{} of {} documents watermarked",
        report.succeeded(),
        report.outcomes.len()
    );
}

fn tile(args: &TileArgs) -> Result<ExitCode, StempelError> {
    let (_, session) = args.watermark.session()?;
    session.tile().save(&args.out)?;
    println!(
        "Wrote {}x{} tile to {}",
        session.tile().width(),
        session.tile().height(),
        args.out.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn print_config(args: &WatermarkArgs) -> Result<ExitCode, StempelError> {
    let config = args.resolve()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(ExitCode::SUCCESS)
}

fn purge_cache() -> Result<ExitCode, StempelError> {
    let cache = TileCache::new(tile_cache_dir());
    let removed = cache.purge()?;
    println!("Removed {} cached tiles from {}", removed, cache.dir().display());
    Ok(ExitCode::SUCCESS)
}
