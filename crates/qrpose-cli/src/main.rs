//! qrpose CLI — five-point pose candidates and finder-pattern graphs.

use clap::{Args, Parser, Subcommand};
use image::GrayImage;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use qrpose_core::{
    epipolar_residual, Correspondence, FinderConfig, FinderPatternDetector, FivePointSolver,
    GraphExport, QuadDetector, QuadInfo,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "qrpose")]
#[command(about = "Five-point essential matrix estimation and QR finder-pattern graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate essential matrix candidates from point correspondences.
    Essential(EssentialArgs),

    /// Build a finder-pattern graph from an image and quad candidates.
    Finder(FinderArgs),
}

#[derive(Debug, Clone, Args)]
struct EssentialArgs {
    /// Correspondences JSON: [{"p1": [x, y], "p2": [x, y]}, ...] in
    /// normalized camera coordinates.
    #[arg(long)]
    pairs: PathBuf,

    /// Path to write candidate matrices and residuals (JSON).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct FinderArgs {
    /// Path to the input image (converted to grayscale).
    #[arg(long)]
    image: PathBuf,

    /// Quad candidates JSON produced by the upstream polygon stage.
    #[arg(long)]
    quads: PathBuf,

    /// Path to write the pattern graph (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Optional binary mask image; defaults to an all-set mask.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Largest marker version bounding the neighbor search radius.
    #[arg(long, default_value = "10")]
    max_version: u32,
}

fn main() -> CliResult<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Essential(args) => run_essential(args),
        Commands::Finder(args) => run_finder(args),
    }
}

// ── essential ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EssentialReport {
    /// Candidate essential matrices, row-major.
    candidates: Vec<[[f64; 3]; 3]>,
    /// Worst epipolar residual of each candidate over the input pairs.
    residuals: Vec<f64>,
}

fn run_essential(args: EssentialArgs) -> CliResult<()> {
    let pairs: Vec<Correspondence> =
        serde_json::from_reader(BufReader::new(File::open(&args.pairs)?))?;
    log::info!("loaded {} correspondences from {}", pairs.len(), args.pairs.display());

    let mut solver = FivePointSolver::new();
    let candidates = solver.solve(&pairs)?;
    log::info!("{} essential matrix candidates", candidates.len());

    let report = EssentialReport {
        residuals: candidates.iter().map(|e| epipolar_residual(e, &pairs)).collect(),
        candidates: candidates
            .iter()
            .map(|e| {
                [
                    [e[(0, 0)], e[(0, 1)], e[(0, 2)]],
                    [e[(1, 0)], e[(1, 1)], e[(1, 2)]],
                    [e[(2, 0)], e[(2, 1)], e[(2, 2)]],
                ]
            })
            .collect(),
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(&args.out)?), &report)?;
    Ok(())
}

// ── finder ───────────────────────────────────────────────────────────────

/// Quad candidates loaded from disk, standing in for a live polygon stage.
struct PrecomputedQuads(Vec<QuadInfo>);

impl QuadDetector for PrecomputedQuads {
    fn detect(&mut self, _gray: &GrayImage, _mask: &GrayImage) -> Vec<QuadInfo> {
        self.0.clone()
    }
}

fn run_finder(args: FinderArgs) -> CliResult<()> {
    let gray = image::open(&args.image)?.to_luma8();
    let mask = match &args.mask {
        Some(path) => image::open(path)?.to_luma8(),
        None => GrayImage::from_pixel(gray.width(), gray.height(), image::Luma([255])),
    };
    if mask.dimensions() != gray.dimensions() {
        return Err(format!(
            "mask size {:?} does not match image size {:?}",
            mask.dimensions(),
            gray.dimensions()
        )
        .into());
    }

    let quads: Vec<QuadInfo> = serde_json::from_reader(BufReader::new(File::open(&args.quads)?))?;
    log::info!("loaded {} quad candidates from {}", quads.len(), args.quads.display());

    let mut detector = FinderPatternDetector::new(
        Box::new(PrecomputedQuads(quads)),
        FinderConfig::with_max_version(args.max_version),
    );
    let graph = detector.detect(&gray, &mask)?;
    log::info!(
        "{} position patterns, {} connections",
        graph.nodes().len(),
        graph.n_connections()
    );

    let export: GraphExport = graph.export();
    serde_json::to_writer_pretty(BufWriter::new(File::create(&args.out)?), &export)?;
    Ok(())
}
