//! detect_damage - one-shot damage detection on a local image

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use damage_scan::{annotate, DetectorBackend, SeverityAssessor, StubBackend};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,
    /// Path to the trained model.
    #[arg(long, default_value = "models/damage_detection/weights/best.pt")]
    model: PathBuf,
    /// Confidence threshold (0-1).
    #[arg(long, default_value_t = 0.5)]
    confidence: f32,
    /// Output path for the JSON report.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Output path for the annotated image.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn build_backend(args: &Args) -> Box<dyn DetectorBackend> {
    #[cfg(feature = "backend-tract")]
    {
        match damage_scan::TractBackend::new(&args.model, 640, 640) {
            Ok(backend) => return Box::new(backend),
            Err(err) => log::warn!("tract backend unavailable: {}", err),
        }
    }
    #[cfg(not(feature = "backend-tract"))]
    let _ = &args.model;

    log::warn!("no model backend available; using stub detections");
    Box::new(StubBackend::new())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let frame = image::open(&args.image)
        .with_context(|| format!("failed to open image {}", args.image.display()))?
        .to_rgb8();
    let (width, height) = frame.dimensions();

    let mut backend = build_backend(&args);
    let detections = backend.detect(frame.as_raw(), width, height, args.confidence)?;

    let report = SeverityAssessor::default().assess(&detections);
    log::info!("total damages found: {}", report.total_damages);
    for (i, det) in report.detailed_damages.iter().enumerate() {
        log::info!(
            "  {}. {} (confidence: {:.3})",
            i + 1,
            det.class,
            det.confidence
        );
    }
    log::info!("damage assessment: {:?}", report.severity);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        log::info!("report saved: {}", path.display());
    }

    if let Some(path) = &args.output {
        let jpeg = annotate::render_jpeg(&frame, &report.detailed_damages)?;
        std::fs::write(path, jpeg)
            .with_context(|| format!("failed to write annotated image to {}", path.display()))?;
        log::info!("annotated image saved: {}", path.display());
    }

    Ok(())
}
