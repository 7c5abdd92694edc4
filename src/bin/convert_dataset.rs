//! convert_dataset - VehiDE annotations to YOLO training layout

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use damage_scan::dataset::DatasetConverter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Root of the downloaded VehiDE dataset.
    #[arg(long, default_value = "datasets/vehide")]
    dataset_root: PathBuf,
    /// Output root for the YOLO layout.
    #[arg(long, default_value = "datasets/yolo_damage")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let converter = DatasetConverter::new(&args.dataset_root, &args.output);
    let summary = converter.convert()?;

    let mut converted_any = false;
    for (split, result) in &summary.splits {
        match result {
            Some(split_summary) => {
                converted_any = true;
                log::info!(
                    "{split}: {} images, {} label lines",
                    split_summary.images,
                    split_summary.labels
                );
            }
            None => log::warn!("{split}: no annotation file, skipped"),
        }
    }
    if !converted_any {
        anyhow::bail!(
            "no splits converted; check the dataset layout under {}",
            args.dataset_root.display()
        );
    }

    log::info!("dataset config written to {}", converter.data_yaml_path().display());
    Ok(())
}
