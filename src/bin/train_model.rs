//! train_model - invoke the external trainer on the converted dataset

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use damage_scan::train::{self, TrainConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the dataset config written by convert_dataset.
    #[arg(long, default_value = "datasets/yolo_damage/data.yaml")]
    data: PathBuf,
    /// Base model to fine-tune.
    #[arg(long, default_value = "yolov8n.pt")]
    model: String,
    #[arg(long, default_value_t = 100)]
    epochs: u32,
    #[arg(long, default_value_t = 16)]
    batch: u32,
    #[arg(long, default_value_t = 640)]
    imgsz: u32,
    /// Directory for training runs.
    #[arg(long, default_value = "models")]
    project: PathBuf,
    /// Run name; weights land under <project>/<name>/weights.
    #[arg(long, default_value = "damage_detection")]
    name: String,
    /// Trainer binary to invoke.
    #[arg(long, default_value = "yolo", env = "DAMAGE_TRAINER_BIN")]
    trainer_bin: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = TrainConfig {
        data_yaml: args.data,
        model: args.model,
        epochs: args.epochs,
        batch: args.batch,
        imgsz: args.imgsz,
        project: args.project,
        name: args.name,
        trainer_bin: args.trainer_bin,
    };
    train::run(&cfg)
}
