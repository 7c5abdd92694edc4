//! External trainer invocation.
//!
//! Training itself belongs to the detection library; this module only builds
//! the argument list for a `yolo`-compatible trainer binary and runs it. A
//! missing binary surfaces as `BackendUnavailable`, not a panic.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Result};

use crate::detect::BackendUnavailable;

/// Hyperparameters for one training run. Defaults mirror the original
/// training pipeline (nano model, 100 epochs, 640px, mosaic augmentation).
#[derive(Clone, Debug)]
pub struct TrainConfig {
    pub data_yaml: PathBuf,
    pub model: String,
    pub epochs: u32,
    pub batch: u32,
    pub imgsz: u32,
    pub project: PathBuf,
    pub name: String,
    pub trainer_bin: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_yaml: PathBuf::from("datasets/yolo_damage/data.yaml"),
            model: "yolov8n.pt".to_string(),
            epochs: 100,
            batch: 16,
            imgsz: 640,
            project: PathBuf::from("models"),
            name: "damage_detection".to_string(),
            trainer_bin: "yolo".to_string(),
        }
    }
}

impl TrainConfig {
    /// Where the trainer leaves the best checkpoint.
    pub fn best_model_path(&self) -> PathBuf {
        self.project.join(&self.name).join("weights").join("best.pt")
    }
}

/// Trainer CLI arguments in `key=value` form.
pub fn command_args(cfg: &TrainConfig) -> Vec<String> {
    let mut args = vec![
        "detect".to_string(),
        "train".to_string(),
        format!("data={}", cfg.data_yaml.display()),
        format!("model={}", cfg.model),
        format!("epochs={}", cfg.epochs),
        format!("batch={}", cfg.batch),
        format!("imgsz={}", cfg.imgsz),
        format!("project={}", cfg.project.display()),
        format!("name={}", cfg.name),
        "save_period=10".to_string(),
        "patience=50".to_string(),
        "cache=True".to_string(),
    ];
    // Augmentation set carried over from the original pipeline.
    for (key, value) in [
        ("hsv_h", "0.015"),
        ("hsv_s", "0.7"),
        ("hsv_v", "0.4"),
        ("degrees", "0.0"),
        ("translate", "0.1"),
        ("scale", "0.5"),
        ("shear", "0.0"),
        ("perspective", "0.0"),
        ("flipud", "0.0"),
        ("fliplr", "0.5"),
        ("mosaic", "1.0"),
        ("mixup", "0.0"),
    ] {
        args.push(format!("{key}={value}"));
    }
    args
}

/// Run one training session, blocking until the trainer exits.
pub fn run(cfg: &TrainConfig) -> Result<()> {
    if !cfg.data_yaml.exists() {
        return Err(anyhow!(
            "dataset config {} not found; run dataset conversion first",
            cfg.data_yaml.display()
        ));
    }

    let args = command_args(cfg);
    log::info!("starting trainer: {} {}", cfg.trainer_bin, args.join(" "));

    let status = Command::new(&cfg.trainer_bin)
        .args(&args)
        .status()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::new(BackendUnavailable::new(
                    "trainer binary",
                    format!("'{}' not found on PATH", cfg.trainer_bin),
                ))
            } else {
                anyhow::Error::new(err).context("failed to spawn trainer")
            }
        })?;

    if !status.success() {
        return Err(anyhow!("trainer exited with status {status}"));
    }
    log::info!("training finished; best model at {}", cfg.best_model_path().display());
    Ok(())
}

/// Check that a trained model exists before serving it.
pub fn require_model(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(BackendUnavailable::new(
            "damage model",
            format!("model file {} not found; train one first", path.display()),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_args_carry_hyperparameters() {
        let cfg = TrainConfig::default();
        let args = command_args(&cfg);
        assert_eq!(args[0], "detect");
        assert_eq!(args[1], "train");
        assert!(args.contains(&"epochs=100".to_string()));
        assert!(args.contains(&"imgsz=640".to_string()));
        assert!(args.contains(&"patience=50".to_string()));
        assert!(args.contains(&"fliplr=0.5".to_string()));
    }

    #[test]
    fn best_model_path_follows_run_name() {
        let cfg = TrainConfig {
            project: PathBuf::from("models"),
            name: "damage_detection".to_string(),
            ..TrainConfig::default()
        };
        assert_eq!(
            cfg.best_model_path(),
            PathBuf::from("models/damage_detection/weights/best.pt")
        );
    }

    #[test]
    fn run_requires_data_yaml() {
        let cfg = TrainConfig {
            data_yaml: PathBuf::from("/nonexistent/data.yaml"),
            ..TrainConfig::default()
        };
        let err = run(&cfg).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn missing_model_is_a_backend_unavailable() {
        let err = require_model(Path::new("/nonexistent/best.pt")).unwrap_err();
        assert!(err.downcast_ref::<BackendUnavailable>().is_some());
    }
}
