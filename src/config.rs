use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::report::SeverityThresholds;

const DEFAULT_MODEL_PATH: &str = "models/damage_detection/weights/best.pt";
const DEFAULT_API_ADDR: &str = "127.0.0.1:8088";
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_DATASET_ROOT: &str = "datasets/vehide";
const DEFAULT_YOLO_ROOT: &str = "datasets/yolo_damage";

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    model: Option<ModelConfigFile>,
    api: Option<ApiConfigFile>,
    severity: Option<SeverityThresholds>,
    dataset: Option<DatasetConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
    confidence_threshold: Option<f32>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DatasetConfigFile {
    root: Option<PathBuf>,
    yolo_root: Option<PathBuf>,
}

/// Resolved service configuration: JSON file, then env overrides, then
/// validation. The config file path comes from `DAMAGE_CONFIG`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub api: ApiSettings,
    pub severity: SeverityThresholds,
    pub dataset: DatasetSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub addr: String,
    pub confidence_threshold: f32,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatasetSettings {
    pub root: PathBuf,
    pub yolo_root: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DAMAGE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let model = ModelSettings {
            path: file
                .model
                .as_ref()
                .and_then(|model| model.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_width: file
                .model
                .as_ref()
                .and_then(|model| model.input_width)
                .unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: file
                .model
                .and_then(|model| model.input_height)
                .unwrap_or(DEFAULT_MODEL_INPUT),
        };
        let api = ApiSettings {
            addr: file
                .api
                .as_ref()
                .and_then(|api| api.addr.clone())
                .unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            confidence_threshold: file
                .api
                .as_ref()
                .and_then(|api| api.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE),
            max_upload_bytes: file
                .api
                .and_then(|api| api.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };
        let severity = file.severity.unwrap_or_default();
        let dataset = DatasetSettings {
            root: file
                .dataset
                .as_ref()
                .and_then(|dataset| dataset.root.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_ROOT)),
            yolo_root: file
                .dataset
                .and_then(|dataset| dataset.yolo_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_YOLO_ROOT)),
        };
        Self {
            model,
            api,
            severity,
            dataset,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("DAMAGE_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api.addr = addr;
            }
        }
        if let Ok(path) = std::env::var("DAMAGE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = PathBuf::from(path);
            }
        }
        if let Ok(confidence) = std::env::var("DAMAGE_CONFIDENCE") {
            self.api.confidence_threshold = confidence
                .parse()
                .map_err(|_| anyhow!("DAMAGE_CONFIDENCE must be a float in [0,1]"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.api.confidence_threshold) {
            return Err(anyhow!("confidence threshold must be in [0,1]"));
        }
        if self.api.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("model input dimensions must be positive"));
        }
        let t = &self.severity;
        if t.severe_count_for_moderate == 0 || t.total_for_moderate == 0 {
            return Err(anyhow!("severity thresholds must be at least 1"));
        }
        if t.severe_count_for_severe < t.severe_count_for_moderate
            || t.total_for_severe < t.total_for_moderate
        {
            return Err(anyhow!(
                "severe thresholds must not be lower than moderate thresholds"
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> AppConfig {
        AppConfig::from_file(AppConfigFile::default())
    }

    #[test]
    fn defaults_validate() {
        let cfg = defaults();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.api.addr, DEFAULT_API_ADDR);
        assert_eq!(cfg.model.input_width, 640);
    }

    #[test]
    fn file_values_override_defaults() {
        let file: AppConfigFile = serde_json::from_str(
            r#"{
                "model": { "path": "m.onnx", "input_width": 320 },
                "api": { "addr": "127.0.0.1:9000", "confidence_threshold": 0.25 },
                "severity": {
                    "severe_classes": ["crack"],
                    "severe_count_for_severe": 4,
                    "total_for_severe": 6,
                    "severe_count_for_moderate": 1,
                    "total_for_moderate": 3
                }
            }"#,
        )
        .unwrap();
        let cfg = AppConfig::from_file(file);
        assert_eq!(cfg.model.path, PathBuf::from("m.onnx"));
        assert_eq!(cfg.model.input_width, 320);
        assert_eq!(cfg.model.input_height, 640);
        assert_eq!(cfg.api.addr, "127.0.0.1:9000");
        assert_eq!(cfg.severity.total_for_severe, 6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let mut cfg = defaults();
        cfg.api.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_severity_thresholds_are_rejected() {
        let mut cfg = defaults();
        cfg.severity.total_for_severe = 2;
        cfg.severity.total_for_moderate = 3;
        assert!(cfg.validate().is_err());
    }
}
