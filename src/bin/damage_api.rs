//! damage_api - REST endpoint for vehicle damage detection
//!
//! Loads configuration, builds the detector registry, and serves the
//! loopback HTTP API until interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use damage_scan::api::{ApiConfig, ApiServer};
use damage_scan::{AppConfig, BackendRegistry, SeverityAssessor, StubBackend};

fn build_registry(cfg: &AppConfig) -> BackendRegistry {
    let mut registry = BackendRegistry::new();

    #[cfg(feature = "backend-tract")]
    {
        match damage_scan::TractBackend::new(
            &cfg.model.path,
            cfg.model.input_width,
            cfg.model.input_height,
        ) {
            Ok(backend) => registry.register(backend),
            Err(err) => log::warn!("tract backend unavailable: {}", err),
        }
    }
    #[cfg(not(feature = "backend-tract"))]
    let _ = &cfg.model;

    if registry.default_backend().is_none() {
        log::warn!("no model backend available; serving stub detections");
        registry.register(StubBackend::new());
    }
    registry
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = AppConfig::load()?;
    let registry = build_registry(&cfg);
    let assessor = SeverityAssessor::new(cfg.severity.clone());

    let api_config = ApiConfig {
        addr: cfg.api.addr.clone(),
        confidence_threshold: cfg.api.confidence_threshold,
        max_upload_bytes: cfg.api.max_upload_bytes,
    };
    let handle = ApiServer::new(api_config, registry, assessor).spawn()?;
    log::info!("damage api listening on {}", handle.addr);
    log::info!("model path: {}", cfg.model.path.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })?;

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    log::info!("shutting down");
    handle.stop()
}
