//! Vehicle damage detection service.
//!
//! A thin application layer around an external object-detection library:
//! dataset download and conversion into a YOLO training layout, trainer
//! invocation, and a REST endpoint serving structured damage reports.
//!
//! # Module Structure
//!
//! - `detect`: damage class vocabulary, detector backend seam, registry
//! - `label`: pixel bbox <-> normalized center-form conversion
//! - `report`: severity assessment and the `DamageReport` record
//! - `dataset`: VehiDE download and YOLO conversion
//! - `train`: external trainer invocation
//! - `annotate`: detection overlay rendering
//! - `api`: loopback HTTP server
//! - `config`: layered file/env configuration

pub mod annotate;
pub mod api;
pub mod config;
pub mod dataset;
pub mod detect;
pub mod label;
pub mod report;
pub mod train;

pub use config::AppConfig;
pub use detect::{
    BackendRegistry, BackendUnavailable, DamageClass, Detection, DetectorBackend, PixelBBox,
    StubBackend, KNOWN_CLASSES,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use label::{denormalize, normalize, LabelError, NormalizedBBox};
pub use report::{DamageReport, Severity, SeverityAssessor, SeverityThresholds};
