use std::fmt;

use anyhow::Result;

use crate::detect::result::Detection;

/// Raised when an external collaborator (model file, trainer binary) is not
/// available. Callers map this to a distinct condition instead of retrying.
#[derive(Clone, Debug)]
pub struct BackendUnavailable {
    pub what: &'static str,
    pub reason: String,
}

impl BackendUnavailable {
    pub fn new(what: &'static str, reason: impl Into<String>) -> Self {
        Self {
            what,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BackendUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable: {}", self.what, self.reason)
    }
}

impl std::error::Error for BackendUnavailable {}

/// Detector backend trait.
///
/// Implementations own model loading and inference execution. Pixels are
/// tightly-packed RGB8; implementations must treat the slice as read-only.
/// Returned detections are in pixel coordinates of the input frame and
/// already filtered by `confidence_threshold`.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one frame.
    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, e.g. model load ahead of the first request.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
