use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{DamageClass, Detection, PixelBBox};

/// Stub backend for tests and model-less runs.
///
/// Without canned detections it derives a deterministic finding from a pixel
/// hash, so identical frames always produce identical reports. Tests usually
/// construct it with `with_detections` instead.
pub struct StubBackend {
    canned: Option<Vec<Detection>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { canned: None }
    }

    /// Always return the given detections, filtered by threshold.
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self {
            canned: Some(detections),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        if let Some(canned) = &self.canned {
            return Ok(canned
                .iter()
                .filter(|det| det.confidence >= confidence_threshold)
                .cloned()
                .collect());
        }

        let hash: [u8; 32] = Sha256::digest(pixels).into();
        // Map the hash into one synthetic finding in the top-left quadrant.
        let class = DamageClass::from_class_id(u32::from(hash[0] % 10));
        let confidence = 0.5 + f32::from(hash[1]) / 512.0;
        if confidence < confidence_threshold {
            return Ok(Vec::new());
        }
        let w = width as f32;
        let h = height as f32;
        Ok(vec![Detection::new(
            class,
            confidence,
            PixelBBox::new(0.0, 0.0, w / 2.0, h / 2.0),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_detections_are_deterministic() {
        let mut backend = StubBackend::new();
        let frame = vec![7u8; 2 * 2 * 3];
        let a = backend.detect(&frame, 2, 2, 0.0).unwrap();
        let b = backend.detect(&frame, 2, 2, 0.0).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].class, b[0].class);
        assert_eq!(a[0].confidence, b[0].confidence);
    }

    #[test]
    fn canned_detections_respect_threshold() {
        let dets = vec![
            Detection::new(DamageClass::Dent, 0.9, PixelBBox::new(0.0, 0.0, 1.0, 1.0)),
            Detection::new(DamageClass::Rust, 0.3, PixelBBox::new(0.0, 0.0, 1.0, 1.0)),
        ];
        let mut backend = StubBackend::with_detections(dets);
        let found = backend.detect(&[0u8; 12], 2, 2, 0.5).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class, DamageClass::Dent);
    }
}
