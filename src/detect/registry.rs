use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Thread-safe registry of detector backends.
///
/// The registry is the explicit detector dependency handed to request
/// handlers; there is no process-wide model singleton. Backends are wrapped
/// in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn DetectorBackend>>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set the default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.backends.get(name).cloned()
    }

    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    pub fn default_backend_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    /// Run detection with the default backend.
    pub fn detect(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let backend = self
            .default_backend()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("detector backend lock poisoned"))?;
        guard.detect(pixels, width, height, confidence_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubBackend;
    use crate::detect::result::{DamageClass, PixelBBox};

    #[test]
    fn first_registered_backend_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        assert_eq!(registry.default_backend_name(), Some("stub"));
        assert_eq!(registry.list(), vec!["stub".to_string()]);
    }

    #[test]
    fn detect_without_backend_fails() {
        let registry = BackendRegistry::new();
        assert!(registry.detect(&[0u8; 12], 2, 2, 0.5).is_err());
    }

    #[test]
    fn detect_routes_to_default_backend() {
        let canned = vec![crate::detect::Detection::new(
            DamageClass::Scratch,
            0.9,
            PixelBBox::new(0.0, 0.0, 4.0, 4.0),
        )];
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::with_detections(canned));
        let found = registry.detect(&[0u8; 12], 2, 2, 0.5).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class, DamageClass::Scratch);
    }

    #[test]
    fn set_default_rejects_unknown_name() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        assert!(registry.set_default("tract").is_err());
        assert!(registry.set_default("stub").is_ok());
    }
}
