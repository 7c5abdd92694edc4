mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{BackendUnavailable, DetectorBackend};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
pub use result::{DamageClass, Detection, PixelBBox, KNOWN_CLASSES};
