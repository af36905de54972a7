pub mod camera;
pub mod detector;
pub mod rgba_converter;
pub mod skeleton;

// Re-exports for convenience
pub use camera::CameraStream;
pub use detector::{DetectorBackend, start_detector};
