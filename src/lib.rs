//! Vantage 3D viewer
//!
//! A textured-model viewer built on wgpu and winit: orbit camera, ambient +
//! directional lighting with shadow mapping, asynchronous OBJ loading, and
//! click picking that tints the selected part.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::ViewerApp;
pub use config::ViewerConfig;
pub use error::ViewerError;

/// Creates a viewer with the default configuration
pub fn default() -> ViewerApp {
    ViewerApp::new(ViewerConfig::default())
}
