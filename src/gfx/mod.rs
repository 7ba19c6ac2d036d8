pub mod camera;
pub mod loader;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use rendering::render_engine;
