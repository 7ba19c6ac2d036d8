//! # Scene Management Module
//!
//! Scene graph and mesh data for the viewer: a tree of [`SceneNode`]s under a
//! single root, the [`Scene`] container that owns it together with the camera
//! and material storage, and the [`Vertex3D`] GPU vertex format.
//!
//! Nodes are addressed by child-index paths; picking flattens the whole tree
//! on demand rather than maintaining an index.

pub mod node;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use node::{DrawNode, Mesh, SceneNode};
pub use scene::Scene;
pub use vertex::Vertex3D;
