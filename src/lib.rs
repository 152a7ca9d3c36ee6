//! # Silverfern Model
//!
//! Scene-graph to skeletal-mesh import for the Silverfern Engine.
//!
//! Converts a hierarchical glTF scene (nodes, meshes, skins, per-vertex
//! bone influences) into the engine's rigid piece hierarchy: a tree of
//! named rigid bodies, each owning vertex/index geometry expressed in
//! that body's local bind space.
//!
//! - [`arena::PieceArena`] — bounded pool handing out piece records
//! - [`model::Model`] / [`model::Piece`] — the populated output types
//! - [`skinning`] — reassigns blended skinned geometry to single pieces
//! - [`gltf::load_model`] — the import entry point

pub mod arena;
pub mod gltf;
pub mod math;
pub mod model;
pub mod skinning;
pub mod transform;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
