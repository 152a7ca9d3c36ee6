//! Import error type.

use thiserror::Error;

use crate::arena::ArenaError;
use crate::skinning::SkinningError;

/// Errors that can abort a model import.
///
/// Every variant is fatal for the current load; no partial model is
/// published. The only recovery available to a caller is to skip the
/// failed model and keep loading others.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The asset container could not be parsed.
    #[error("glTF parse error: {0}")]
    Parse(#[from] gltf_dep::Error),

    /// The document contains no scenes.
    #[error("document has no scenes")]
    NoScenes,

    /// The selected scene has no root nodes.
    #[error("scene has no root nodes")]
    EmptyScene,

    /// The first scene root is skinned, leaving no rigid root piece.
    #[error("scene root node {node} is skinned; no rigid root piece")]
    NoRootPiece {
        /// Source node index of the offending root.
        node: usize,
    },

    /// A primitive is missing position data.
    #[error("mesh {mesh} primitive {primitive} has no POSITION attribute")]
    MissingPositions {
        /// Mesh index in the document.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },

    /// A primitive is missing its index list. The producing stage must
    /// always generate indices.
    #[error("mesh {mesh} primitive {primitive} has no index data")]
    MissingIndices {
        /// Mesh index in the document.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },

    /// A primitive uses a topology other than a triangle list.
    #[error("mesh {mesh} primitive {primitive} has unsupported topology {mode}")]
    UnsupportedTopology {
        /// Mesh index in the document.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
        /// Authored primitive mode.
        mode: String,
    },

    /// A node transform decomposes into non-uniform per-axis scale.
    /// Explicitly unsupported, never approximated.
    #[error("node {node} has non-uniform scale {scale:?}")]
    NonUniformScale {
        /// Source node index.
        node: usize,
        /// Decomposed per-axis scale.
        scale: [f32; 3],
    },

    /// Error reading accessor data.
    #[error("accessor error: {0}")]
    Accessor(String),

    /// Error resolving buffer data.
    #[error("buffer error: {0}")]
    Buffer(String),

    /// A vertex references a joint slot outside its skin's joint table.
    #[error("vertex references joint {joint} but the skin has {count} joints")]
    JointOutOfRange {
        /// Referenced joint-table index.
        joint: usize,
        /// Joint-table size.
        count: usize,
    },

    /// A skin joint points at a node with no piece in the rigid skeleton.
    #[error("bone references node {0} with no piece in the skeleton")]
    UnknownBoneNode(usize),

    /// A bone node index does not fit the 16-bit piece id encoding.
    #[error("node index {0} exceeds the bone id range")]
    NodeIndexOverflow(usize),

    /// The piece arena is out of slots.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// Reparenting invariant violation.
    #[error(transparent)]
    Skinning(#[from] SkinningError),
}
