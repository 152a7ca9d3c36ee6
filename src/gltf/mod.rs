//! glTF model import.
//!
//! Loads a `.glb`/`.gltf` scene into the engine's rigid piece hierarchy:
//!
//! 1. parse the container and resolve buffers ([`loader`])
//! 2. build the rigid skeleton from the default scene ([`builder`])
//! 3. consolidate skinned meshes to ranked-weight vertices ([`vertex`])
//! 4. reparent skinned geometry onto single pieces ([`crate::skinning`])
//!
//! External file references are not supported; buffers must be embedded
//! (GLB blob or base64 data URIs). Any failure aborts the load — no
//! partial model is ever returned.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use silverfern_model::{arena::PieceArena, gltf::load_model};
//!
//! let arena = Arc::new(PieceArena::new());
//! let data = std::fs::read("characters/lancer.glb").unwrap();
//! let model = load_model("characters/lancer.glb", &data, &arena).unwrap();
//! println!("{} pieces", model.piece_count());
//! ```

mod builder;
mod error;
mod loader;
#[cfg(test)]
mod tests;
mod vertex;

pub use error::ImportError;

use std::sync::Arc;

use crate::arena::PieceArena;
use crate::model::Model;
use crate::skinning;

use builder::HierarchyBuilder;

/// Load a model from glTF bytes.
///
/// `name` identifies the model in logs and on the returned [`Model`];
/// pieces are allocated from `arena` and return to it when the model is
/// dropped.
pub fn load_model(
    name: &str,
    data: &[u8],
    arena: &Arc<PieceArena>,
) -> Result<Model, ImportError> {
    log::info!("loading model {name}");

    let gltf = gltf_dep::Gltf::from_slice(data)?;
    let blob = gltf.blob.clone();
    let buffers = loader::resolve_buffers(&gltf.document, blob)?;
    let ctx = loader::LoadContext::new(gltf.document, buffers);

    let scene = ctx
        .document
        .default_scene()
        .or_else(|| ctx.document.scenes().next())
        .ok_or(ImportError::NoScenes)?;

    let mut model = Model::new(name, Arc::clone(arena));
    HierarchyBuilder::new(&ctx, arena).build_scene(&mut model, &scene)?;

    let (mut skinned, bones) = builder::collect_skinned_meshes(&ctx, &scene)?;
    if !skinned.is_empty() {
        let node_to_piece = model.node_piece_map();
        builder::translate_bone_ids(&mut skinned, &node_to_piece)?;
        skinning::reparent_skinned_meshes(&mut model, &skinned, bones.len())?;
    }

    model.calculate_dimensions();
    log::info!(
        "loaded model {name}: {} pieces, {} skinned meshes",
        model.piece_count(),
        skinned.len(),
    );
    model.log_properties();
    Ok(model)
}
