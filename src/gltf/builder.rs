//! Rigid hierarchy construction and skinned-mesh collection.
//!
//! Walks the scene graph recursively, allocating one piece per
//! non-skinned node. Skinned nodes never become pieces: their geometry is
//! deferred to the reparenting engine and their children are grafted onto
//! the nearest rigid ancestor so the tree stays connected.

use std::collections::{HashMap, HashSet};

use crate::arena::PieceArena;
use crate::math::{self, Mat4, Vec3};
use crate::model::{Model, BONE_SLOTS, INVALID_BONE_ID};
use crate::skinning::SkinnedMesh;
use crate::transform::Transform;

use super::error::ImportError;
use super::loader::LoadContext;
use super::vertex::consolidate_mesh;

/// Relative tolerance when checking per-axis scale for uniformity.
const SCALE_EPSILON: f32 = 1e-4;

pub(crate) struct HierarchyBuilder<'a> {
    ctx: &'a LoadContext,
    arena: &'a PieceArena,
}

impl<'a> HierarchyBuilder<'a> {
    pub(crate) fn new(ctx: &'a LoadContext, arena: &'a PieceArena) -> Self {
        Self { ctx, arena }
    }

    /// Build the model's piece hierarchy from a scene.
    ///
    /// The first root node becomes the model root (its authored transform
    /// is discarded); remaining scene roots attach beneath it. Offsets and
    /// bind poses are derived once the whole tree exists.
    pub(crate) fn build_scene(
        &self,
        model: &mut Model,
        scene: &gltf_dep::Scene,
    ) -> Result<(), ImportError> {
        let mut roots = scene.nodes();
        let first = roots.next().ok_or(ImportError::EmptyScene)?;
        let root = self
            .load_piece(model, None, &first)?
            .ok_or(ImportError::NoRootPiece {
                node: first.index(),
            })?;
        for extra in roots {
            if let Some(child) = self.load_piece(model, Some(root), &extra)? {
                model.piece_mut(root).children.push(child);
            }
        }

        // the root never applies its authored transform
        model.piece_mut(root).baked_transform = Transform::identity();
        model.finalize_hierarchy();
        Ok(())
    }

    /// Recursively build the piece for one node and its subtree.
    ///
    /// Returns `None` for skinned nodes, letting the caller omit attaching
    /// them; their children are recursed with the same parent.
    fn load_piece(
        &self,
        model: &mut Model,
        parent: Option<usize>,
        node: &gltf_dep::Node,
    ) -> Result<Option<usize>, ImportError> {
        if node.skin().is_some() {
            for child in node.children() {
                if let Some(grafted) = self.load_piece(model, parent, &child)? {
                    if let Some(parent) = parent {
                        model.piece_mut(parent).children.push(grafted);
                    }
                }
            }
            return Ok(None);
        }

        // decode before allocating so a bad transform cannot leak a slot
        let baked_transform = decode_transform(node)?;
        let mut piece = self.arena.allocate()?;
        piece.name = node.name().unwrap_or_default().to_string();
        piece.node_index = node.index();
        piece.parent = parent;
        piece.baked_transform = baked_transform;
        piece.children.reserve(node.children().count());
        let index = model.add_piece(piece);

        for child in node.children() {
            if let Some(child_index) = self.load_piece(model, Some(index), &child)? {
                model.piece_mut(index).children.push(child_index);
            }
        }

        if let Some(mesh) = node.mesh() {
            let piece = model.piece_mut(index);
            consolidate_mesh(self.ctx, &mesh, &mut piece.vertices, &mut piece.indices)?;
        }

        Ok(Some(index))
    }
}

/// Decode an authored node transform into the canonical form.
///
/// Exhaustive over the two authored shapes: explicit TRS is copied
/// through, a general matrix is decomposed. Either way non-uniform scale
/// is a hard content error.
pub(crate) fn decode_transform(node: &gltf_dep::Node) -> Result<Transform, ImportError> {
    match node.transform() {
        gltf_dep::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => {
            ensure_uniform_scale(node.index(), scale)?;
            Ok(Transform::new(
                math::rotation_from_array(rotation),
                Vec3::from(translation),
                scale[0],
            ))
        }
        gltf_dep::scene::Transform::Matrix { matrix } => {
            let m = Mat4::from_iterator(matrix.iter().flatten().copied());
            let (scale, rotation, translation) = math::decompose_trs(&m);
            ensure_uniform_scale(node.index(), [scale.x, scale.y, scale.z])?;
            Ok(Transform::new(rotation, translation, scale.x))
        }
    }
}

fn ensure_uniform_scale(node: usize, scale: [f32; 3]) -> Result<(), ImportError> {
    let max = scale.iter().fold(1.0f32, |m, s| m.max(s.abs()));
    if (scale[0] - scale[1]).abs() > SCALE_EPSILON * max
        || (scale[0] - scale[2]).abs() > SCALE_EPSILON * max
    {
        return Err(ImportError::NonUniformScale { node, scale });
    }
    Ok(())
}

/// Consolidate every skinned mesh in the scene and gather the distinct
/// bone nodes referenced by their skins.
///
/// Vertex bone ids come out of consolidation as joint-table slots; they
/// are rewritten to source node indices here, ready for the node→piece
/// translation.
pub(crate) fn collect_skinned_meshes(
    ctx: &LoadContext,
    scene: &gltf_dep::Scene,
) -> Result<(Vec<SkinnedMesh>, HashSet<usize>), ImportError> {
    let mut meshes = Vec::new();
    let mut bones = HashSet::new();
    for root in scene.nodes() {
        collect_node(ctx, &root, &mut meshes, &mut bones)?;
    }
    Ok((meshes, bones))
}

fn collect_node(
    ctx: &LoadContext,
    node: &gltf_dep::Node,
    meshes: &mut Vec<SkinnedMesh>,
    bones: &mut HashSet<usize>,
) -> Result<(), ImportError> {
    if let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) {
        let mut skinned = SkinnedMesh::default();
        consolidate_mesh(ctx, &mesh, &mut skinned.vertices, &mut skinned.indices)?;

        let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
        for vert in &mut skinned.vertices {
            for slot in 0..BONE_SLOTS {
                let id = vert.bone_id(slot);
                if id == INVALID_BONE_ID {
                    continue;
                }
                let node_index =
                    *joints
                        .get(id as usize)
                        .ok_or(ImportError::JointOutOfRange {
                            joint: id as usize,
                            count: joints.len(),
                        })?;
                let id = u16::try_from(node_index)
                    .ok()
                    .filter(|&id| id != INVALID_BONE_ID)
                    .ok_or(ImportError::NodeIndexOverflow(node_index))?;
                vert.set_bone_id(slot, id);
            }
        }

        bones.extend(joints.iter().copied());
        meshes.push(skinned);
    }

    for child in node.children() {
        collect_node(ctx, &child, meshes, bones)?;
    }
    Ok(())
}

/// Rewrite every valid bone slot from node-index space to piece-index
/// space. A miss means the skin references a node outside the built
/// skeleton, which is a content error.
pub(crate) fn translate_bone_ids(
    meshes: &mut [SkinnedMesh],
    node_to_piece: &HashMap<usize, u16>,
) -> Result<(), ImportError> {
    for mesh in meshes {
        for vert in &mut mesh.vertices {
            for slot in 0..BONE_SLOTS {
                let id = vert.bone_id(slot);
                if id == INVALID_BONE_ID {
                    continue;
                }
                let piece = node_to_piece
                    .get(&(id as usize))
                    .ok_or(ImportError::UnknownBoneNode(id as usize))?;
                vert.set_bone_id(slot, *piece);
            }
        }
    }
    Ok(())
}
