//! Skinned-geometry reparenting.
//!
//! The runtime animates rigid pieces, so geometry authored against a
//! blended skin has to be handed to exactly one piece. Ownership is
//! decided by a weighted vote over the vertices' bone weights, either per
//! whole mesh or per triangle, and the chosen geometry is re-expressed in
//! the winning piece's local bind space.
//!
//! Bone ids on the incoming [`SkinnedMesh`] vertices must already be
//! piece indices (the importer translates node indices before calling in
//! here).

use thiserror::Error;

use crate::model::{Model, ModelVertex, BONE_SLOTS, INVALID_BONE_ID};

/// One weight bucket per possible piece id plus the sentinel overflow slot.
const WEIGHT_BUCKETS: usize = INVALID_BONE_ID as usize + 1;

/// Reparenting invariant violations.
#[derive(Error, Debug)]
pub enum SkinningError {
    /// The weighted vote produced no usable winner: the geometry carries
    /// no valid bone weights at all.
    #[error("skinned geometry has no dominant piece (no valid bone weights)")]
    NoDominantPiece,
    /// A vertex references a piece id outside the model's piece table.
    #[error("bone id {piece} outside piece table of {count} pieces")]
    PieceOutOfRange {
        /// Offending piece id.
        piece: u16,
        /// Number of pieces in the model.
        count: usize,
    },
}

/// Consolidated geometry of one skinned scene mesh.
///
/// Exists only between consolidation and reparenting; afterwards the
/// geometry lives in piece buffers and the skinned mesh is discarded.
#[derive(Debug, Default)]
pub struct SkinnedMesh {
    /// Consolidated vertices with ranked bone slots.
    pub vertices: Vec<ModelVertex>,
    /// Triangle-list indices into `vertices`.
    pub indices: Vec<u32>,
}

/// Distribute skinned meshes over the model's pieces.
///
/// With at least as many meshes as distinct bones, assigning each whole
/// mesh to one piece is cheap and usually right; once bones outnumber
/// meshes, a single large mesh has to be split per triangle to cover the
/// skeleton.
pub fn reparent_skinned_meshes(
    model: &mut Model,
    meshes: &[SkinnedMesh],
    bone_count: usize,
) -> Result<(), SkinningError> {
    if meshes.is_empty() {
        return Ok(());
    }
    if meshes.len() >= bone_count {
        log::debug!(
            "reparenting {} skinned meshes over {} bones as whole meshes",
            meshes.len(),
            bone_count,
        );
        reparent_whole_meshes(model, meshes)
    } else {
        log::debug!(
            "reparenting {} skinned meshes over {} bones per triangle",
            meshes.len(),
            bone_count,
        );
        reparent_mesh_triangles(model, meshes)
    }
}

/// Assign each mesh in its entirety to the piece with the highest summed
/// bone weight.
///
/// No vertex deduplication is performed; the producing stage is trusted
/// to have deduplicated identical vertices already.
pub fn reparent_whole_meshes(
    model: &mut Model,
    meshes: &[SkinnedMesh],
) -> Result<(), SkinningError> {
    let mut weights = vec![0u64; WEIGHT_BUCKETS];

    for mesh in meshes {
        weights.fill(0);
        for vert in &mesh.vertices {
            accumulate_weights(&mut weights, vert);
        }
        let winner = dominant_piece(&weights)?;
        check_piece_id(winner, model.piece_count())?;

        let piece = model.piece_mut(winner as usize);
        let index_offset = piece.vertices.len() as u32;

        for vert in &mesh.vertices {
            let mut vert = *vert;
            make_leading_piece(&mut vert, winner);
            piece.vertices.push(vert);
        }
        for &index in &mesh.indices {
            piece.indices.push(index_offset + index);
        }
    }

    convert_to_bind_space(model);
    Ok(())
}

/// Assign every triangle independently to the piece its three corners
/// vote for, deduplicating corner vertices against the destination piece.
pub fn reparent_mesh_triangles(
    model: &mut Model,
    meshes: &[SkinnedMesh],
) -> Result<(), SkinningError> {
    let mut weights = vec![0u64; WEIGHT_BUCKETS];

    for mesh in meshes {
        for triangle in mesh.indices.chunks_exact(3) {
            weights.fill(0);
            for &corner in triangle {
                accumulate_weights(&mut weights, &mesh.vertices[corner as usize]);
            }
            let winner = dominant_piece(&weights)?;
            check_piece_id(winner, model.piece_count())?;

            let piece = model.piece_mut(winner as usize);
            for &corner in triangle {
                let vert = &mesh.vertices[corner as usize];
                // reuse an existing vertex with the same position and normal
                let found = piece
                    .vertices
                    .iter()
                    .position(|v| v.pos == vert.pos && v.normal == vert.normal);
                match found {
                    Some(existing) => piece.indices.push(existing as u32),
                    None => {
                        let mut vert = *vert;
                        make_leading_piece(&mut vert, winner);
                        piece.indices.push(piece.vertices.len() as u32);
                        piece.vertices.push(vert);
                    }
                }
            }
        }
    }

    convert_to_bind_space(model);
    Ok(())
}

/// Sum a vertex's four slot weights into the per-piece buckets.
fn accumulate_weights(weights: &mut [u64], vert: &ModelVertex) {
    for slot in 0..BONE_SLOTS {
        weights[vert.bone_id(slot) as usize] += vert.bone_weights[slot] as u64;
    }
}

/// Pick the bucket with the highest weight; ties go to the lowest id.
fn dominant_piece(weights: &[u64]) -> Result<u16, SkinningError> {
    let mut best = 0usize;
    let mut best_weight = 0u64;
    for (id, &weight) in weights.iter().enumerate() {
        if weight > best_weight {
            best = id;
            best_weight = weight;
        }
    }
    if best_weight == 0 || best as u16 == INVALID_BONE_ID {
        return Err(SkinningError::NoDominantPiece);
    }
    Ok(best as u16)
}

fn check_piece_id(piece: u16, count: usize) -> Result<(), SkinningError> {
    if (piece as usize) < count {
        Ok(())
    } else {
        Err(SkinningError::PieceOutOfRange { piece, count })
    }
}

/// Force the winning piece id into bone slot 0.
///
/// Required by the runtime even when the winner never influenced the
/// vertex: in that case the least-weighted slot is sacrificed and the
/// remaining weights are rescaled to a full byte range again.
fn make_leading_piece(vert: &mut ModelVertex, winner: u16) {
    if vert.bone_id(0) == winner {
        return;
    }
    if let Some(slot) = (1..BONE_SLOTS).find(|&slot| vert.bone_id(slot) == winner) {
        vert.swap_bone_slots(0, slot);
        return;
    }

    vert.set_bone_id(BONE_SLOTS - 1, winner);
    vert.bone_weights[BONE_SLOTS - 1] = 0;
    vert.swap_bone_slots(0, BONE_SLOTS - 1);

    let sum: u32 = vert.bone_weights.iter().map(|&w| w as u32).sum();
    if sum > 0 {
        for weight in &mut vert.bone_weights {
            *weight = ((*weight as f32) * 255.0 / sum as f32).round() as u8;
        }
    }
}

/// Re-express every piece's geometry in its local bind space.
///
/// Positions transform as points, normals and tangents as directions.
fn convert_to_bind_space(model: &mut Model) {
    for piece in model.pieces_mut() {
        if !piece.has_geometry() {
            continue;
        }
        let inverse = piece.bind_pose.inverse_affine();
        for vert in &mut piece.vertices {
            vert.pos = inverse.apply_point(&vert.pos);
            vert.normal = inverse.apply_vector(&vert.normal);
            vert.s_tangent = inverse.apply_vector(&vert.s_tangent);
            vert.t_tangent = inverse.apply_vector(&vert.t_tangent);
        }
    }
}
