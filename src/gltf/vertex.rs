//! Vertex and weight consolidation.
//!
//! Streams a mesh's primitives into the engine vertex format and squeezes
//! up to eight raw (bone, weight) influence pairs per vertex down to the
//! four ranked slots the runtime expects. Appends into caller-provided
//! buffers so several primitives of one mesh accumulate in place.

use gltf_dep::Semantic;

use crate::math::Vec3;
use crate::model::{ModelVertex, BONE_SLOTS, INVALID_BONE_ID, MAX_BONE_INFLUENCES};

use super::error::ImportError;
use super::loader::LoadContext;

/// Consolidate all primitives of `mesh` into `verts`/`indcs`.
///
/// Indices are appended with an offset equal to the vertex count already
/// accumulated, so the result stays a single coherent triangle list.
pub(crate) fn consolidate_mesh(
    ctx: &LoadContext,
    mesh: &gltf_dep::Mesh,
    verts: &mut Vec<ModelVertex>,
    indcs: &mut Vec<u32>,
) -> Result<(), ImportError> {
    for (prim_index, primitive) in mesh.primitives().enumerate() {
        if primitive.mode() != gltf_dep::mesh::Mode::Triangles {
            return Err(ImportError::UnsupportedTopology {
                mesh: mesh.index(),
                primitive: prim_index,
                mode: format!("{:?}", primitive.mode()),
            });
        }

        let mut positions = None;
        let mut normals = None;
        let mut uvs: [Option<gltf_dep::Accessor>; 2] = [None, None];
        let mut tangents = None;
        let mut joints: [Option<gltf_dep::Accessor>; 2] = [None, None];
        let mut weights: [Option<gltf_dep::Accessor>; 2] = [None, None];

        for (semantic, accessor) in primitive.attributes() {
            match semantic {
                Semantic::Positions => positions = Some(accessor),
                Semantic::Normals => normals = Some(accessor),
                Semantic::TexCoords(0) => uvs[0] = Some(accessor),
                Semantic::TexCoords(1) => uvs[1] = Some(accessor),
                Semantic::Tangents => tangents = Some(accessor),
                Semantic::Joints(0) => joints[0] = Some(accessor),
                Semantic::Joints(1) => joints[1] = Some(accessor),
                Semantic::Weights(0) => weights[0] = Some(accessor),
                Semantic::Weights(1) => weights[1] = Some(accessor),
                other => log::debug!("ignoring vertex attribute {other:?}"),
            }
        }

        let positions = positions.ok_or(ImportError::MissingPositions {
            mesh: mesh.index(),
            primitive: prim_index,
        })?;
        let indices = primitive.indices().ok_or(ImportError::MissingIndices {
            mesh: mesh.index(),
            primitive: prim_index,
        })?;

        let prev_verts = verts.len();
        let count = positions.count();
        verts.resize(prev_verts + count, ModelVertex::default());
        let prim_verts = &mut verts[prev_verts..];

        for (i, p) in ctx
            .read_f32_elements::<3>(&positions)?
            .into_iter()
            .enumerate()
        {
            prim_verts[i].pos = Vec3::from(p);
        }

        if let Some(accessor) = &normals {
            for (i, n) in ctx
                .read_f32_elements::<3>(accessor)?
                .into_iter()
                .enumerate()
                .take(count)
            {
                let n = Vec3::from(n);
                prim_verts[i].normal = n.try_normalize(f32::EPSILON).unwrap_or(n);
            }
        }

        for (set, accessor) in uvs.iter().enumerate() {
            if let Some(accessor) = accessor {
                for (i, uv) in ctx
                    .read_f32_elements::<2>(accessor)?
                    .into_iter()
                    .enumerate()
                    .take(count)
                {
                    prim_verts[i].tex_coords[set] = uv.into();
                }
            }
        }

        // tangents after normals: the bitangent is derived from both
        if let Some(accessor) = &tangents {
            for (i, t) in ctx
                .read_f32_elements::<4>(accessor)?
                .into_iter()
                .enumerate()
                .take(count)
            {
                let tangent = Vec3::new(t[0], t[1], t[2]) * t[3];
                let vert = &mut prim_verts[i];
                vert.s_tangent = tangent.try_normalize(f32::EPSILON).unwrap_or(tangent);
                let bitangent = vert.normal.cross(&vert.s_tangent);
                vert.t_tangent = bitangent.try_normalize(f32::EPSILON).unwrap_or(bitangent);
            }
        }

        let mut influences =
            vec![[(INVALID_BONE_ID, 0.0f32); MAX_BONE_INFLUENCES]; count];
        for set in 0..2 {
            if let Some(accessor) = &joints[set] {
                for (i, ids) in ctx
                    .read_u16_elements(accessor)?
                    .into_iter()
                    .enumerate()
                    .take(count)
                {
                    for (c, &id) in ids.iter().enumerate() {
                        influences[i][set * 4 + c].0 = id;
                    }
                }
            }
            if let Some(accessor) = &weights[set] {
                for (i, w) in ctx
                    .read_f32_elements::<4>(accessor)?
                    .into_iter()
                    .enumerate()
                    .take(count)
                {
                    for (c, &weight) in w.iter().enumerate() {
                        influences[i][set * 4 + c].1 = weight;
                    }
                }
            }
        }

        for (i, candidates) in influences.iter_mut().enumerate() {
            let ranked = rank_influences(candidates);
            prim_verts[i].set_bones(&ranked);
        }

        for index in ctx.read_indices(&indices)? {
            indcs.push(prev_verts as u32 + index);
        }
    }

    Ok(())
}

/// Reduce up to eight raw influences to the four ranked bone slots.
///
/// Zero-weight candidates lose their id to the invalid sentinel, then a
/// stable sort orders candidates descending by weight with ties broken
/// toward the higher id. Slots past the real influence count stay
/// `(INVALID_BONE_ID, 0)`.
pub(crate) fn rank_influences(
    candidates: &mut [(u16, f32); MAX_BONE_INFLUENCES],
) -> [(u16, f32); BONE_SLOTS] {
    for candidate in candidates.iter_mut() {
        if candidate.1 == 0.0 {
            candidate.0 = INVALID_BONE_ID;
        }
    }
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.cmp(&a.0))
    });

    let mut ranked = [(INVALID_BONE_ID, 0.0f32); BONE_SLOTS];
    ranked.copy_from_slice(&candidates[..BONE_SLOTS]);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(u16, f32)]) -> [(u16, f32); MAX_BONE_INFLUENCES] {
        let mut out = [(INVALID_BONE_ID, 0.0); MAX_BONE_INFLUENCES];
        out[..pairs.len()].copy_from_slice(pairs);
        out
    }

    #[test]
    fn ranks_descending_by_weight() {
        let mut candidates = raw(&[
            (0, 0.05),
            (1, 0.4),
            (2, 0.15),
            (3, 0.2),
            (4, 0.1),
            (5, 0.1),
        ]);
        let ranked = rank_influences(&mut candidates);
        assert_eq!(ranked[0], (1, 0.4));
        assert_eq!(ranked[1], (3, 0.2));
        assert_eq!(ranked[2], (2, 0.15));
        // tie at 0.1 resolves toward the higher id
        assert_eq!(ranked[3], (5, 0.1));
    }

    #[test]
    fn zero_weights_become_invalid() {
        let mut candidates = raw(&[(6, 0.0), (2, 1.0)]);
        let ranked = rank_influences(&mut candidates);
        assert_eq!(ranked[0], (2, 1.0));
        for slot in &ranked[1..] {
            assert_eq!(slot.0, INVALID_BONE_ID);
            assert_eq!(slot.1, 0.0);
        }
    }

    #[test]
    fn fewer_than_four_influences_pad_with_sentinel() {
        let mut candidates = raw(&[(10, 0.7), (11, 0.3)]);
        let ranked = rank_influences(&mut candidates);
        assert_eq!(ranked[0], (10, 0.7));
        assert_eq!(ranked[1], (11, 0.3));
        assert_eq!(ranked[2], (INVALID_BONE_ID, 0.0));
        assert_eq!(ranked[3], (INVALID_BONE_ID, 0.0));
    }

    #[test]
    fn eight_influences_truncate_to_top_four() {
        let mut candidates = raw(&[
            (0, 0.05),
            (1, 0.10),
            (2, 0.15),
            (3, 0.20),
            (4, 0.25),
            (5, 0.10),
            (6, 0.10),
            (7, 0.05),
        ]);
        let ranked = rank_influences(&mut candidates);
        assert_eq!(ranked[0], (4, 0.25));
        assert_eq!(ranked[1], (3, 0.20));
        assert_eq!(ranked[2], (2, 0.15));
        // three-way tie at 0.10: ids 6, 5, 1 in that order; 6 survives
        assert_eq!(ranked[3], (6, 0.10));
    }
}
