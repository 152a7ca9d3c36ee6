//! Output model types: vertices, rigid pieces, and the model that owns them.
//!
//! - [`ModelVertex`] — per-vertex record with four ranked bone slots
//! - [`Piece`] — a rigid sub-body of the skeleton, owning local geometry
//! - [`Model`] — the flattened piece sequence plus model-level properties
//!
//! Pieces are allocated from a [`crate::arena::PieceArena`] and returned to
//! it when the owning model is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::arena::PieceArena;
use crate::math::{Vec2, Vec3};
use crate::transform::Transform;

/// Number of ranked bone slots carried by every vertex.
pub const BONE_SLOTS: usize = 4;

/// Maximum raw bone influences read per vertex before ranking.
pub const MAX_BONE_INFLUENCES: usize = 8;

/// Sentinel bone id marking an unused slot.
pub const INVALID_BONE_ID: u16 = u16::MAX;

/// A single vertex as consumed by the animation/render subsystem.
///
/// Bone ids are stored split into low and high bytes; slot `i` resolves to
/// `bone_ids_low[i] | bone_ids_high[i] << 8`. Slots are ranked descending
/// by weight and padded with [`INVALID_BONE_ID`] / zero weight.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    /// Position in the owning piece's space.
    pub pos: Vec3,
    /// Unit normal.
    pub normal: Vec3,
    /// Primary tangent (authored tangent scaled by its W sign).
    pub s_tangent: Vec3,
    /// Secondary tangent (`normal × s_tangent`).
    pub t_tangent: Vec3,
    /// Up to two UV sets.
    pub tex_coords: [Vec2; 2],
    /// Low bytes of the ranked bone ids.
    pub bone_ids_low: [u8; BONE_SLOTS],
    /// Quantized bone weights (0–255).
    pub bone_weights: [u8; BONE_SLOTS],
    /// High bytes of the ranked bone ids.
    pub bone_ids_high: [u8; BONE_SLOTS],
}

impl ModelVertex {
    /// Bone id stored in the given slot.
    pub fn bone_id(&self, slot: usize) -> u16 {
        self.bone_ids_low[slot] as u16 | (self.bone_ids_high[slot] as u16) << 8
    }

    /// Overwrite the bone id in the given slot, leaving its weight alone.
    pub fn set_bone_id(&mut self, slot: usize, id: u16) {
        self.bone_ids_low[slot] = (id & 0xFF) as u8;
        self.bone_ids_high[slot] = (id >> 8) as u8;
    }

    /// Write all four ranked slots, quantizing weights to bytes.
    pub fn set_bones(&mut self, bones: &[(u16, f32); BONE_SLOTS]) {
        for (slot, &(id, weight)) in bones.iter().enumerate() {
            self.set_bone_id(slot, id);
            self.bone_weights[slot] = (weight * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Swap two bone slots (id bytes and weight together).
    pub fn swap_bone_slots(&mut self, a: usize, b: usize) {
        self.bone_ids_low.swap(a, b);
        self.bone_ids_high.swap(a, b);
        self.bone_weights.swap(a, b);
    }
}

impl Default for ModelVertex {
    /// All slots invalid, full weight in slot 0: rigid geometry follows
    /// whichever piece owns it.
    fn default() -> Self {
        Self {
            pos: Vec3::zeros(),
            normal: Vec3::y(),
            s_tangent: Vec3::zeros(),
            t_tangent: Vec3::zeros(),
            tex_coords: [Vec2::zeros(); 2],
            bone_ids_low: [0xFF; BONE_SLOTS],
            bone_weights: [255, 0, 0, 0],
            bone_ids_high: [0xFF; BONE_SLOTS],
        }
    }
}

/// A rigid sub-body of the output skeleton.
///
/// Parent/child linkage uses indices into the owning model's flattened
/// piece sequence; the index relations never own anything.
#[derive(Debug, Clone)]
pub struct Piece {
    /// Node name from the source scene (empty when unnamed).
    pub name: String,
    /// Index of the source scene node this piece was built from.
    pub node_index: usize,
    /// Parent piece index; `None` for the root.
    pub parent: Option<usize>,
    /// Child piece indices in build order.
    pub children: Vec<usize>,
    /// Authored local transform (root is reset to identity).
    pub baked_transform: Transform,
    /// Rest-pose transform from model space, derived down the hierarchy.
    pub bind_pose: Transform,
    /// Local translation component of the baked transform.
    pub offset: Vec3,
    /// Accumulated translation offset from the root.
    pub global_offset: Vec3,
    /// Owned vertex buffer, in this piece's local bind space.
    pub vertices: Vec<ModelVertex>,
    /// Owned triangle-list index buffer.
    pub indices: Vec<u32>,
}

impl Piece {
    /// Whether any geometry has been attached.
    pub fn has_geometry(&self) -> bool {
        !self.vertices.is_empty()
    }

    /// Raw byte view of the vertex buffer for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw byte view of the index buffer for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Clear all contents, preserving buffer capacities for reuse.
    pub(crate) fn reset(&mut self) {
        self.name.clear();
        self.node_index = usize::MAX;
        self.parent = None;
        self.children.clear();
        self.baked_transform = Transform::identity();
        self.bind_pose = Transform::identity();
        self.offset = Vec3::zeros();
        self.global_offset = Vec3::zeros();
        self.vertices.clear();
        self.indices.clear();
    }
}

impl Default for Piece {
    fn default() -> Self {
        Self {
            name: String::new(),
            node_index: usize::MAX,
            parent: None,
            children: Vec::new(),
            baked_transform: Transform::identity(),
            bind_pose: Transform::identity(),
            offset: Vec3::zeros(),
            global_offset: Vec3::zeros(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

/// A loaded model: the flattened piece sequence plus derived properties.
///
/// The root piece is always at index 0 and its transform is identity. On
/// drop, all pieces are recycled into the arena they were allocated from.
#[derive(Debug)]
pub struct Model {
    /// Model name (usually the source path).
    pub name: String,
    pieces: Vec<Piece>,
    arena: Arc<PieceArena>,
    /// Minimum model-space extents over all piece geometry.
    pub mins: Vec3,
    /// Maximum model-space extents over all piece geometry.
    pub maxs: Vec3,
    /// Midpoint of the extents.
    pub rel_mid_pos: Vec3,
    /// Half-diagonal of the extents.
    pub radius: f32,
    /// Top extent above the origin.
    pub height: f32,
}

impl Model {
    /// Create an empty model whose pieces will come from `arena`.
    pub fn new(name: impl Into<String>, arena: Arc<PieceArena>) -> Self {
        Self {
            name: name.into(),
            pieces: Vec::new(),
            arena,
            mins: Vec3::zeros(),
            maxs: Vec3::zeros(),
            rel_mid_pos: Vec3::zeros(),
            radius: 0.0,
            height: 0.0,
        }
    }

    /// All pieces in flattened (pre-order) sequence.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Mutable access to the piece sequence.
    pub fn pieces_mut(&mut self) -> &mut [Piece] {
        &mut self.pieces
    }

    /// Number of pieces.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// The root piece, if the hierarchy has been built.
    pub fn root_piece(&self) -> Option<&Piece> {
        self.pieces.first()
    }

    /// Piece by index.
    pub fn piece(&self, index: usize) -> &Piece {
        &self.pieces[index]
    }

    /// Piece by index, mutable.
    pub fn piece_mut(&mut self, index: usize) -> &mut Piece {
        &mut self.pieces[index]
    }

    /// Append a piece (typically fresh from the arena) and return its index.
    pub fn add_piece(&mut self, piece: Piece) -> usize {
        self.pieces.push(piece);
        self.pieces.len() - 1
    }

    /// Derive offsets and bind poses for every piece.
    ///
    /// Runs in flattened order, which guarantees parents are finalized
    /// before their children. Call after the root transform reset so the
    /// authored root transform never leaks into derived values.
    pub(crate) fn finalize_hierarchy(&mut self) {
        for i in 0..self.pieces.len() {
            let (parent_offset, parent_bpose) = match self.pieces[i].parent {
                Some(p) => (self.pieces[p].global_offset, self.pieces[p].bind_pose),
                None => (Vec3::zeros(), Transform::identity()),
            };
            let piece = &mut self.pieces[i];
            piece.offset = piece.baked_transform.translation;
            piece.global_offset = parent_offset + piece.offset;
            piece.bind_pose = parent_bpose * piece.baked_transform;
        }
    }

    /// Map from source scene-node index to piece index.
    pub fn node_piece_map(&self) -> HashMap<usize, u16> {
        self.pieces
            .iter()
            .enumerate()
            .filter(|(_, p)| p.node_index != usize::MAX)
            .map(|(i, p)| (p.node_index, i as u16))
            .collect()
    }

    /// Compute model-space extents, midpoint, radius, and height from all
    /// piece geometry placed through each piece's bind pose.
    pub fn calculate_dimensions(&mut self) {
        let mut mins = Vec3::repeat(f32::MAX);
        let mut maxs = Vec3::repeat(f32::MIN);
        let mut any = false;

        for piece in &self.pieces {
            for vert in &piece.vertices {
                let p = piece.bind_pose.apply_point(&vert.pos);
                mins = mins.inf(&p);
                maxs = maxs.sup(&p);
                any = true;
            }
        }

        if !any {
            mins = Vec3::zeros();
            maxs = Vec3::zeros();
        }

        self.mins = mins;
        self.maxs = maxs;
        self.rel_mid_pos = (mins + maxs) * 0.5;
        self.radius = ((maxs - mins) * 0.5).norm();
        self.height = maxs.y;
    }

    /// Verbose debug summary of the loaded model.
    pub fn log_properties(&self) {
        let verts: usize = self.pieces.iter().map(|p| p.vertices.len()).sum();
        let indcs: usize = self.pieces.iter().map(|p| p.indices.len()).sum();
        log::debug!(
            "model {}: {} pieces, {} vertices, {} indices, radius {:.3}, mins {:?}, maxs {:?}",
            self.name,
            self.pieces.len(),
            verts,
            indcs,
            self.radius,
            self.mins,
            self.maxs,
        );
        for (i, piece) in self.pieces.iter().enumerate() {
            log::trace!(
                "  piece {} '{}': parent {:?}, {} children, {} verts, {} indices",
                i,
                piece.name,
                piece.parent,
                piece.children.len(),
                piece.vertices.len(),
                piece.indices.len(),
            );
        }
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        let arena = Arc::clone(&self.arena);
        arena.recycle(self.pieces.drain(..));
    }
}
