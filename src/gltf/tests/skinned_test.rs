//! End-to-end skinned import: exclusion, reparenting, bind-space output.

use super::load;
use crate::math::Vec3;
use crate::model::{Model, INVALID_BONE_ID};

const TWO_BONE_SPLIT: &[u8] = include_bytes!("two_bone_split.gltf");
const ONE_BONE_WHOLE: &[u8] = include_bytes!("one_bone_whole.gltf");
const EIGHT_INFLUENCE: &[u8] = include_bytes!("eight_influence.gltf");

fn assert_positions(actual: &[Vec3], expected: &[[f32; 3]]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - Vec3::from(*e)).norm() < 1e-5,
            "expected {e:?}, got {a:?}"
        );
    }
}

fn piece_positions(model: &Model, piece: usize) -> Vec<Vec3> {
    model.piece(piece).vertices.iter().map(|v| v.pos).collect()
}

#[test]
fn skinned_node_owns_no_piece() {
    let model = load("two_bone_split", TWO_BONE_SPLIT).unwrap();
    // Root, BoneA, BoneB, and the grafted Lantern; never the Body node
    assert_eq!(model.piece_count(), 4);
    assert!(model.pieces().iter().all(|p| p.node_index != 3));
}

#[test]
fn skinned_node_children_graft_onto_the_parent() {
    let model = load("two_bone_split", TWO_BONE_SPLIT).unwrap();
    let lantern = model
        .pieces()
        .iter()
        .position(|p| p.name == "Lantern")
        .unwrap();
    assert_eq!(model.piece(lantern).parent, Some(0));
    assert!(model.piece(0).children.contains(&lantern));
    assert!((model.piece(lantern).offset - Vec3::new(0.0, 5.0, 0.0)).norm() < 1e-6);
}

#[test]
fn one_mesh_two_bones_splits_per_triangle() {
    let model = load("two_bone_split", TWO_BONE_SPLIT).unwrap();
    let bone_a = model.piece(1);
    let bone_b = model.piece(2);
    assert_eq!(bone_a.name, "BoneA");
    assert_eq!(bone_b.name, "BoneB");

    // whole-mesh transfer would have put all six vertices on one piece
    assert_eq!(bone_a.vertices.len(), 3);
    assert_eq!(bone_a.indices, vec![0, 1, 2]);
    assert_eq!(bone_b.vertices.len(), 3);
    assert_eq!(bone_b.indices, vec![0, 1, 2]);
    assert!(!model.piece(0).has_geometry());
}

#[test]
fn split_geometry_lands_in_each_bind_space() {
    let model = load("two_bone_split", TWO_BONE_SPLIT).unwrap();
    // both bones see their triangle relative to their own bind translation
    let local = [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    assert_positions(&piece_positions(&model, 1), &local);
    assert_positions(&piece_positions(&model, 2), &local);

    // reapplying the bind pose recovers the authored model-space points
    let recovered = model.piece(2).bind_pose.apply_point(&Vec3::zeros());
    assert!((recovered - Vec3::new(-1.0, 0.0, 0.0)).norm() < 1e-5);
}

#[test]
fn reparented_vertices_lead_with_their_piece() {
    let model = load("two_bone_split", TWO_BONE_SPLIT).unwrap();
    for (id, piece) in model.pieces().iter().enumerate() {
        for vert in &piece.vertices {
            assert_eq!(vert.bone_id(0), id as u16);
            assert_eq!(vert.bone_weights[0], 255);
            for slot in 1..4 {
                assert_eq!(vert.bone_id(slot), INVALID_BONE_ID);
            }
        }
    }
}

#[test]
fn one_mesh_one_bone_transfers_whole_mesh() {
    let model = load("one_bone_whole", ONE_BONE_WHOLE).unwrap();
    assert_eq!(model.piece_count(), 2);

    let bone = model.piece(1);
    assert_eq!(bone.name, "BoneA");
    // vertex 3 duplicates vertex 0; whole-mesh transfer keeps it
    assert_eq!(bone.vertices.len(), 4);
    assert_eq!(bone.indices, vec![0, 1, 2, 2, 1, 3]);

    // converted by the bone's bind translation (2,0,0)
    assert_positions(
        &piece_positions(&model, 1),
        &[
            [-2.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [-2.0, 1.0, 0.0],
            [-2.0, 0.0, 0.0],
        ],
    );
}

#[test]
fn eight_influences_rank_into_four_slots() {
    let model = load("eight_influence", EIGHT_INFLUENCE).unwrap();
    assert_eq!(model.piece_count(), 9);

    // joint 4 (node 5, piece 5) carries the top weight everywhere
    let winner = model.piece(5);
    assert_eq!(winner.name, "Bone5");
    assert_eq!(winner.vertices.len(), 3);
    for other in [1usize, 2, 3, 4, 6, 7, 8] {
        assert!(!model.piece(other).has_geometry());
    }

    for vert in &winner.vertices {
        // ranked by weight, ties toward the higher joint, then truncated
        assert_eq!(vert.bone_id(0), 5);
        assert_eq!(vert.bone_id(1), 4);
        assert_eq!(vert.bone_id(2), 3);
        assert_eq!(vert.bone_id(3), 7);
        assert_eq!(vert.bone_weights, [64, 51, 38, 26]);
    }

    assert_positions(
        &piece_positions(&model, 5),
        &[[-5.0, 0.0, 0.0], [-4.0, 0.0, 0.0], [-5.0, 1.0, 0.0]],
    );
}
