//! Hierarchy building and transform decoding over buffer-free documents.

use super::load;
use crate::gltf::ImportError;
use crate::math::Vec3;

/// Root with an authored translation (must be discarded), a TRS child,
/// and a grandchild authored as a uniform-scale matrix.
const MATRIX_HIERARCHY: &str = r#"{
    "asset": {"version": "2.0"},
    "scene": 0,
    "scenes": [{"nodes": [0]}],
    "nodes": [
        {"name": "Root", "translation": [9.0, 9.0, 9.0], "children": [1]},
        {"name": "Torso", "translation": [0.0, 2.0, 0.0], "children": [2]},
        {"name": "Head", "matrix": [
            2.0, 0.0, 0.0, 0.0,
            0.0, 2.0, 0.0, 0.0,
            0.0, 0.0, 2.0, 0.0,
            0.0, 1.0, 0.0, 1.0
        ]}
    ]
}"#;

const NON_UNIFORM_TRS: &str = r#"{
    "asset": {"version": "2.0"},
    "scene": 0,
    "scenes": [{"nodes": [0]}],
    "nodes": [{"name": "Stretched", "scale": [1.0, 2.0, 1.0]}]
}"#;

const NON_UNIFORM_MATRIX: &str = r#"{
    "asset": {"version": "2.0"},
    "scene": 0,
    "scenes": [{"nodes": [0]}],
    "nodes": [{"name": "Sheared", "matrix": [
        1.0, 0.0, 0.0, 0.0,
        0.0, 2.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0
    ]}]
}"#;

const NO_SCENES: &str = r#"{"asset": {"version": "2.0"}}"#;

const EMPTY_SCENE: &str = r#"{
    "asset": {"version": "2.0"},
    "scene": 0,
    "scenes": [{"nodes": []}]
}"#;

#[test]
fn builds_pieces_in_preorder_with_links() {
    let model = load("matrix_hierarchy", MATRIX_HIERARCHY.as_bytes()).unwrap();
    assert_eq!(model.piece_count(), 3);

    let root = model.piece(0);
    assert_eq!(root.name, "Root");
    assert_eq!(root.parent, None);
    assert_eq!(root.children, vec![1]);
    assert_eq!(root.node_index, 0);

    let torso = model.piece(1);
    assert_eq!(torso.name, "Torso");
    assert_eq!(torso.parent, Some(0));
    assert_eq!(torso.children, vec![2]);

    let head = model.piece(2);
    assert_eq!(head.name, "Head");
    assert_eq!(head.parent, Some(1));
    assert!(head.children.is_empty());
}

#[test]
fn root_transform_is_forced_to_identity() {
    let model = load("matrix_hierarchy", MATRIX_HIERARCHY.as_bytes()).unwrap();
    let root = model.piece(0);
    assert!(root.baked_transform.translation.norm() < 1e-6);
    assert_eq!(root.baked_transform.scale, 1.0);
    // the authored [9,9,9] never reaches derived values
    let torso = model.piece(1);
    assert!((torso.global_offset - Vec3::new(0.0, 2.0, 0.0)).norm() < 1e-6);
    assert!((torso.bind_pose.translation - Vec3::new(0.0, 2.0, 0.0)).norm() < 1e-6);
}

#[test]
fn matrix_transform_decodes_to_trs() {
    let model = load("matrix_hierarchy", MATRIX_HIERARCHY.as_bytes()).unwrap();
    let head = model.piece(2);
    assert!((head.baked_transform.scale - 2.0).abs() < 1e-4);
    assert!((head.baked_transform.translation - Vec3::new(0.0, 1.0, 0.0)).norm() < 1e-5);
    assert!((head.offset - Vec3::new(0.0, 1.0, 0.0)).norm() < 1e-5);
    assert!((head.global_offset - Vec3::new(0.0, 3.0, 0.0)).norm() < 1e-5);
    // bind pose accumulates down the chain
    assert!((head.bind_pose.translation - Vec3::new(0.0, 3.0, 0.0)).norm() < 1e-5);
    assert!((head.bind_pose.scale - 2.0).abs() < 1e-4);
}

#[test]
fn non_uniform_trs_scale_is_rejected() {
    let err = load("non_uniform_trs", NON_UNIFORM_TRS.as_bytes()).unwrap_err();
    assert!(matches!(err, ImportError::NonUniformScale { node: 0, .. }));
}

#[test]
fn non_uniform_matrix_scale_is_rejected() {
    let err = load("non_uniform_matrix", NON_UNIFORM_MATRIX.as_bytes()).unwrap_err();
    assert!(matches!(err, ImportError::NonUniformScale { node: 0, .. }));
}

#[test]
fn document_without_scenes_is_rejected() {
    let err = load("no_scenes", NO_SCENES.as_bytes()).unwrap_err();
    assert!(matches!(err, ImportError::NoScenes));
}

#[test]
fn scene_without_roots_is_rejected() {
    let err = load("empty_scene", EMPTY_SCENE.as_bytes()).unwrap_err();
    assert!(matches!(err, ImportError::EmptyScene));
}

#[test]
fn garbage_bytes_fail_to_parse() {
    let err = load("garbage", b"not a gltf document").unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));
}
