//! Save/load tests for the level-order text layout

use std::path::PathBuf;

use carrytree_merkle::{load, load_all, save, save_all, Error, Tree};
use proptest::prelude::*;

fn test_data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/test-data")
        .join(name)
}

const FIVE_LEAVES: [&str; 5] = ["alpha", "beta", "gamma", "delta", "epsilon"];

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merkle.tree");

    let tree = Tree::build(&["a", "b", "c", "d", "e", "f", "g"]).unwrap();
    save(&tree, &path).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(loaded, tree);
    assert_eq!(loaded.root().key(), tree.root().key());
    assert_eq!(loaded.root().hash(), tree.root().hash());
}

#[test]
fn test_loaded_tree_gives_same_proofs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merkle.tree");

    let tree = Tree::build(&FIVE_LEAVES).unwrap();
    save(&tree, &path).unwrap();
    let loaded = load(&path).unwrap();

    for leaf in FIVE_LEAVES {
        assert_eq!(
            loaded.inclusion_proof(leaf).unwrap(),
            tree.inclusion_proof(leaf).unwrap()
        );
    }
}

#[test]
fn test_reference_file_loads() {
    let loaded = load(test_data("five-leaves.tree")).unwrap();
    let built = Tree::build(&FIVE_LEAVES).unwrap();
    assert_eq!(loaded, built);
}

#[test]
fn test_output_matches_reference_file() {
    let expected = std::fs::read_to_string(test_data("five-leaves.tree")).unwrap();
    let tree = Tree::build(&FIVE_LEAVES).unwrap();
    assert_eq!(tree.to_text().unwrap(), expected);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.tree");

    match load(&path) {
        Err(Error::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected I/O error, got {:?}", other),
    }
}

#[test]
fn test_load_malformed_file_reports_path_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.tree");
    std::fs::write(&path, "*** banner ***\nLevel(0): nothex [x] \n").unwrap();

    match load(&path) {
        Err(Error::Parse { origin, line, .. }) => {
            assert!(origin.ends_with("broken.tree"));
            assert_eq!(line, 2);
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_load_non_utf8_file_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binary.tree");
    std::fs::write(&path, b"*** banner ***\nLevel(0): \xff\xfe [x] \n").unwrap();

    match load(&path) {
        Err(Error::Parse { origin, line, .. }) => {
            assert!(origin.ends_with("binary.tree"));
            assert_eq!(line, 2);
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_save_rejects_unrepresentable_key_without_touching_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merkle.tree");
    std::fs::write(&path, "previous contents").unwrap();

    let tree = Tree::build(&["a,b", "c"]).unwrap();
    assert!(matches!(save(&tree, &path), Err(Error::InvalidInput(_))));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous contents");
}

#[test]
fn test_save_all_load_all() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merkle.trees");

    let older = Tree::build(&["a", "b", "c"]).unwrap();
    let newer = Tree::build(&["a", "b", "c", "d"]).unwrap();
    save_all(&[&older, &newer], &path).unwrap();

    let trees = load_all(&path).unwrap();
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0], older);
    assert_eq!(trees[1], newer);

    // load expects exactly one tree
    assert!(matches!(load(&path), Err(Error::Parse { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_text_round_trip(leaves in prop::collection::vec("[A-Za-z0-9_.-]{0,12}", 1..30)) {
        let tree = Tree::build(&leaves).unwrap();
        let parsed = Tree::from_text(&tree.to_text().unwrap()).unwrap();
        prop_assert_eq!(parsed, tree);
    }
}
