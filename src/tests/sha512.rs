use std::convert::Infallible;

use hex_literal::hex;
use sha2::{Digest, Sha256, Sha512};

use crate::{
    compact_sum_proof, decompact_sum_proof, verify_compact_sum_proof, verify_sum_proof, Hasher,
    MemoryDb, TreeSpec, DEFAULT_VALUE, SMST,
};

impl Hasher<64> for Sha512 {
    fn hash(data: &[u8]) -> [u8; 64] {
        let mut hasher = Sha512::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

fn new_tree() -> SMST<64, Sha512, Infallible> {
    SMST::new(Box::new(MemoryDb::new()), TreeSpec::new())
}

#[test]
fn test_empty_tree() {
    let tree = new_tree();
    assert_eq!(tree.root(), vec![0; 72]);
    assert_eq!(TreeSpec::<64, Sha512>::max_height(), 512);
}

#[test]
fn test_single_leaf_root() {
    let mut tree = new_tree();
    tree.update(b"testKey", b"testValue", 5).unwrap();
    let root = tree.root();
    assert_eq!(root.len(), 72);
    assert_eq!(
        root[..64],
        hex!("7265cb5e8d8dd797f16f16dd2b22ff9b904f164c41a51f894418685539e18604250457000b56fc84a4a566af5ebb040eadfa530968e8cf2557e832424cb219f2")
    );
    assert_eq!(root[64..], 5u64.to_be_bytes());
}

#[test]
fn test_proofs() {
    let mut tree = new_tree();
    let spec = *tree.spec();
    for i in 0..32u8 {
        tree.update(&[i], &[i; 4], i as u64 + 1).unwrap();
    }
    let root = tree.root();
    assert_eq!(tree.sum(), (1..=32).sum::<u64>());
    for i in 0..32u8 {
        let proof = tree.prove(&[i]).unwrap();
        assert!(proof.side_nodes.iter().all(|node| node.len() == 72));
        assert!(verify_sum_proof(&proof, &root, &[i], &[i; 4], i as u64 + 1, &spec).unwrap());
        let compact = compact_sum_proof(&proof, &spec).unwrap();
        assert_eq!(compact.bit_mask.len(), proof.side_nodes.len().div_ceil(8));
        assert_eq!(decompact_sum_proof(&compact, &spec).unwrap(), proof);
        assert!(
            verify_compact_sum_proof(&compact, &root, &[i], &[i; 4], i as u64 + 1, &spec).unwrap()
        );
    }
    let proof = tree.prove(b"absent").unwrap();
    assert!(verify_sum_proof(&proof, &root, b"absent", DEFAULT_VALUE, 0, &spec).unwrap());
}

#[test]
fn test_digest_sizes_do_not_mix() {
    let mut tree = new_tree();
    tree.update(b"testKey", b"testValue", 5).unwrap();
    tree.update(b"testKey2", b"testValue2", 6).unwrap();
    let proof = tree.prove(b"testKey").unwrap();
    let spec = TreeSpec::<32, Sha256>::new();
    assert!(!matches!(
        verify_sum_proof(&proof, &tree.root(), b"testKey", b"testValue", 5, &spec),
        Ok(true)
    ));
}

#[test]
fn test_commit_and_import() {
    let db = super::SharedDb::default();
    let mut tree = SMST::<64, Sha512, String>::new(Box::new(db.clone()), TreeSpec::new());
    for i in 0..16u8 {
        tree.update(&[i], &[i; 2], 10).unwrap();
    }
    tree.commit().unwrap();
    let imported =
        SMST::<64, Sha512, String>::import(Box::new(db), TreeSpec::new(), &tree.root()).unwrap();
    assert_eq!(imported.sum(), 160);
    for i in 0..16u8 {
        assert_eq!(imported.get(&[i]).unwrap(), tree.get(&[i]).unwrap());
    }
}
