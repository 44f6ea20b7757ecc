use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sha2::Sha256;
use smst::{compact_sum_proof, verify_sum_proof, MemoryDb, TreeSpec, SMST};
use std::convert::Infallible;

pub fn generate_random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    for byte in key.iter_mut() {
        *byte = rand::random();
    }
    key
}

#[allow(clippy::type_complexity)]
fn setup_tree(num_leaves: usize) -> (SMST<32, Sha256, Infallible>, Vec<([u8; 32], u64)>) {
    let mut tree = SMST::<32, Sha256, Infallible>::new(Box::new(MemoryDb::new()), TreeSpec::new());
    let mut entries = Vec::with_capacity(num_leaves);
    for _ in 0..num_leaves {
        let key = generate_random_key();
        let sum = rand::random::<u32>() as u64;
        tree.update(&key, &key, sum).unwrap();
        entries.push((key, sum));
    }
    (tree, entries)
}

fn bench_proof_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMST Proof Generation");
    let (tree, entries) = setup_tree(100);

    group.bench_function("Prove", |b| {
        b.iter(|| {
            for (key, _) in &entries {
                black_box(tree.prove(key)).unwrap();
            }
        })
    });

    group.bench_function("Prove and compact", |b| {
        b.iter(|| {
            for (key, _) in &entries {
                let proof = tree.prove(key).unwrap();
                black_box(compact_sum_proof(&proof, tree.spec())).unwrap();
            }
        })
    });

    group.finish();
}

fn bench_proof_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMST Proof Verification");
    let (tree, entries) = setup_tree(100);
    let root = tree.root();
    let proofs: Vec<_> = entries
        .iter()
        .map(|(key, _)| tree.prove(key).unwrap())
        .collect();

    group.bench_function("Verify", |b| {
        b.iter(|| {
            for ((key, sum), proof) in entries.iter().zip(proofs.iter()) {
                assert!(
                    verify_sum_proof(black_box(proof), &root, key, key, *sum, tree.spec())
                        .unwrap()
                );
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_proof_generation, bench_proof_verification);
criterion_main!(benches);
