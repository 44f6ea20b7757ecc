use criterion::{criterion_group, criterion_main, Criterion};
use sha2::Sha256;
use smst::{MemoryDb, TreeSpec, SMST};
use std::convert::Infallible;

pub fn generate_random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    for byte in key.iter_mut() {
        *byte = rand::random();
    }
    key
}

pub fn generate_random_value() -> Vec<u8> {
    let mut value = Vec::with_capacity(32);
    for _ in 0..32 {
        value.push(rand::random());
    }
    value
}

fn bench_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMST Insertion");

    group.bench_function("Update", |b| {
        b.iter(|| {
            let mut tree =
                SMST::<32, Sha256, Infallible>::new(Box::new(MemoryDb::new()), TreeSpec::new());
            for _ in 0..100 {
                let key = generate_random_key();
                let value = generate_random_value();
                tree.update(&key, &value, rand::random::<u32>() as u64)
                    .unwrap();
            }
        })
    });

    group.bench_function("Update and commit", |b| {
        b.iter(|| {
            let mut tree =
                SMST::<32, Sha256, Infallible>::new(Box::new(MemoryDb::new()), TreeSpec::new());
            for _ in 0..100 {
                let key = generate_random_key();
                let value = generate_random_value();
                tree.update(&key, &value, rand::random::<u32>() as u64)
                    .unwrap();
            }
            tree.commit().unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insertion);
criterion_main!(benches);
